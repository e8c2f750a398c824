//! Pairwise exchange rate table and the shared cache holding it.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use multiconv_common::{now, Currency, CurrencyPair, Timestamp};
use parking_lot::RwLock;
use tracing::debug;

use crate::error::{FxError, FxResult};
use crate::provider::RatesPayload;

/// Dense rate table for every ordered pair seen in one fetch.
///
/// `value_in_to = value_in_from * rate(from, to)`.
#[derive(Debug, Clone, Default)]
pub struct RateTable {
    rates: HashMap<CurrencyPair, f64>,
    base: Option<Currency>,
    updated_at: Option<Timestamp>,
}

impl RateTable {
    /// Table with no rates.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build the pairwise table from a provider payload.
    ///
    /// The payload's own `base` wins over `requested_base`. The base counts
    /// as 1.0 unless the payload lists it. Pairs where either side is not a
    /// positive finite number are skipped; a payload left with nothing but
    /// the base is rejected as empty.
    pub fn from_payload(payload: &RatesPayload, requested_base: &Currency) -> FxResult<Self> {
        if payload.rates.is_empty() {
            return Err(FxError::EmptyRates);
        }

        let base = payload.base.clone().unwrap_or_else(|| requested_base.clone());

        let mut per_base = payload.rates.clone();
        per_base.entry(base.clone()).or_insert(1.0);

        let usable: Vec<(&Currency, f64)> = per_base
            .iter()
            .map(|(c, r)| (c, *r))
            .filter(|(_, r)| r.is_finite() && *r > 0.0)
            .collect();

        if !usable.iter().any(|(c, _)| **c != base) {
            return Err(FxError::EmptyRates);
        }

        let mut rates = HashMap::with_capacity(usable.len() * usable.len());
        for (from, from_rate) in &usable {
            for (to, to_rate) in &usable {
                let pair = CurrencyPair::new((*from).clone(), (*to).clone());
                rates.insert(pair, to_rate / from_rate);
            }
        }

        Ok(Self {
            rates,
            base: Some(base),
            updated_at: Some(now()),
        })
    }

    /// Rate for a pair, if present.
    pub fn get(&self, pair: &CurrencyPair) -> Option<f64> {
        self.rates.get(pair).copied()
    }

    /// Base currency of the fetch that produced this table.
    pub fn base(&self) -> Option<&Currency> {
        self.base.as_ref()
    }

    /// When the table was built.
    pub fn updated_at(&self) -> Option<Timestamp> {
        self.updated_at
    }

    /// Currencies present in the table, sorted.
    pub fn currencies(&self) -> BTreeSet<Currency> {
        self.rates.keys().map(|p| p.from.clone()).collect()
    }

    /// Number of pairs.
    pub fn len(&self) -> usize {
        self.rates.len()
    }

    /// Check if the table has no pairs.
    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}

/// Shared rate cache. Readers see a consistent table; writers swap the
/// whole table at once.
pub struct RateCache {
    table: RwLock<Arc<RateTable>>,
}

impl RateCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self {
            table: RwLock::new(Arc::new(RateTable::empty())),
        }
    }

    /// Get a rate, or `RateNotFound`.
    pub fn rate(&self, pair: &CurrencyPair) -> FxResult<f64> {
        match self.table.read().get(pair) {
            Some(rate) => {
                debug!(pair = %pair, rate, "Cache hit");
                Ok(rate)
            }
            None => {
                debug!(pair = %pair, "Cache miss");
                Err(FxError::RateNotFound(pair.clone()))
            }
        }
    }

    /// Get a rate if cached.
    pub fn lookup(&self, from: &Currency, to: &Currency) -> Option<f64> {
        self.rate(&CurrencyPair::new(from.clone(), to.clone())).ok()
    }

    /// Replace every entry with `table`.
    pub fn replace(&self, table: RateTable) {
        *self.table.write() = Arc::new(table);
    }

    /// Current table.
    pub fn snapshot(&self) -> Arc<RateTable> {
        Arc::clone(&self.table.read())
    }

    /// Whether `code` appears in the current table.
    pub fn knows_currency(&self, code: &str) -> bool {
        let currency = Currency::new(code);
        self.table
            .read()
            .get(&CurrencyPair::new(currency.clone(), currency))
            .is_some()
    }

    /// Time of the last successful update.
    pub fn last_updated(&self) -> Option<Timestamp> {
        self.table.read().updated_at()
    }

    /// Get the number of pairs in cache.
    pub fn len(&self) -> usize {
        self.table.read().len()
    }

    /// Check if cache is empty.
    pub fn is_empty(&self) -> bool {
        self.table.read().is_empty()
    }
}

impl Default for RateCache {
    fn default() -> Self {
        Self::new()
    }
}
