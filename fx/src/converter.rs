//! Converter service routing units to the table or the rate cache.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use multiconv_common::{ConverterError, Currency, CurrencyPair, UnitCategory};
use multiconv_units::ConversionTable;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::controller::{CurrencyConversion, FetchController};

/// A completed conversion.
#[derive(Debug, Clone, Serialize)]
pub struct Conversion {
    /// Source unit.
    pub from: String,
    /// Target unit.
    pub to: String,
    /// Category of the source unit.
    pub category: UnitCategory,
    /// Input value.
    pub input: f64,
    /// Output value.
    pub output: f64,
    /// Exchange rate used, for currency conversions.
    pub rate: Option<f64>,
    /// When the conversion was executed.
    pub executed_at: DateTime<Utc>,
}

impl Conversion {
    fn new(from: &str, to: &str, category: UnitCategory, input: f64, output: f64, rate: Option<f64>) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_string(),
            category,
            input,
            output,
            rate,
            executed_at: Utc::now(),
        }
    }
}

/// Explicitly constructed converter owning the unit tables and a handle to
/// the rate controller.
pub struct Converter {
    table: ConversionTable,
    rates: Arc<FetchController>,
}

impl Converter {
    /// Create a converter.
    pub fn new(table: ConversionTable, rates: Arc<FetchController>) -> Self {
        Self { table, rates }
    }

    /// Convert `value` from one unit to another.
    ///
    /// Currency pairs use cached rates; a missing rate starts a refresh and
    /// returns [`ConverterError::RatesUpdating`]. A code the loaded rates do
    /// not list is [`ConverterError::UnknownCurrency`]. Everything else goes
    /// through the static tables and never fails.
    pub fn convert(&self, from: &str, to: &str, value: f64) -> multiconv_common::Result<Conversion> {
        if self.is_currency(from) && self.is_currency(to) {
            return self.convert_currency(from, to, value);
        }

        let category = self.table.category_of(from);
        let output = self.table.convert(from, to, value);
        debug!(from, to, %category, value, output, "Converted locally");

        Ok(Conversion::new(from, to, category, value, output, None))
    }

    /// Unit tables.
    pub fn table(&self) -> &ConversionTable {
        &self.table
    }

    /// Rate controller.
    pub fn rates(&self) -> &Arc<FetchController> {
        &self.rates
    }

    /// Listed currencies, plus any three-letter code the unit tables do not
    /// claim for another category.
    fn is_currency(&self, unit: &str) -> bool {
        match self.table.known_category(unit) {
            Some(category) => category == UnitCategory::Currency,
            None => Currency::new(unit).is_valid(),
        }
    }

    fn convert_currency(&self, from: &str, to: &str, value: f64) -> multiconv_common::Result<Conversion> {
        let from_currency = Currency::new(from);
        let to_currency = Currency::new(to);
        let pair = CurrencyPair::new(from_currency.clone(), to_currency.clone());

        let cache = self.rates.cache();
        if !cache.is_empty() {
            if let Some(unknown) = [&from_currency, &to_currency]
                .into_iter()
                .find(|c| !cache.knows_currency(c.code()))
            {
                debug!(pair = %pair, currency = %unknown, "Currency not in loaded rates");
                return Err(ConverterError::UnknownCurrency(unknown.clone()));
            }
        }

        match self.rates.convert_or_refresh(&from_currency, &to_currency, value) {
            CurrencyConversion::Converted { rate, value: output } => {
                info!(
                    pair = %pair,
                    rate,
                    "Converted {} {} \u{2192} {}",
                    value,
                    from_currency,
                    to_currency
                );
                Ok(Conversion::new(
                    from_currency.code(),
                    to_currency.code(),
                    UnitCategory::Currency,
                    value,
                    output,
                    Some(rate),
                ))
            }
            CurrencyConversion::RetryLater(outcome) if outcome.is_pending() => {
                Err(ConverterError::RatesUpdating(pair))
            }
            CurrencyConversion::RetryLater(outcome) => {
                warn!(pair = %pair, ?outcome, "No rate and no refresh possible");
                Err(ConverterError::RatesUnavailable(pair))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FxConfig;
    use crate::provider::{MockReply, MockRateProvider, RatesPayload};
    use std::time::Duration;

    fn setup() -> (Arc<MockRateProvider>, Converter) {
        let provider = Arc::new(MockRateProvider::new("test"));
        provider.set_reply(
            Currency::usd(),
            MockReply::Payload(RatesPayload::new(
                Some(Currency::usd()),
                [("EUR", 0.9), ("GBP", 0.8), ("CHF", 0.88)],
            )),
        );
        let controller = Arc::new(FetchController::new(provider.clone(), FxConfig::default()));
        (provider, Converter::new(ConversionTable::new(), controller))
    }

    #[tokio::test(start_paused = true)]
    async fn test_units_do_not_touch_rates() {
        let (provider, converter) = setup();

        let conversion = converter.convert("Celsius", "Fahrenheit", 100.0).unwrap();
        assert_eq!(conversion.output, 212.0);
        assert_eq!(conversion.category, UnitCategory::Temperature);
        assert!(conversion.rate.is_none());

        let mismatched = converter.convert("Meters", "Kilograms", 5.0).unwrap();
        assert_eq!(mismatched.output, 5.0);

        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_currency_miss_then_hit() {
        let (provider, converter) = setup();

        let err = converter.convert("USD", "EUR", 10.0).unwrap_err();
        assert!(err.is_retryable());

        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(provider.calls(), 1);

        let conversion = converter.convert("USD", "EUR", 10.0).unwrap();
        assert_eq!(conversion.rate, Some(0.9));
        assert!((conversion.output - 9.0).abs() < 1e-9);

        // CHF is not a listed unit but the last fetch knows it.
        let chf = converter.convert("CHF", "GBP", 88.0).unwrap();
        assert!((chf.output - 80.0).abs() < 1e-9);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unlisted_and_lowercase_codes_use_rates() {
        let (provider, converter) = setup();

        // Fresh cache: neither pair is listed or loaded, both still fetch.
        let err = converter.convert("CHF", "GBP", 88.0).unwrap_err();
        assert!(matches!(err, ConverterError::RatesUpdating(_)));
        assert!(converter.convert("usd", "eur", 10.0).unwrap_err().is_retryable());

        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(provider.calls(), 1);

        let chf = converter.convert("CHF", "GBP", 88.0).unwrap();
        assert_eq!(chf.category, UnitCategory::Currency);
        assert!((chf.output - 80.0).abs() < 1e-9);

        let lower = converter.convert("usd", "eur", 10.0).unwrap();
        assert_eq!(lower.from, "USD");
        assert_eq!(lower.rate, Some(0.9));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_currency_after_load() {
        let (provider, converter) = setup();
        converter.convert("USD", "EUR", 1.0).unwrap_err();
        tokio::time::sleep(Duration::from_millis(1)).await;

        let err = converter.convert("USD", "XYZ", 1.0).unwrap_err();
        assert!(matches!(err, ConverterError::UnknownCurrency(ref c) if c.code() == "XYZ"));
        assert!(!err.is_retryable());
        assert_eq!(provider.calls(), 1);

        // Three-letter unit names stay units.
        let speed = converter.convert("mph", "m/s", 1.0).unwrap();
        assert_eq!(speed.category, UnitCategory::Speed);
    }

    #[test]
    fn test_currency_miss_outside_runtime() {
        let (provider, converter) = setup();

        let err = converter.convert("USD", "EUR", 1.0).unwrap_err();
        assert!(matches!(err, ConverterError::RatesUnavailable(_)));
        assert!(!err.is_retryable());
        assert_eq!(provider.calls(), 0);
    }
}
