//! Converter session: the service objects behind each command.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use multiconv_common::{Currency, UnitCategory};
use multiconv_fx::{Conversion, Converter, FetchController, FxConfig, RateProvider, RateStatus};
use multiconv_units::{estimate_eta, ConversionTable, Eta};
use tokio::sync::watch;
use tracing::info;

/// Owns the converter and the rate controller for one CLI run.
pub struct Session {
    converter: Converter,
}

impl Session {
    /// Wire a session around `provider`.
    pub fn new(provider: Arc<dyn RateProvider>, config: FxConfig) -> Self {
        let controller = Arc::new(FetchController::new(provider, config));
        Self {
            converter: Converter::new(ConversionTable::new(), controller),
        }
    }

    /// Rate controller.
    pub fn controller(&self) -> &Arc<FetchController> {
        self.converter.rates()
    }

    /// Convert a value. With `wait`, a missing currency rate is fetched and
    /// the conversion retried once.
    pub async fn convert(
        &self,
        from: &str,
        to: &str,
        value: f64,
        reverse: bool,
        wait: bool,
    ) -> anyhow::Result<Conversion> {
        let (from, to) = if reverse { (to, from) } else { (from, to) };

        match self.converter.convert(from, to, value) {
            Ok(conversion) => Ok(conversion),
            Err(e) if e.is_retryable() && wait => {
                info!("Currency rates are updating, waiting for them");
                self.wait_for_rates().await?;
                Ok(self.converter.convert(from, to, value)?)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Fetch rates against `base` and return them keyed by currency.
    pub async fn rates(&self, base: Currency) -> anyhow::Result<BTreeMap<Currency, f64>> {
        self.controller().request_refresh(base.clone());
        self.wait_for_rates().await?;

        let table = self.controller().cache().snapshot();
        let rates = table
            .currencies()
            .into_iter()
            .filter_map(|c| self.controller().lookup(&base, &c).map(|rate| (c, rate)))
            .collect::<BTreeMap<_, _>>();

        if rates.is_empty() {
            return Err(anyhow!("No rates available for base {}", base));
        }
        Ok(rates)
    }

    /// Units per category.
    pub fn units(&self, category: Option<UnitCategory>) -> Vec<(UnitCategory, &'static [&'static str])> {
        let table = self.converter.table();
        match category {
            Some(c) => vec![(c, table.units_for(c))],
            None => UnitCategory::ALL
                .into_iter()
                .map(|c| (c, table.units_for(c)))
                .collect(),
        }
    }

    /// Travel time estimate.
    pub fn eta(&self, distance: f64, speed: f64) -> anyhow::Result<Eta> {
        estimate_eta(distance, speed).context("cannot estimate travel time")
    }

    /// Keep rates fresh and hand every status change to `on_status` until
    /// `stop` resolves.
    pub async fn watch<F, S>(&self, stop: S, mut on_status: F) -> anyhow::Result<()>
    where
        F: FnMut(&RateStatus),
        S: std::future::Future<Output = ()>,
    {
        let controller = Arc::clone(self.controller());
        let mut updates = controller.subscribe();
        let handle = controller.start();

        tokio::pin!(stop);
        loop {
            tokio::select! {
                _ = &mut stop => break,
                changed = updates.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    on_status(&*updates.borrow_and_update());
                }
            }
        }

        controller.shutdown();
        handle.await.context("refresh loop panicked")?;
        Ok(())
    }

    /// Wait until no fetch is outstanding; fail if the last one failed.
    async fn wait_for_rates(&self) -> anyhow::Result<()> {
        let mut updates: watch::Receiver<RateStatus> = self.controller().subscribe();

        let status = updates
            .wait_for(|status| !status.busy)
            .await
            .context("rate controller dropped")?
            .clone();

        if status.message.is_failure() {
            return Err(anyhow!("{}", status.message));
        }
        Ok(())
    }
}
