//! Single-flight rate fetch controller.
//!
//! The controller owns the fetch state and the rate cache. A refresh moves
//! the state from `Idle` to `InFlight`, spawns one task that races the
//! provider against the fetch timeout and the shutdown token, and the task
//! hands its result back through [`FetchController::complete`]. Results are
//! applied only when their fetch id matches the one in flight, so a response
//! that outlives its fetch can never touch the cache or the controls.

use std::sync::Arc;

use multiconv_common::{now, Currency, CurrencyPair, FetchId};
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::cache::{RateCache, RateTable};
use crate::config::FxConfig;
use crate::error::{FxError, FxResult};
use crate::provider::{RateProvider, RatesPayload};
use crate::state::{Completion, FetchState, RefreshOutcome};
use crate::status::{RateStatus, StatusMessage};

/// Outcome of a currency conversion that may need fresh rates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CurrencyConversion {
    /// A cached rate was available.
    Converted { rate: f64, value: f64 },
    /// No cached rate; a refresh is running. Ask again later.
    RetryLater(RefreshOutcome),
}

/// Drives rate refreshes and serves lookups from the cache.
pub struct FetchController {
    provider: Arc<dyn RateProvider>,
    cache: RateCache,
    state: Mutex<FetchState>,
    status: watch::Sender<RateStatus>,
    config: FxConfig,
    shutdown: CancellationToken,
}

impl FetchController {
    /// Create a controller. Nothing is fetched until asked.
    pub fn new(provider: Arc<dyn RateProvider>, config: FxConfig) -> Self {
        let (status, _) = watch::channel(RateStatus::initial());

        Self {
            provider,
            cache: RateCache::new(),
            state: Mutex::new(FetchState::Idle),
            status,
            config,
            shutdown: CancellationToken::new(),
        }
    }

    /// Ask for fresh rates against `base`.
    ///
    /// Returns immediately. If a fetch is already outstanding nothing is
    /// issued and its id is returned instead. Nothing is issued after
    /// [`shutdown`](Self::shutdown) or outside a Tokio runtime either.
    #[instrument(skip(self), fields(base = %base))]
    pub fn request_refresh(self: &Arc<Self>, base: Currency) -> RefreshOutcome {
        let runtime = match Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                warn!("No Tokio runtime, refresh not started");
                return RefreshOutcome::NoRuntime;
            }
        };

        let id = match self.begin(&base) {
            Ok(id) => id,
            Err(outcome) => {
                debug!(?outcome, "Refresh not started");
                return outcome;
            }
        };

        info!(fetch_id = %id, provider = self.provider.name(), "Fetching rates");

        let controller = Arc::clone(self);
        runtime.spawn(async move {
            let result = controller.fetch_with_deadline(&base).await;
            controller.complete(id, result);
        });

        RefreshOutcome::Started(id)
    }

    /// Deliver the result of fetch `id`.
    ///
    /// Ignored unless `id` is the fetch currently in flight.
    pub fn complete(&self, id: FetchId, result: FxResult<RatesPayload>) -> Completion {
        let mut state = self.state.lock();

        let base = match &*state {
            FetchState::InFlight { id: current, base, .. } if *current == id => base.clone(),
            other => {
                warn!(
                    fetch_id = %id,
                    in_flight = ?other.in_flight_id(),
                    "Ignoring result of a fetch that is no longer in flight"
                );
                return Completion::Stale;
            }
        };

        let message = match result.and_then(|payload| RateTable::from_payload(&payload, &base)) {
            Ok(table) => {
                let at = table.updated_at().unwrap_or_else(now);
                info!(
                    fetch_id = %id,
                    pairs = table.len(),
                    base = ?table.base(),
                    "Rates updated"
                );
                self.cache.replace(table);
                StatusMessage::Updated { at }
            }
            Err(e) => {
                warn!(
                    fetch_id = %id,
                    error = %e,
                    code = e.error_code(),
                    "Rate fetch failed, keeping cached rates"
                );
                StatusMessage::from(&e)
            }
        };

        *state = FetchState::Idle;
        self.status.send_replace(RateStatus::settled(
            message.clone(),
            self.cache.last_updated(),
        ));

        Completion::Applied(message)
    }

    /// Cached rate from `from` to `to`.
    pub fn lookup(&self, from: &Currency, to: &Currency) -> Option<f64> {
        self.cache.lookup(from, to)
    }

    /// Convert `value` with the cached rate, if any.
    pub fn convert_currency(&self, from: &Currency, to: &Currency, value: f64) -> Option<f64> {
        self.lookup(from, to).map(|rate| value * rate)
    }

    /// Convert with the cached rate, or start a refresh and report that the
    /// caller should retry. Never waits for the network.
    pub fn convert_or_refresh(
        self: &Arc<Self>,
        from: &Currency,
        to: &Currency,
        value: f64,
    ) -> CurrencyConversion {
        match self.lookup(from, to) {
            Some(rate) => CurrencyConversion::Converted {
                rate,
                value: value * rate,
            },
            None => {
                let pair = CurrencyPair::new(from.clone(), to.clone());
                debug!(pair = %pair, "No cached rate, requesting refresh");
                CurrencyConversion::RetryLater(self.request_refresh(self.config.base_currency.clone()))
            }
        }
    }

    /// Refresh now and then every `refresh_interval` until shutdown.
    pub async fn run_refresh_loop(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(self.config.refresh_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    debug!("Refresh loop stopping");
                    break;
                }
                _ = ticker.tick() => {
                    self.request_refresh(self.config.base_currency.clone());
                }
            }
        }
    }

    /// Spawn [`run_refresh_loop`](Self::run_refresh_loop) in the background.
    pub fn start(self: &Arc<Self>) -> JoinHandle<()> {
        info!(
            interval_secs = self.config.refresh_interval.as_secs(),
            base = %self.config.base_currency,
            "Starting periodic rate refresh"
        );
        tokio::spawn(Arc::clone(self).run_refresh_loop())
    }

    /// Stop the refresh loop and abandon any outstanding fetch.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Current fetch state.
    pub fn state(&self) -> FetchState {
        self.state.lock().clone()
    }

    /// Latest status snapshot.
    pub fn status(&self) -> RateStatus {
        self.status.borrow().clone()
    }

    /// Subscribe to status updates.
    pub fn subscribe(&self) -> watch::Receiver<RateStatus> {
        self.status.subscribe()
    }

    /// The rate cache.
    pub fn cache(&self) -> &RateCache {
        &self.cache
    }

    /// Controller configuration.
    pub fn config(&self) -> &FxConfig {
        &self.config
    }

    /// Move to `InFlight`, or say why no fetch may start.
    fn begin(&self, base: &Currency) -> Result<FetchId, RefreshOutcome> {
        let mut state = self.state.lock();

        if self.shutdown.is_cancelled() {
            return Err(RefreshOutcome::ShutDown);
        }

        if let Some(current) = state.in_flight_id() {
            return Err(RefreshOutcome::AlreadyInFlight(current));
        }

        let id = FetchId::new();
        *state = FetchState::InFlight {
            id,
            base: base.clone(),
            started_at: now(),
        };
        self.status
            .send_replace(RateStatus::fetching(self.cache.last_updated()));

        Ok(id)
    }

    async fn fetch_with_deadline(&self, base: &Currency) -> FxResult<RatesPayload> {
        let timeout = self.config.fetch_timeout;

        tokio::select! {
            _ = self.shutdown.cancelled() => Err(FxError::Cancelled),
            result = tokio::time::timeout(timeout, self.provider.fetch_rates(base)) => {
                result.unwrap_or_else(|_| Err(FxError::Timeout(timeout)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{MockReply, MockRateProvider};
    use std::time::Duration;

    fn sample_payload() -> RatesPayload {
        RatesPayload::new(
            Some(Currency::usd()),
            [("USD", 1.0), ("EUR", 0.9), ("GBP", 0.8)],
        )
    }

    fn setup(reply: MockReply) -> (Arc<MockRateProvider>, Arc<FetchController>) {
        let provider = Arc::new(MockRateProvider::new("test"));
        provider.set_reply(Currency::usd(), reply);
        let controller = Arc::new(FetchController::new(provider.clone(), FxConfig::default()));
        (provider, controller)
    }

    async fn settle() {
        // Paused clock: sleeping lets spawned fetches run to completion.
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_successful_refresh_populates_cache() {
        let (_, controller) = setup(MockReply::Payload(sample_payload()));
        assert!(!controller.status().controls_enabled);

        let outcome = controller.request_refresh(Currency::usd());
        assert!(outcome.started());
        assert!(controller.state().is_in_flight());
        let status = controller.status();
        assert!(status.busy);
        assert!(!status.controls_enabled);
        assert_eq!(status.message, StatusMessage::Fetching);

        settle().await;

        assert_eq!(controller.state(), FetchState::Idle);
        let eur_gbp = controller.lookup(&Currency::eur(), &Currency::gbp()).unwrap();
        assert!((eur_gbp - 0.8 / 0.9).abs() < 1e-12);
        assert_eq!(controller.lookup(&Currency::gbp(), &Currency::gbp()), Some(1.0));

        let status = controller.status();
        assert!(!status.busy);
        assert!(status.controls_enabled);
        assert!(matches!(status.message, StatusMessage::Updated { .. }));
        assert!(status.last_updated.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_flight() {
        let (provider, controller) = setup(MockReply::Payload(sample_payload()));
        provider.set_delay(Duration::from_secs(2));

        let first = controller.request_refresh(Currency::usd());
        let state_after_first = controller.state();
        let second = controller.request_refresh(Currency::eur());

        assert!(first.started());
        assert_eq!(second, RefreshOutcome::AlreadyInFlight(first.fetch_id().unwrap()));
        assert_eq!(controller.state(), state_after_first);

        tokio::time::sleep(Duration::from_secs(3)).await;

        assert_eq!(provider.calls(), 1);
        assert_eq!(controller.state(), FetchState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_returns_to_idle() {
        let (provider, controller) = setup(MockReply::Payload(sample_payload()));
        provider.set_delay(Duration::from_secs(30));

        controller.request_refresh(Currency::usd());
        tokio::time::sleep(Duration::from_millis(8001)).await;

        assert_eq!(controller.state(), FetchState::Idle);
        let status = controller.status();
        assert_eq!(status.message, StatusMessage::TimedOut);
        assert!(status.controls_enabled);
        assert!(!status.busy);

        // The abandoned request never lands, even after its delay elapses.
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(controller.cache().is_empty());
        assert_eq!(controller.status().message, StatusMessage::TimedOut);
    }

    #[tokio::test]
    async fn test_late_success_after_timeout_is_ignored() {
        let (_, controller) = setup(MockReply::Payload(sample_payload()));

        let first = controller.begin(&Currency::usd()).unwrap();
        let timed_out = controller.complete(first, Err(FxError::Timeout(Duration::from_secs(8))));
        assert_eq!(timed_out, Completion::Applied(StatusMessage::TimedOut));
        assert!(controller.status().controls_enabled);

        // Late response for the same fetch: nothing changes.
        assert_eq!(controller.complete(first, Ok(sample_payload())), Completion::Stale);
        assert_eq!(controller.state(), FetchState::Idle);
        assert!(controller.cache().is_empty());
        assert!(controller.status().controls_enabled);
    }

    #[tokio::test]
    async fn test_late_success_does_not_end_newer_fetch() {
        let (_, controller) = setup(MockReply::Payload(sample_payload()));

        let first = controller.begin(&Currency::usd()).unwrap();
        controller.complete(first, Err(FxError::Timeout(Duration::from_secs(8))));
        let second = controller.begin(&Currency::usd()).unwrap();

        assert_eq!(controller.complete(first, Ok(sample_payload())), Completion::Stale);
        assert_eq!(controller.state().in_flight_id(), Some(second));
        let status = controller.status();
        assert!(status.busy);
        assert!(!status.controls_enabled);
        assert!(controller.cache().is_empty());

        assert!(controller.complete(second, Ok(sample_payload())).was_applied());
        assert_eq!(controller.state(), FetchState::Idle);
        assert!(controller.status().controls_enabled);
        assert_eq!(controller.lookup(&Currency::usd(), &Currency::eur()), Some(0.9));
    }

    #[tokio::test]
    async fn test_failures_keep_stale_rates() {
        let (_, controller) = setup(MockReply::Payload(sample_payload()));

        let id = controller.begin(&Currency::usd()).unwrap();
        controller.complete(id, Ok(sample_payload()));

        let cases = [
            (FxError::Network("connection reset".into()), StatusMessage::Failed),
            (FxError::Parse("not an object".into()), StatusMessage::InvalidData),
            (FxError::EmptyRates, StatusMessage::Empty),
        ];

        for (error, expected) in cases {
            let id = controller.begin(&Currency::usd()).unwrap();
            assert_eq!(controller.complete(id, Err(error)), Completion::Applied(expected));
            assert_eq!(controller.lookup(&Currency::usd(), &Currency::eur()), Some(0.9));
            assert!(controller.status().controls_enabled);
        }

        // Well-formed but empty payload goes through the same path.
        let id = controller.begin(&Currency::usd()).unwrap();
        let empty = RatesPayload::new(Some(Currency::usd()), Vec::<(&str, f64)>::new());
        assert_eq!(
            controller.complete(id, Ok(empty)),
            Completion::Applied(StatusMessage::Empty)
        );
        assert_eq!(controller.lookup(&Currency::eur(), &Currency::gbp()), Some(0.8 / 0.9));

        // So does a payload whose rates are all unusable.
        let id = controller.begin(&Currency::usd()).unwrap();
        let unusable = RatesPayload::new(Some(Currency::usd()), [("EUR", 0.0), ("GBP", -1.0)]);
        assert_eq!(
            controller.complete(id, Ok(unusable)),
            Completion::Applied(StatusMessage::Empty)
        );
        assert_eq!(controller.lookup(&Currency::usd(), &Currency::eur()), Some(0.9));
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_reply_from_provider() {
        let (_, controller) = setup(MockReply::Malformed("<html>".into()));

        controller.request_refresh(Currency::usd());
        settle().await;

        assert_eq!(controller.status().message, StatusMessage::InvalidData);
        assert!(controller.cache().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_convert_or_refresh() {
        let (provider, controller) = setup(MockReply::Payload(sample_payload()));

        let first = controller.convert_or_refresh(&Currency::usd(), &Currency::eur(), 100.0);
        assert!(matches!(first, CurrencyConversion::RetryLater(RefreshOutcome::Started(_))));

        let again = controller.convert_or_refresh(&Currency::usd(), &Currency::eur(), 100.0);
        assert!(matches!(again, CurrencyConversion::RetryLater(RefreshOutcome::AlreadyInFlight(_))));

        settle().await;
        assert_eq!(provider.calls(), 1);

        match controller.convert_or_refresh(&Currency::usd(), &Currency::eur(), 100.0) {
            CurrencyConversion::Converted { rate, value } => {
                assert_eq!(rate, 0.9);
                assert!((value - 90.0).abs() < 1e-9);
            }
            other => panic!("expected conversion, got {:?}", other),
        }
        assert_eq!(controller.convert_currency(&Currency::gbp(), &Currency::usd(), 8.0), Some(10.0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_loop_ticks_and_stops() {
        let (provider, controller) = setup(MockReply::Payload(sample_payload()));

        let handle = controller.start();
        settle().await;
        assert_eq!(provider.calls(), 1);

        tokio::time::sleep(Duration::from_secs(3600)).await;
        settle().await;
        assert_eq!(provider.calls(), 2);

        controller.shutdown();
        handle.await.unwrap();

        tokio::time::sleep(Duration::from_secs(7200)).await;
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_in_flight_fetch() {
        let (provider, controller) = setup(MockReply::Payload(sample_payload()));
        provider.set_delay(Duration::from_secs(5));

        controller.request_refresh(Currency::usd());
        controller.shutdown();
        settle().await;

        assert_eq!(controller.state(), FetchState::Idle);
        assert_eq!(controller.status().message, StatusMessage::Cancelled);
        assert!(controller.cache().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_loop_respects_manual_fetch_in_flight() {
        let provider = Arc::new(MockRateProvider::new("test"));
        provider.set_reply(Currency::usd(), MockReply::Payload(sample_payload()));
        provider.set_delay(Duration::from_secs(5));
        let config = FxConfig {
            refresh_interval: Duration::from_secs(2),
            ..FxConfig::default()
        };
        let controller = Arc::new(FetchController::new(provider.clone(), config));

        let manual = controller.request_refresh(Currency::usd());
        assert!(manual.started());

        // Ticks at 0s and 2s both land while the manual fetch is running.
        let handle = controller.start();
        tokio::time::sleep(Duration::from_millis(2500)).await;

        assert_eq!(provider.calls(), 1);
        assert_eq!(controller.state().in_flight_id(), manual.fetch_id());

        controller.shutdown();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_refresh_after_shutdown_is_refused() {
        let (provider, controller) = setup(MockReply::Payload(sample_payload()));
        let before = controller.status();

        controller.shutdown();
        assert_eq!(controller.request_refresh(Currency::usd()), RefreshOutcome::ShutDown);

        settle().await;
        assert_eq!(controller.state(), FetchState::Idle);
        assert_eq!(controller.status(), before);
        assert_eq!(provider.calls(), 0);
    }

    #[test]
    fn test_refresh_outside_runtime_is_refused() {
        let (provider, controller) = setup(MockReply::Payload(sample_payload()));

        assert_eq!(controller.request_refresh(Currency::usd()), RefreshOutcome::NoRuntime);
        assert_eq!(controller.state(), FetchState::Idle);
        assert!(!controller.status().busy);

        let miss = controller.convert_or_refresh(&Currency::usd(), &Currency::eur(), 1.0);
        assert_eq!(miss, CurrencyConversion::RetryLater(RefreshOutcome::NoRuntime));
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_status_subscription() {
        let (_, controller) = setup(MockReply::Payload(sample_payload()));
        let mut updates = controller.subscribe();

        let id = controller.begin(&Currency::usd()).unwrap();
        updates.changed().await.unwrap();
        assert_eq!(updates.borrow().message, StatusMessage::Fetching);

        controller.complete(id, Err(FxError::Network("down".into())));
        updates.changed().await.unwrap();
        assert_eq!(updates.borrow().message, StatusMessage::Failed);
    }
}
