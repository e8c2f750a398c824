//! Rate provider trait and the HTTP implementation.

use std::collections::BTreeMap;

use async_trait::async_trait;
use multiconv_common::Currency;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::error::{FxError, FxResult};

/// Parsed provider response: `{ "base": "USD", "rates": { "EUR": 0.9, ... } }`.
///
/// `rates` may be empty here; deciding what an empty set means is left to
/// the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct RatesPayload {
    /// Base currency reported by the provider, if any.
    pub base: Option<Currency>,
    /// Units of each currency per one unit of the base.
    pub rates: BTreeMap<Currency, f64>,
}

impl RatesPayload {
    /// Build a payload from code/rate pairs.
    pub fn new<I, C>(base: Option<Currency>, rates: I) -> Self
    where
        I: IntoIterator<Item = (C, f64)>,
        C: Into<Currency>,
    {
        Self {
            base,
            rates: rates.into_iter().map(|(c, r)| (c.into(), r)).collect(),
        }
    }

    /// Parse a raw response body.
    ///
    /// Non-numeric rate values are kept as 0.0 so the pair builder skips them.
    pub fn parse(body: &[u8]) -> FxResult<Self> {
        let document: Value =
            serde_json::from_slice(body).map_err(|e| FxError::Parse(e.to_string()))?;

        let object = document
            .as_object()
            .ok_or_else(|| FxError::Parse("response is not a JSON object".to_string()))?;

        let rates = object
            .get("rates")
            .and_then(Value::as_object)
            .ok_or_else(|| FxError::Parse("missing `rates` object".to_string()))?;

        let base = object
            .get("base")
            .and_then(Value::as_str)
            .filter(|code| !code.trim().is_empty())
            .map(Currency::new);

        let rates = rates
            .iter()
            .map(|(code, value)| (Currency::new(code.as_str()), value.as_f64().unwrap_or(0.0)))
            .collect();

        Ok(Self { base, rates })
    }
}

/// Trait for exchange rate providers.
#[async_trait]
pub trait RateProvider: Send + Sync {
    /// Get the provider name.
    fn name(&self) -> &str;

    /// Fetch the latest rates relative to `base`.
    async fn fetch_rates(&self, base: &Currency) -> FxResult<RatesPayload>;
}

/// Provider backed by an HTTP JSON endpoint.
pub struct HttpRateProvider {
    /// Reusable HTTP client with connection pooling.
    http: reqwest::Client,
    /// Endpoint URL without query string.
    endpoint: String,
}

impl HttpRateProvider {
    /// Create a provider for `endpoint`.
    ///
    /// No client-level timeout is set; the fetch controller owns the budget.
    pub fn new(endpoint: impl Into<String>) -> FxResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("multiconv/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FxError::Client(e.to_string()))?;

        Ok(Self {
            http,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl RateProvider for HttpRateProvider {
    fn name(&self) -> &str {
        "HTTP"
    }

    #[instrument(skip(self), fields(endpoint = %self.endpoint, base = %base))]
    async fn fetch_rates(&self, base: &Currency) -> FxResult<RatesPayload> {
        let response = self
            .http
            .get(&self.endpoint)
            .query(&[("base", base.code())])
            .send()
            .await
            .map_err(|e| FxError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FxError::Http {
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FxError::Network(e.to_string()))?;

        let payload = RatesPayload::parse(&body)?;

        debug!(
            rate_count = payload.rates.len(),
            reported_base = ?payload.base,
            "Fetched rates from provider"
        );

        Ok(payload)
    }
}

/// Scripted answer for [`MockRateProvider`].
#[cfg(any(test, feature = "test-utils"))]
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Return this payload.
    Payload(RatesPayload),
    /// Fail as a transport error.
    NetworkError(String),
    /// Fail as an unparseable body.
    Malformed(String),
}

/// Mock rate provider for testing.
#[cfg(any(test, feature = "test-utils"))]
pub struct MockRateProvider {
    name: String,
    replies: dashmap::DashMap<Currency, MockReply>,
    delay: parking_lot::Mutex<std::time::Duration>,
    calls: std::sync::atomic::AtomicUsize,
}

#[cfg(any(test, feature = "test-utils"))]
impl MockRateProvider {
    /// Create a new mock provider.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            replies: dashmap::DashMap::new(),
            delay: parking_lot::Mutex::new(std::time::Duration::ZERO),
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// Set the reply for fetches against `base`.
    pub fn set_reply(&self, base: Currency, reply: MockReply) {
        self.replies.insert(base, reply);
    }

    /// Delay every reply by `delay`.
    pub fn set_delay(&self, delay: std::time::Duration) {
        *self.delay.lock() = delay;
    }

    /// Number of fetches issued so far.
    pub fn calls(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(any(test, feature = "test-utils"))]
#[async_trait]
impl RateProvider for MockRateProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_rates(&self, base: &Currency) -> FxResult<RatesPayload> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);

        let delay = *self.delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let reply = self
            .replies
            .get(base)
            .map(|r| r.clone())
            .ok_or_else(|| FxError::Network(format!("no scripted reply for {}", base)))?;

        match reply {
            MockReply::Payload(payload) => Ok(payload),
            MockReply::NetworkError(message) => Err(FxError::Network(message)),
            MockReply::Malformed(message) => Err(FxError::Parse(message)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_parse_payload() {
        let body = br#"{"base":"USD","rates":{"EUR":0.9,"GBP":0.8,"BAD":"x"}}"#;
        let payload = RatesPayload::parse(body).unwrap();

        assert_eq!(payload.base, Some(Currency::usd()));
        assert_eq!(payload.rates.get(&Currency::eur()), Some(&0.9));
        assert_eq!(payload.rates.get(&Currency::new("BAD")), Some(&0.0));
    }

    #[test]
    fn test_parse_rejects_non_object_and_missing_rates() {
        assert!(matches!(RatesPayload::parse(b"[1,2]"), Err(FxError::Parse(_))));
        assert!(matches!(RatesPayload::parse(b"{\"base\":\"USD\"}"), Err(FxError::Parse(_))));
        assert!(matches!(RatesPayload::parse(b"not json"), Err(FxError::Parse(_))));
    }

    #[test]
    fn test_parse_keeps_empty_rates() {
        let payload = RatesPayload::parse(br#"{"rates":{}}"#).unwrap();
        assert!(payload.rates.is_empty());
        assert_eq!(payload.base, None);
    }

    #[tokio::test]
    async fn test_mock_provider() {
        let provider = MockRateProvider::new("test");
        let payload = RatesPayload::new(Some(Currency::usd()), [("EUR", 0.9)]);
        provider.set_reply(Currency::usd(), MockReply::Payload(payload.clone()));

        assert_eq!(assert_ok!(provider.fetch_rates(&Currency::usd()).await), payload);
        assert_err!(provider.fetch_rates(&Currency::gbp()).await);
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_http_provider_sends_base_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/latest"))
            .and(query_param("base", "EUR"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                r#"{"base":"EUR","rates":{"USD":1.1,"GBP":0.85}}"#,
                "application/json",
            ))
            .expect(1)
            .mount(&server)
            .await;

        let provider = HttpRateProvider::new(format!("{}/latest", server.uri())).unwrap();
        let payload = provider.fetch_rates(&Currency::eur()).await.unwrap();

        assert_eq!(payload.base, Some(Currency::eur()));
        assert_eq!(payload.rates.len(), 2);
    }

    #[tokio::test]
    async fn test_http_provider_maps_status_and_body_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/down"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/garbage"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let down = HttpRateProvider::new(format!("{}/down", server.uri())).unwrap();
        assert!(matches!(
            down.fetch_rates(&Currency::usd()).await,
            Err(FxError::Http { status: 503 })
        ));

        let garbage = HttpRateProvider::new(format!("{}/garbage", server.uri())).unwrap();
        assert!(matches!(
            garbage.fetch_rates(&Currency::usd()).await,
            Err(FxError::Parse(_))
        ));
    }

    #[tokio::test]
    async fn test_http_provider_unreachable_is_network_error() {
        let provider = HttpRateProvider::new("http://127.0.0.1:1/latest").unwrap();
        assert!(matches!(
            provider.fetch_rates(&Currency::usd()).await,
            Err(FxError::Network(_))
        ));
    }
}
