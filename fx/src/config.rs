//! Rate fetching configuration.

use std::time::Duration;

use multiconv_common::{constants, ConverterError, Currency};

/// Default rate provider endpoint.
pub const DEFAULT_RATES_URL: &str = "https://api.exchangerate.host/latest";

/// Configuration for the fetch controller.
#[derive(Debug, Clone)]
pub struct FxConfig {
    /// Rate provider endpoint; `?base=<CODE>` is appended per request.
    pub endpoint: String,
    /// Base currency for background and on-demand refreshes.
    pub base_currency: Currency,
    /// Time allowed for one fetch.
    pub fetch_timeout: Duration,
    /// Interval between proactive refreshes.
    pub refresh_interval: Duration,
}

impl Default for FxConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_RATES_URL.to_string(),
            base_currency: Currency::usd(),
            fetch_timeout: constants::fetch_timeout(),
            refresh_interval: constants::refresh_interval(),
        }
    }
}

impl FxConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("MULTICONV_RATES_URL") {
            config.endpoint = url;
        }

        if let Ok(base) = std::env::var("MULTICONV_BASE_CURRENCY") {
            config.base_currency = Currency::new(base);
        }

        if let Ok(ms) = std::env::var("MULTICONV_FETCH_TIMEOUT_MS") {
            if let Ok(ms) = ms.parse() {
                config.fetch_timeout = Duration::from_millis(ms);
            }
        }

        if let Ok(secs) = std::env::var("MULTICONV_REFRESH_INTERVAL_SECS") {
            if let Ok(secs) = secs.parse() {
                config.refresh_interval = Duration::from_secs(secs);
            }
        }

        config
    }

    /// Validate configuration.
    pub fn validate(&self) -> multiconv_common::Result<()> {
        if self.endpoint.is_empty() {
            return Err(ConverterError::ConfigurationError(
                "Rates endpoint cannot be empty".to_string(),
            ));
        }

        if !self.endpoint.starts_with("http://") && !self.endpoint.starts_with("https://") {
            return Err(ConverterError::ConfigurationError(format!(
                "Rates endpoint must be an http(s) URL: {}",
                self.endpoint
            )));
        }

        if !self.base_currency.is_valid() {
            return Err(ConverterError::ConfigurationError(format!(
                "Invalid base currency: {}",
                self.base_currency
            )));
        }

        if self.fetch_timeout.is_zero() {
            return Err(ConverterError::ConfigurationError(
                "Fetch timeout cannot be zero".to_string(),
            ));
        }

        if self.refresh_interval.is_zero() {
            return Err(ConverterError::ConfigurationError(
                "Refresh interval cannot be zero".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = FxConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.fetch_timeout, Duration::from_millis(8000));
        assert_eq!(config.refresh_interval, Duration::from_secs(3600));
        assert_eq!(config.base_currency, Currency::usd());
    }

    #[test]
    fn test_invalid_config() {
        let mut config = FxConfig::default();
        config.fetch_timeout = Duration::ZERO;
        assert!(config.validate().is_err());

        let mut config = FxConfig::default();
        config.endpoint = "ftp://rates".to_string();
        assert!(config.validate().is_err());

        let mut config = FxConfig::default();
        config.base_currency = Currency::new("DOLLARS");
        assert!(config.validate().is_err());
    }
}
