//! CLI configuration.

use multiconv_common::ConverterError;
use multiconv_fx::FxConfig;

/// Configuration for the command-line front end.
#[derive(Debug, Clone)]
pub struct CliConfig {
    /// Rate fetching configuration.
    pub fx: FxConfig,
    /// Emit logs as JSON lines.
    pub log_json: bool,
    /// Default log filter when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            fx: FxConfig::default(),
            log_json: false,
            log_level: "warn".to_string(),
        }
    }
}

impl CliConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self {
            fx: FxConfig::from_env(),
            ..Self::default()
        };

        if let Ok(flag) = std::env::var("MULTICONV_LOG_JSON") {
            config.log_json = matches!(flag.as_str(), "1" | "true" | "yes");
        }

        if let Ok(level) = std::env::var("MULTICONV_LOG_LEVEL") {
            config.log_level = level;
        }

        config
    }

    /// Validate configuration.
    pub fn validate(&self) -> multiconv_common::Result<()> {
        self.fx.validate()?;

        if self.log_level.trim().is_empty() {
            return Err(ConverterError::ConfigurationError(
                "Log level cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}
