//! Multiconv FX
//!
//! Exchange rate cache and fetch controller for currency conversion.
//!
//! # Features
//!
//! - Pairwise rate table rebuilt wholesale from each successful fetch
//! - Single-flight refresh with timeout and stale-completion rejection
//! - Busy/enabled status published on a watch channel
//! - Periodic background refresh with cooperative shutdown
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use multiconv_fx::{FetchController, FxConfig, HttpRateProvider};
//!
//! let config = FxConfig::from_env();
//! let provider = Arc::new(HttpRateProvider::new(&config.endpoint)?);
//! let controller = Arc::new(FetchController::new(provider, config));
//!
//! controller.request_refresh(Currency::usd());
//! let rate = controller.lookup(&Currency::usd(), &Currency::eur());
//! ```

pub mod config;
pub mod controller;
pub mod converter;
pub mod cache;
pub mod provider;
pub mod state;
pub mod status;
pub mod error;

pub use config::FxConfig;
pub use controller::{CurrencyConversion, FetchController};
pub use converter::{Conversion, Converter};
pub use cache::{RateCache, RateTable};
pub use provider::{HttpRateProvider, RateProvider, RatesPayload};
pub use state::{Completion, FetchState, RefreshOutcome};
pub use status::{RateStatus, StatusMessage};
pub use error::{FxError, FxResult};
