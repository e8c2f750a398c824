//! Multiconv Common Types
//!
//! Shared types used across the multiconv workspace: currency codes and
//! pairs, unit categories, fetch identifiers, timing constants and the
//! top-level error type.

pub mod identifiers;
pub mod currency;
pub mod category;
pub mod error;
pub mod time;

pub use identifiers::*;
pub use currency::*;
pub use category::*;
pub use error::*;
pub use time::*;
