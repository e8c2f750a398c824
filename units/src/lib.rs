//! Multiconv Units
//!
//! Static conversion tables for physical units.
//!
//! # Features
//!
//! - Scale-factor tables for length, weight, volume and speed
//! - Affine Celsius/Fahrenheit conversion
//! - Category detection from a unit name
//! - Travel-time estimates from a distance and a speed
//!
//! # Example
//!
//! ```rust,ignore
//! use multiconv_units::ConversionTable;
//!
//! let table = ConversionTable::new();
//! let feet = table.convert("Meters", "Feet", 10.0);
//! ```

pub mod table;
pub mod temperature;
pub mod eta;
pub mod error;

pub use table::ConversionTable;
pub use eta::{estimate_eta, Eta};
pub use error::{UnitsError, UnitsResult};
