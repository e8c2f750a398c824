//! Travel-time estimates for the speed category.

use std::fmt;

use serde::Serialize;

use crate::error::{UnitsError, UnitsResult};

/// Estimated time to cover a distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Eta {
    /// Whole hours, minutes and seconds.
    Finite { hours: u64, minutes: u64, seconds: u64 },
    /// Speed is zero, the distance is never covered.
    Unbounded,
}

impl Eta {
    fn from_seconds(total: u64) -> Self {
        Eta::Finite {
            hours: total / 3600,
            minutes: (total % 3600) / 60,
            seconds: total % 60,
        }
    }
}

impl fmt::Display for Eta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Eta::Finite { hours, minutes, seconds } => {
                write!(f, "ETA: {hours}h {minutes}m {seconds}s")
            }
            Eta::Unbounded => f.write_str("ETA: \u{221e} (Speed is zero)"),
        }
    }
}

/// Estimate how long `distance` takes at `speed`.
///
/// Both values must be in matching units (metres and metres per second
/// give seconds). Fractional seconds are truncated.
pub fn estimate_eta(distance: f64, speed: f64) -> UnitsResult<Eta> {
    if !distance.is_finite() || distance < 0.0 {
        return Err(UnitsError::InvalidInput { field: "distance", value: distance });
    }
    if !speed.is_finite() || speed < 0.0 {
        return Err(UnitsError::InvalidInput { field: "speed", value: speed });
    }
    if speed == 0.0 {
        return Ok(Eta::Unbounded);
    }

    Ok(Eta::from_seconds((distance / speed) as u64))
}
