//! Affine temperature conversion.

pub const CELSIUS: &str = "Celsius";
pub const FAHRENHEIT: &str = "Fahrenheit";

/// Whether `unit` names a supported temperature scale.
pub fn is_temperature_unit(unit: &str) -> bool {
    unit == CELSIUS || unit == FAHRENHEIT
}

/// Convert between Celsius and Fahrenheit.
///
/// Any other pair, including same-unit, returns `value` unchanged.
pub fn convert(from: &str, to: &str, value: f64) -> f64 {
    match (from, to) {
        (CELSIUS, FAHRENHEIT) => value * 9.0 / 5.0 + 32.0,
        (FAHRENHEIT, CELSIUS) => (value - 32.0) * 5.0 / 9.0,
        _ => value,
    }
}
