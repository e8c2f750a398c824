//! Per-category scale-factor tables and the conversion entry point.

use std::collections::HashMap;

use multiconv_common::UnitCategory;
use tracing::debug;

use crate::temperature;

const LENGTH: &[(&str, f64)] = &[
    ("Meters", 1.0),
    ("Feet", 3.28084),
    ("Kilometers", 1000.0),
    ("Miles", 1609.34),
];

const WEIGHT: &[(&str, f64)] = &[("Kilograms", 1.0), ("Pounds", 2.20462)];

const VOLUME: &[(&str, f64)] = &[
    ("Liters", 1.0),
    ("Milliliters", 0.001),
    ("Gallons", 3.78541),
];

const SPEED: &[(&str, f64)] = &[("m/s", 1.0), ("km/h", 0.277778), ("mph", 0.44704)];

const LENGTH_UNITS: &[&str] = &["Meters", "Feet", "Kilometers", "Miles"];
const WEIGHT_UNITS: &[&str] = &["Kilograms", "Pounds"];
const VOLUME_UNITS: &[&str] = &["Liters", "Milliliters", "Gallons"];
const SPEED_UNITS: &[&str] = &["m/s", "km/h", "mph"];
const TEMPERATURE_UNITS: &[&str] = &[temperature::CELSIUS, temperature::FAHRENHEIT];

/// Currencies offered for selection. Their rates live in the rate cache.
pub const CURRENCY_UNITS: &[&str] = &["USD", "ZAR", "EUR", "GBP", "JPY"];

/// Category used for units no table recognises.
pub const FALLBACK_CATEGORY: UnitCategory = UnitCategory::Length;

/// Immutable unit conversion tables.
///
/// Scale categories hold a factor per unit, normalized so the category's
/// base unit is 1.0. Temperature is handled by affine formulas.
#[derive(Debug, Clone)]
pub struct ConversionTable {
    factors: HashMap<UnitCategory, HashMap<&'static str, f64>>,
}

impl ConversionTable {
    /// Build the tables.
    pub fn new() -> Self {
        let factors = [
            (UnitCategory::Length, LENGTH),
            (UnitCategory::Weight, WEIGHT),
            (UnitCategory::Volume, VOLUME),
            (UnitCategory::Speed, SPEED),
        ]
        .into_iter()
        .map(|(category, table)| (category, table.iter().copied().collect()))
        .collect();

        Self { factors }
    }

    /// Determine the category a unit belongs to.
    ///
    /// First match wins in the order length, weight, volume, speed,
    /// temperature, currency. Unrecognised units fall back to length.
    pub fn category_of(&self, unit: &str) -> UnitCategory {
        self.known_category(unit).unwrap_or(FALLBACK_CATEGORY)
    }

    /// Category of a unit the tables list, without the length fallback.
    pub fn known_category(&self, unit: &str) -> Option<UnitCategory> {
        const SCALED: [UnitCategory; 4] = [
            UnitCategory::Length,
            UnitCategory::Weight,
            UnitCategory::Volume,
            UnitCategory::Speed,
        ];

        if let Some(category) = SCALED.into_iter().find(|c| self.factor(*c, unit).is_some()) {
            return Some(category);
        }

        if temperature::is_temperature_unit(unit) {
            return Some(UnitCategory::Temperature);
        }

        if CURRENCY_UNITS.contains(&unit) {
            return Some(UnitCategory::Currency);
        }

        None
    }

    /// Scale factor of `unit` within `category`, if the category has one.
    pub fn factor(&self, category: UnitCategory, unit: &str) -> Option<f64> {
        self.factors.get(&category)?.get(unit).copied()
    }

    /// Convert `value` from one unit to another.
    ///
    /// Units from different categories leave the value unchanged, as do
    /// unknown units and currency pairs (those go through the rate cache).
    pub fn convert(&self, from: &str, to: &str, value: f64) -> f64 {
        let category = self.category_of(from);
        let to_category = self.category_of(to);

        if category != to_category {
            debug!(from, to, %category, %to_category, "Mismatched categories, value unchanged");
            return value;
        }

        match category {
            UnitCategory::Temperature => temperature::convert(from, to, value),
            UnitCategory::Currency => value,
            scaled => match (self.factor(scaled, from), self.factor(scaled, to)) {
                (Some(from_factor), Some(to_factor)) => value * (to_factor / from_factor),
                _ => value,
            },
        }
    }

    /// Units offered for a category, in display order.
    pub fn units_for(&self, category: UnitCategory) -> &'static [&'static str] {
        match category {
            UnitCategory::Length => LENGTH_UNITS,
            UnitCategory::Weight => WEIGHT_UNITS,
            UnitCategory::Temperature => TEMPERATURE_UNITS,
            UnitCategory::Volume => VOLUME_UNITS,
            UnitCategory::Speed => SPEED_UNITS,
            UnitCategory::Currency => CURRENCY_UNITS,
        }
    }
}

impl Default for ConversionTable {
    fn default() -> Self {
        Self::new()
    }
}
