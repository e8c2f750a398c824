//! Rendering of command results.

use std::collections::BTreeMap;

use multiconv_common::{Currency, UnitCategory};
use multiconv_fx::{Conversion, RateStatus};

/// Significant digits shown for unit results.
const UNIT_PRECISION: usize = 6;

/// Decimal places shown for currency results.
const CURRENCY_DECIMALS: usize = 4;

/// Format a number with at most `digits` significant digits, trailing zeros
/// removed.
pub fn significant(value: f64, digits: usize) -> String {
    if value == 0.0 || !value.is_finite() {
        return value.to_string();
    }

    let magnitude = value.abs().log10().floor() as i32;
    let decimals = (digits as i32 - 1 - magnitude).max(0) as usize;
    let text = format!("{:.*}", decimals, value);

    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        text
    }
}

/// Result line for a conversion.
pub fn conversion_line(conversion: &Conversion) -> String {
    let value = match conversion.category {
        UnitCategory::Currency if conversion.rate.is_some() => {
            format!("{:.*}", CURRENCY_DECIMALS, conversion.output)
        }
        _ => significant(conversion.output, UNIT_PRECISION),
    };
    format!("Result: {} {}", value, conversion.to)
}

/// Units grouped by category.
pub fn units_listing(groups: &[(UnitCategory, &'static [&'static str])]) -> String {
    groups
        .iter()
        .map(|(category, units)| format!("{}: {}", category.title(), units.join(", ")))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Rate table against one base.
pub fn rates_listing(base: &Currency, rates: &BTreeMap<Currency, f64>) -> String {
    rates
        .iter()
        .map(|(currency, rate)| format!("1 {} = {} {}", base, significant(*rate, UNIT_PRECISION), currency))
        .collect::<Vec<_>>()
        .join("\n")
}

/// One status line, with a spinner marker while busy.
pub fn status_line(status: &RateStatus) -> String {
    if status.busy {
        format!("[busy] {}", status.message)
    } else {
        status.message.to_string()
    }
}
