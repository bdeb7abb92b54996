//! Normalization of locale-formatted numeric tokens.
//!
//! The report exports use `.` as the thousands separator and `,` as the
//! decimal separator, and wrap negative amounts in parentheses:
//! `"1.234,56"` is `1234.56` and `"(500,00)"` is `-500.0`.

use regex::Regex;
use std::sync::LazyLock;

static LEADING_DECIMAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?(?:\d+(?:\.\d*)?|\.\d+)(?:[eE][+-]?\d+)?").expect("valid decimal regex")
});

/// Converts a locale-formatted token into its numeric value.
///
/// Malformed tokens are treated as absent data and yield `0.0`; this
/// function never fails.
pub fn parse_locale_number(token: &str) -> f64 {
    let mut clean = token.trim();
    if clean.is_empty() {
        return 0.0;
    }

    let mut is_negative = false;
    if clean.len() >= 2 && clean.starts_with('(') && clean.ends_with(')') {
        is_negative = true;
        clean = &clean[1..clean.len() - 1];
    }

    let normalized = clean.replace('.', "").replacen(',', ".", 1);

    let value = parse_leading_decimal(&normalized).unwrap_or(0.0);

    if is_negative {
        -value
    } else {
        value
    }
}

/// Parses the longest leading decimal literal, ignoring any trailing text.
///
/// `"12abc"` yields `12.0`; a token with no leading literal yields `None`.
pub fn parse_leading_decimal(text: &str) -> Option<f64> {
    let text = text.trim_start();
    let literal = LEADING_DECIMAL.find(text)?;
    literal
        .as_str()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}
