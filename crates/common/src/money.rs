//! Displayed-price normalisation

use crate::error::{Error, Result};

/// Number of fractional digits in the smallest currency unit
const MINOR_DIGITS: usize = 2;

/// Convert a displayed price such as `$9.42` into minor units (`942`).
///
/// Currency symbols, whitespace and `,` grouping separators are dropped.
/// At most two fractional digits are accepted; fewer are right-padded.
pub fn parse_minor_units(text: &str) -> Result<i64> {
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();

    let invalid = || Error::InvalidAmount(text.to_string());

    let (negative, unsigned) = match cleaned.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, cleaned.as_str()),
    };
    if unsigned.contains('-') {
        return Err(invalid());
    }

    let (whole, fraction) = match unsigned.split_once('.') {
        Some((w, f)) => (w, f),
        None => (unsigned, ""),
    };
    if fraction.contains('.') || fraction.len() > MINOR_DIGITS {
        return Err(invalid());
    }
    if whole.is_empty() && fraction.is_empty() {
        return Err(invalid());
    }

    let digits = format!(
        "{}{:0<width$}",
        if whole.is_empty() { "0" } else { whole },
        fraction,
        width = MINOR_DIGITS
    );
    let value: i64 = digits.parse().map_err(|_| invalid())?;

    Ok(if negative { -value } else { value })
}
