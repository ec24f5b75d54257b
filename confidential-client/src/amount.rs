//! Token amount parsing and display
//!
//! Amounts travel as integer base units (`u128`). These helpers convert
//! between human decimal strings and base units for a given decimals count,
//! and between base units and confidential units for a given rate.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AmountError {
    #[error("Amount is empty")]
    Empty,
    #[error("Invalid amount: {0}")]
    Invalid(String),
    #[error("Amount has too many decimals (max {0})")]
    TooManyDecimals(u8),
    #[error("Amount overflows u128")]
    Overflow,
}

/// Parse a decimal string such as `"1.5"` into base units.
pub fn parse_amount_to_units(value: &str, decimals: u8) -> Result<u128, AmountError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AmountError::Empty);
    }

    let (whole, fraction) = match trimmed.split_once('.') {
        Some((w, f)) => (w, f),
        None => (trimmed, ""),
    };

    let whole = if whole.is_empty() { "0" } else { whole };
    if !whole.bytes().all(|b| b.is_ascii_digit()) || !fraction.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AmountError::Invalid(value.to_string()));
    }
    if fraction.len() > decimals as usize {
        return Err(AmountError::TooManyDecimals(decimals));
    }

    let multiplier = 10u128
        .checked_pow(decimals as u32)
        .ok_or(AmountError::Overflow)?;
    let whole: u128 = whole.parse().map_err(|_| AmountError::Overflow)?;

    let mut padded = fraction.to_string();
    padded.extend(std::iter::repeat('0').take(decimals as usize - fraction.len()));
    let fraction: u128 = if padded.is_empty() {
        0
    } else {
        padded.parse().map_err(|_| AmountError::Overflow)?
    };

    whole
        .checked_mul(multiplier)
        .and_then(|w| w.checked_add(fraction))
        .ok_or(AmountError::Overflow)
}

/// Render base units as a decimal string, trimming trailing zeros.
pub fn format_units(value: u128, decimals: u8) -> String {
    if decimals == 0 {
        return value.to_string();
    }
    let digits = format!("{:0>width$}", value, width = decimals as usize + 1);
    let (whole, fraction) = digits.split_at(digits.len() - decimals as usize);
    let fraction = fraction.trim_end_matches('0');
    if fraction.is_empty() {
        whole.to_string()
    } else {
        format!("{whole}.{fraction}")
    }
}

/// Token base units to confidential units (floor division by `rate`).
pub fn to_confidential_units(amount: u128, rate: u128) -> u128 {
    if rate == 0 {
        return 0;
    }
    amount / rate
}
