//! Money Conversion Module
//!
//! Conversion between the internal minor-unit representation and the
//! decimal values shown to users. All conversions MUST go through this module.
//!
//! ## Internal Representation
//! - Amounts are stored as `i64` minor units (1 point = 100 minor units)
//! - Sums are computed on integers, never on floats
//! - Input with more than [`MINOR_DIGITS`] decimals is truncated toward zero
//!
//! ## Usage
//! ```rust
//! use loyalty_ledger::money::{format_amount, parse_amount};
//!
//! let internal = parse_amount("500.129").unwrap();
//! assert_eq!(internal, 50_012);
//! assert_eq!(format_amount(internal), "500.12");
//! ```

use crate::core_types::MinorUnits;
use rust_decimal::prelude::*;
use std::str::FromStr;
use thiserror::Error;

/// Fractional digits carried by every amount
pub const MINOR_DIGITS: u32 = 2;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error, PartialEq)]
pub enum MoneyError {
    #[error("Amount too large, would overflow")]
    Overflow,

    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

// ============================================================================
// Decimal → Internal
// ============================================================================

/// Convert a decimal value to minor units.
///
/// Digits beyond the 2nd decimal are truncated toward zero, so
/// `123.229` and `123.22` both map to `12322`.
pub fn to_minor_units(value: Decimal) -> Result<MinorUnits, MoneyError> {
    let multiplier = Decimal::from(10i64.pow(MINOR_DIGITS));
    value
        .checked_mul(multiplier)
        .ok_or(MoneyError::Overflow)?
        .trunc()
        .to_i64()
        .ok_or(MoneyError::Overflow)
}

/// Parse a client string amount (e.g. "1.5", "100") into minor units.
pub fn parse_amount(amount_str: &str) -> Result<MinorUnits, MoneyError> {
    let amount_str = amount_str.trim();
    if amount_str.is_empty() {
        return Err(MoneyError::InvalidFormat("empty string".into()));
    }

    let value = Decimal::from_str(amount_str)
        .map_err(|e| MoneyError::InvalidFormat(format!("{}: {}", amount_str, e)))?;

    to_minor_units(value)
}

/// Convert a JSON number received from an external service into minor units.
///
/// Goes through the number's textual form so no binary float rounding
/// leaks into the ledger.
pub fn json_number_to_minor_units(number: &serde_json::Number) -> Result<MinorUnits, MoneyError> {
    let text = number.to_string();
    let value = Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|e| MoneyError::InvalidFormat(format!("{}: {}", text, e)))?;

    to_minor_units(value)
}

// ============================================================================
// Internal → Decimal / String
// ============================================================================

/// Convert minor units back to a decimal with exactly 2 fractional digits.
pub fn from_minor_units(value: MinorUnits) -> Decimal {
    Decimal::new(value, MINOR_DIGITS)
}

/// Display string, always 2 decimals ("500.00")
pub fn format_amount(value: MinorUnits) -> String {
    format!(
        "{:.prec$}",
        from_minor_units(value),
        prec = MINOR_DIGITS as usize
    )
}

// ============================================================================
// Unit Tests
// ============================================================================
