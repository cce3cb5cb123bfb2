//! Order number validation
//!
//! Order numbers are decimal digit strings protected by a Luhn checksum.
//! [`OrderNumber`] can only be built from a string that passes the check.

use crate::error::AppError;
use std::fmt;

/// Luhn checksum over a decimal digit string.
///
/// Every second digit counted from the end is doubled (9 subtracted when the
/// result exceeds 9); the total must be divisible by 10. Any non-digit
/// character, or an empty string, fails the check.
pub fn is_valid_luhn(number: &str) -> bool {
    if number.is_empty() {
        return false;
    }

    let parity = number.len() % 2;
    let mut sum: u64 = 0;

    for (i, c) in number.bytes().enumerate() {
        if !c.is_ascii_digit() {
            return false;
        }

        let mut digit = u64::from(c - b'0');
        if i % 2 == parity {
            digit *= 2;
            if digit > 9 {
                digit -= 9;
            }
        }
        sum += digit;
    }

    sum % 10 == 0
}

/// Validated order number (digits only, Luhn checksum holds)
///
/// Fields are private to force validation through `new()`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OrderNumber(String);

impl OrderNumber {
    /// Create a new validated OrderNumber
    ///
    /// Surrounding whitespace is ignored.
    ///
    /// # Errors
    /// Returns `AppError::InvalidFormat` if the checksum does not hold
    ///
    /// # Examples
    /// ```
    /// use loyalty_ledger::order::OrderNumber;
    ///
    /// let number = OrderNumber::new("79927398713").unwrap();
    /// assert_eq!(number.as_str(), "79927398713");
    ///
    /// assert!(OrderNumber::new("79927398710").is_err());
    /// ```
    pub fn new(raw: &str) -> Result<Self, AppError> {
        let raw = raw.trim();
        if !is_valid_luhn(raw) {
            return Err(AppError::InvalidFormat);
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for OrderNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
