//! Crate-wide error taxonomy
//!
//! Every fallible operation of the engine, the stores and the ledger
//! returns [`AppError`]. Callers branch on [`AppError::kind`], never on
//! message text.

use std::time::Duration;
use thiserror::Error;

/// Closed set of error kinds, compared structurally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidFormat,
    InvalidAmount,
    OwnershipConflict,
    InsufficientFunds,
    NotFound,
    Conflict,
    RetryableExternal,
    Internal,
}

#[derive(Error, Debug, Clone)]
pub enum AppError {
    // === User input ===
    #[error("Invalid order number format")]
    InvalidFormat,

    #[error("Amount must be a positive value with at most 2 decimals")]
    InvalidAmount,

    #[error("Order number already uploaded by another user")]
    OwnershipConflict,

    // === Business rules ===
    #[error("Insufficient funds")]
    InsufficientFunds,

    #[error("Not found: {0}")]
    NotFound(String),

    /// Unique constraint violated by a concurrent writer.
    #[error("Conflict: {0}")]
    Conflict(String),

    // === External authority ===
    #[error("Accrual authority asked to retry after {retry_after:?}")]
    RetryableExternal { retry_after: Duration },

    // === System ===
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::InvalidFormat => ErrorKind::InvalidFormat,
            AppError::InvalidAmount => ErrorKind::InvalidAmount,
            AppError::OwnershipConflict => ErrorKind::OwnershipConflict,
            AppError::InsufficientFunds => ErrorKind::InsufficientFunds,
            AppError::NotFound(_) => ErrorKind::NotFound,
            AppError::Conflict(_) => ErrorKind::Conflict,
            AppError::RetryableExternal { .. } => ErrorKind::RetryableExternal,
            AppError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Stable error code for API responses
    pub fn code(&self) -> &'static str {
        match self.kind() {
            ErrorKind::InvalidFormat => "INVALID_FORMAT",
            ErrorKind::InvalidAmount => "INVALID_AMOUNT",
            ErrorKind::OwnershipConflict => "OWNERSHIP_CONFLICT",
            ErrorKind::InsufficientFunds => "INSUFFICIENT_FUNDS",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::Conflict => "CONFLICT",
            ErrorKind::RetryableExternal => "RETRYABLE_EXTERNAL",
            ErrorKind::Internal => "INTERNAL_ERROR",
        }
    }

    /// Suggested HTTP status for the API layer
    pub fn http_status(&self) -> u16 {
        match self.kind() {
            ErrorKind::InvalidFormat => 422,
            ErrorKind::InvalidAmount => 400,
            ErrorKind::OwnershipConflict | ErrorKind::Conflict => 409,
            ErrorKind::InsufficientFunds => 402,
            ErrorKind::NotFound => 404,
            ErrorKind::RetryableExternal | ErrorKind::Internal => 500,
        }
    }

    /// Expected outcomes are returned to the caller and never logged as errors.
    pub fn is_expected(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::InvalidFormat
                | ErrorKind::InvalidAmount
                | ErrorKind::OwnershipConflict
                | ErrorKind::InsufficientFunds
                | ErrorKind::NotFound
        )
    }
}

/// SQLSTATE for unique_violation
const PG_UNIQUE_VIOLATION: &str = "23505";

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &e
            && db_err.code().as_deref() == Some(PG_UNIQUE_VIOLATION)
        {
            return AppError::Conflict(db_err.message().to_string());
        }
        AppError::Internal(format!("database: {}", e))
    }
}

impl From<crate::money::MoneyError> for AppError {
    fn from(_: crate::money::MoneyError) -> Self {
        AppError::InvalidAmount
    }
}

impl From<crate::accrual::AccrualError> for AppError {
    fn from(e: crate::accrual::AccrualError) -> Self {
        match e {
            crate::accrual::AccrualError::RateLimited { retry_after } => {
                AppError::RetryableExternal { retry_after }
            }
            other => AppError::Internal(other.to_string()),
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(AppError::InvalidFormat.code(), "INVALID_FORMAT");
        assert_eq!(AppError::InsufficientFunds.code(), "INSUFFICIENT_FUNDS");
        assert_eq!(AppError::Internal("x".into()).code(), "INTERNAL_ERROR");
    }

    #[test]
    fn test_http_status() {
        assert_eq!(AppError::InvalidFormat.http_status(), 422);
        assert_eq!(AppError::OwnershipConflict.http_status(), 409);
        assert_eq!(AppError::InsufficientFunds.http_status(), 402);
        assert_eq!(AppError::NotFound("order".into()).http_status(), 404);
        assert_eq!(AppError::Internal("boom".into()).http_status(), 500);
    }

    #[test]
    fn test_kind_ignores_payload() {
        let a = AppError::NotFound("a".into());
        let b = AppError::NotFound("b".into());
        assert_eq!(a.kind(), b.kind());
        assert_ne!(a.kind(), AppError::Internal("a".into()).kind());
    }

    #[test]
    fn test_expected_outcomes() {
        assert!(AppError::InvalidFormat.is_expected());
        assert!(AppError::InsufficientFunds.is_expected());
        assert!(!AppError::Internal("db".into()).is_expected());
        assert!(
            !AppError::RetryableExternal {
                retry_after: Duration::from_secs(1)
            }
            .is_expected()
        );
    }

    #[test]
    fn test_rate_limit_maps_to_retryable() {
        let err: AppError = crate::accrual::AccrualError::RateLimited {
            retry_after: Duration::from_secs(30),
        }
        .into();
        assert!(matches!(
            err,
            AppError::RetryableExternal { retry_after } if retry_after == Duration::from_secs(30)
        ));
    }

    #[test]
    fn test_display() {
        assert_eq!(AppError::InsufficientFunds.to_string(), "Insufficient funds");
    }
}
