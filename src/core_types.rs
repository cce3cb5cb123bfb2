//! Core types used throughout the system
//!
//! Identifiers are plain integers matching the BIGINT columns they are
//! stored in.

/// User ID - assigned by the (external) account service, immutable.
pub type UserId = i64;

/// Database id of an order row.
pub type OrderId = i64;

/// Database id of a ledger entry row.
pub type EntryId = i64;

/// Monetary amount in minor units (1/100 of a point).
///
/// All sums are computed on this type; see [`crate::money`] for the
/// conversion to and from the decimal values shown to users.
pub type MinorUnits = i64;
