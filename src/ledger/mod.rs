//! Balance ledger
//!
//! Append-only record of credits and withdrawals per user. The spendable
//! balance is never stored; it is always derived as
//! `Σ CREDIT − Σ WITHDRAWAL`.
//!
//! # Safety Invariants
//!
//! 1. **No negative balance**: a withdrawal commits only if the derived
//!    balance stays non-negative, checked under a per-user lock
//! 2. **Exactly-once credit**: at most one CREDIT entry per order number
//! 3. **Integer sums**: amounts are minor units, see [`crate::money`]

pub mod models;
pub mod repository;

pub use models::{BalanceSummary, EntryType, LedgerEntry, TypeSum};
pub use repository::{BalanceLedger, PgBalanceLedger};
