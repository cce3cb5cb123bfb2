//! Loyalty Ledger - order accrual reconciliation and points balance
//!
//! Users submit purchase order numbers; a background worker asks an
//! external accrual authority how many points each order earns and credits
//! them to an append-only ledger, from which users withdraw.
//!
//! # Modules
//!
//! - [`core_types`] - Id and amount aliases
//! - [`error`] - Crate-wide error taxonomy
//! - [`money`] - Decimal <-> minor-unit conversion
//! - [`order`] - Order numbers (Luhn), models and the order store
//! - [`ledger`] - Balance ledger (credits, withdrawals, derived balance)
//! - [`accrual`] - Accrual authority gateway (HTTP client)
//! - [`reconcile`] - Reconciliation engine and background worker
//! - [`db`] - PostgreSQL pool and schema
//! - [`config`] / [`logging`] - Service configuration and tracing setup

// Core types - must be first!
pub mod core_types;

pub mod error;
pub mod money;

// Domain components
pub mod accrual;
pub mod ledger;
pub mod order;
pub mod reconcile;

// Infrastructure
pub mod config;
pub mod db;
pub mod logging;

// Convenient re-exports at crate root
pub use core_types::{EntryId, MinorUnits, OrderId, UserId};
pub use error::{AppError, AppResult, ErrorKind};
pub use ledger::{BalanceLedger, BalanceSummary, EntryType, LedgerEntry, PgBalanceLedger};
pub use order::{Order, OrderNumber, OrderStatus, OrderStore, OrderView, PgOrderStore};
pub use reconcile::{
    CycleReport, EngineConfig, IntervalTicker, ReconcileWorker, ReconciliationEngine, Submission,
    WorkerHandle,
};
