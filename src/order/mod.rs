//! Order module
//!
//! Order numbers, the order lifecycle and its PostgreSQL store.
//!
//! # State Machine
//!
//! ```text
//! NEW → PROCESSING → PROCESSED
//!  ↑         ↓    ↘
//!  └─────────┘      INVALID
//! ```
//!
//! `PROCESSING` is a claim held by one reconciliation cycle; it always ends
//! in a terminal state or is reverted to `NEW`.

pub mod models;
pub mod number;
pub mod repository;

pub use models::{Order, OrderStatus, OrderView};
pub use number::{OrderNumber, is_valid_luhn};
pub use repository::{OrderStore, PgOrderStore};
