//! Accrual authority gateway
//!
//! The external authority decides how many points an order earns.
//! [`AccrualGateway`] is the seam the reconciliation engine talks to;
//! [`HttpAccrualClient`] speaks the HTTP protocol:
//!
//! ```text
//! GET <base>/api/orders/<number>
//!   200 {"order": "...", "status": "PROCESSED", "accrual": 500}
//!   204 not registered yet
//!   429 Retry-After: <seconds>
//! ```

pub mod client;
pub mod error;
pub mod gateway;

pub use client::HttpAccrualClient;
pub use error::AccrualError;
pub use gateway::{AccrualGateway, AccrualStatus, Decision};
