//! Order reconciliation
//!
//! - [`engine`]: state machine, submission and withdrawal paths
//! - [`worker`]: timer-driven background loop with explicit start/stop
//! - [`cooldown`]: per-order retry cooldown after a rate limit
//! - [`clock`]: injectable time source

pub mod clock;
pub mod cooldown;
pub mod engine;
pub mod worker;


pub use clock::{Clock, ManualClock, SystemClock};
pub use cooldown::CooldownTracker;
pub use engine::{CycleReport, EngineConfig, ReconciliationEngine, Submission};
pub use worker::{ChannelTicker, IntervalTicker, ReconcileWorker, Ticker, WorkerHandle};
