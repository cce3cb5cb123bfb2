//! Reconciliation engine
//!
//! Owns the order state machine:
//!
//! ```text
//! NEW --claim--> PROCESSING --INVALID-------------------> INVALID
//!                PROCESSING --PROCESSED--> credit ------> PROCESSED
//!                PROCESSING --REGISTERED/PROCESSING/error--> NEW
//! ```
//!
//! Also serves the submission, listing and withdrawal paths used by the
//! request layer. Cross-operation consistency lives in the stores; the
//! engine holds no lock across an await.

use super::clock::{Clock, SystemClock};
use super::cooldown::CooldownTracker;
use crate::accrual::{AccrualGateway, AccrualStatus};
use crate::config::ReconcileConfig;
use crate::core_types::UserId;
use crate::error::{AppError, AppResult, ErrorKind};
use crate::ledger::{BalanceLedger, BalanceSummary, EntryType, LedgerEntry};
use crate::money::to_minor_units;
use crate::order::{Order, OrderNumber, OrderStatus, OrderStore, OrderView};
use chrono::{DateTime, Utc};
use futures::FutureExt;
use rust_decimal::Decimal;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Orders claimed per cycle
    pub batch_size: usize,
    /// Age after which a PROCESSING claim is considered orphaned
    pub claim_lease: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            claim_lease: Duration::from_secs(300),
        }
    }
}

impl From<&ReconcileConfig> for EngineConfig {
    fn from(config: &ReconcileConfig) -> Self {
        Self {
            batch_size: config.batch_size,
            claim_lease: Duration::from_secs(config.claim_lease_secs),
        }
    }
}

/// Result of an order submission
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    /// New order stored in NEW state
    Accepted(Order),
    /// Same user already submitted this number
    AlreadyAccepted(Order),
}

impl Submission {
    pub fn order(&self) -> &Order {
        match self {
            Submission::Accepted(order) | Submission::AlreadyAccepted(order) => order,
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, Submission::Accepted(_))
    }
}

/// Counters of one reconciliation cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub claimed: usize,
    /// Under retry cooldown, returned to NEW without a gateway call
    pub skipped: usize,
    pub processed: usize,
    pub invalid: usize,
    /// Authority not final yet, or rate limited
    pub requeued: usize,
    /// Internal errors, panics included
    pub failed: usize,
}

impl CycleReport {
    pub fn is_empty(&self) -> bool {
        self.claimed == 0
    }
}

/// Terminal or requeue outcome of one order attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OrderOutcome {
    Processed,
    Invalid,
    Pending(AccrualStatus),
}

pub struct ReconciliationEngine {
    orders: Arc<dyn OrderStore>,
    ledger: Arc<dyn BalanceLedger>,
    gateway: Arc<dyn AccrualGateway>,
    clock: Arc<dyn Clock>,
    cooldown: CooldownTracker,
    config: EngineConfig,
}

impl ReconciliationEngine {
    pub fn new(
        orders: Arc<dyn OrderStore>,
        ledger: Arc<dyn BalanceLedger>,
        gateway: Arc<dyn AccrualGateway>,
        config: EngineConfig,
    ) -> Self {
        Self::with_clock(orders, ledger, gateway, config, Arc::new(SystemClock))
    }

    pub fn with_clock(
        orders: Arc<dyn OrderStore>,
        ledger: Arc<dyn BalanceLedger>,
        gateway: Arc<dyn AccrualGateway>,
        config: EngineConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            orders,
            ledger,
            gateway,
            cooldown: CooldownTracker::new(clock.clone()),
            clock,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ========================================================================
    // Request paths
    // ========================================================================

    /// Submit an order number for `user_id`.
    ///
    /// Resubmission by the owner is `AlreadyAccepted`, by anyone else
    /// `OwnershipConflict`. A lost insert race resolves the same way.
    pub async fn create_order(&self, raw_number: &str, user_id: UserId) -> AppResult<Submission> {
        let number = OrderNumber::new(raw_number)?;

        match self.orders.find_by_number(number.as_str()).await {
            Ok(existing) => return Self::resolve_existing(existing, user_id),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }

        match self.orders.create(&number, user_id).await {
            Ok(order) => {
                info!(order = %order.number, user_id, "Order accepted");
                Ok(Submission::Accepted(order))
            }
            Err(e) if e.kind() == ErrorKind::Conflict => {
                debug!(order = %number, user_id, "Lost submission race, resolving owner");
                let existing = self.orders.find_by_number(number.as_str()).await?;
                Self::resolve_existing(existing, user_id)
            }
            Err(e) => Err(e),
        }
    }

    fn resolve_existing(existing: Order, user_id: UserId) -> AppResult<Submission> {
        if existing.user_id == user_id {
            Ok(Submission::AlreadyAccepted(existing))
        } else {
            Err(AppError::OwnershipConflict)
        }
    }

    pub async fn list_orders(&self, user_id: UserId) -> AppResult<Vec<OrderView>> {
        self.orders.list_with_balance(user_id).await
    }

    /// Spend `amount` points against order `raw_number`.
    pub async fn withdraw(
        &self,
        user_id: UserId,
        raw_number: &str,
        amount: Decimal,
    ) -> AppResult<LedgerEntry> {
        let number = OrderNumber::new(raw_number)?;
        let minor = to_minor_units(amount)?;
        if minor <= 0 {
            return Err(AppError::InvalidAmount);
        }

        match self.ledger.withdraw(user_id, number.as_str(), minor).await {
            Ok(entry) => {
                info!(user_id, order = %number, amount = %entry.amount_decimal(), "Withdrawal committed");
                Ok(entry)
            }
            Err(e) => {
                if !e.is_expected() {
                    error!(user_id, order = %number, error = %e, "Withdrawal failed");
                }
                Err(e)
            }
        }
    }

    pub async fn list_withdrawals(&self, user_id: UserId) -> AppResult<Vec<LedgerEntry>> {
        self.ledger.list_withdrawals(user_id).await
    }

    pub async fn balance_summary(&self, user_id: UserId) -> AppResult<BalanceSummary> {
        let sums = self
            .ledger
            .sum_by_type(user_id, &[EntryType::Credit, EntryType::Withdrawal])
            .await?;
        Ok(BalanceSummary::from_sums(&sums))
    }

    pub async fn health_check(&self) -> AppResult<()> {
        self.orders.health_check().await
    }

    // ========================================================================
    // Background cycle
    // ========================================================================

    /// Claim a batch and drive every claimed order one step.
    ///
    /// Orders are handled one at a time. Every order that did not reach a
    /// terminal state is reverted to NEW before returning. Only a failed
    /// claim is reported as an error.
    pub async fn run_cycle(&self) -> AppResult<CycleReport> {
        let batch = self
            .orders
            .claim_batch(self.config.batch_size, self.config.claim_lease)
            .await?;

        let mut report = CycleReport {
            claimed: batch.len(),
            ..CycleReport::default()
        };
        if batch.is_empty() {
            return Ok(report);
        }

        let mut to_revert: Vec<Order> = Vec::new();

        for order in batch {
            if self.cooldown.should_skip(&order.number) {
                debug!(order = %order.number, "Order under retry cooldown, skipping");
                report.skipped += 1;
                to_revert.push(order);
                continue;
            }

            let attempt = AssertUnwindSafe(self.process_order(&order))
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| {
                    Err(AppError::Internal(format!(
                        "panic while processing order: {}",
                        panic_message(&*panic)
                    )))
                });

            match attempt {
                Ok(OrderOutcome::Processed) => report.processed += 1,
                Ok(OrderOutcome::Invalid) => report.invalid += 1,
                Ok(OrderOutcome::Pending(status)) => {
                    debug!(order = %order.number, %status, "Accrual not final yet");
                    report.requeued += 1;
                    to_revert.push(order);
                }
                Err(AppError::RetryableExternal { retry_after }) => {
                    let until = cooldown_deadline(self.clock.now(), retry_after);
                    self.cooldown.mark_cooldown(&order.number, until);
                    warn!(
                        order = %order.number,
                        retry_after_secs = retry_after.as_secs(),
                        "Accrual rate limited, order cooling down"
                    );
                    report.requeued += 1;
                    to_revert.push(order);
                }
                Err(e) => {
                    error!(order = %order.number, error = %e, "Order processing failed");
                    report.failed += 1;
                    to_revert.push(order);
                }
            }
        }

        for order in &to_revert {
            if let Err(e) = self
                .orders
                .update_status(&order.with_status(OrderStatus::New))
                .await
            {
                // Left PROCESSING; reclaimed once the lease expires
                error!(order = %order.number, error = %e, "Failed to revert order to NEW");
            }
        }

        Ok(report)
    }

    async fn process_order(&self, order: &Order) -> AppResult<OrderOutcome> {
        let decision = self.gateway.process(&order.number).await?;

        match decision.status {
            AccrualStatus::Processed => {
                let inserted = self
                    .ledger
                    .credit(order.user_id, &order.number, decision.accrual)
                    .await?;
                if !inserted {
                    debug!(order = %order.number, "Order already credited");
                }
                self.orders
                    .update_status(&order.with_status(OrderStatus::Processed))
                    .await?;
                info!(
                    order = %order.number,
                    user_id = order.user_id,
                    accrual = %crate::money::format_amount(decision.accrual),
                    "Order processed"
                );
                Ok(OrderOutcome::Processed)
            }
            AccrualStatus::Invalid => {
                self.orders
                    .update_status(&order.with_status(OrderStatus::Invalid))
                    .await?;
                info!(order = %order.number, "Order rejected by accrual authority");
                Ok(OrderOutcome::Invalid)
            }
            status @ (AccrualStatus::Registered | AccrualStatus::Processing) => {
                Ok(OrderOutcome::Pending(status))
            }
        }
    }
}

/// Longest cooldown honoured for a single rate limit
pub const MAX_COOLDOWN: Duration = Duration::from_secs(24 * 60 * 60);

/// `now + retry_after`, with `retry_after` capped at [`MAX_COOLDOWN`]
fn cooldown_deadline(now: DateTime<Utc>, retry_after: Duration) -> DateTime<Utc> {
    let capped = retry_after.min(MAX_COOLDOWN);
    chrono::Duration::from_std(capped)
        .ok()
        .and_then(|d| now.checked_add_signed(d))
        .unwrap_or(now)
}

pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
