//! Reconcile worker
//!
//! Background task that runs one reconciliation cycle per tick.
//! Lifecycle is explicit: `ReconcileWorker::new(..).start()` spawns the
//! task, [`WorkerHandle::shutdown`] stops it. A cycle already running when
//! shutdown is requested completes before the task exits; no cycle starts
//! afterwards.

use super::engine::{ReconciliationEngine, panic_message};
use async_trait::async_trait;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Paces the worker loop
#[async_trait]
pub trait Ticker: Send {
    async fn tick(&mut self);
}

/// Fixed-period ticker; the first tick fires immediately.
pub struct IntervalTicker {
    period: Duration,
    interval: Option<Interval>,
}

impl IntervalTicker {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            interval: None,
        }
    }
}

#[async_trait]
impl Ticker for IntervalTicker {
    async fn tick(&mut self) {
        let period = self.period;
        let interval = self.interval.get_or_insert_with(|| {
            let mut interval = tokio::time::interval(period);
            // A slow cycle pushes the schedule back instead of bursting
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });
        interval.tick().await;
    }
}

/// Ticker driven by sending `()` on a channel.
///
/// Once every sender is dropped it never ticks again.
pub struct ChannelTicker {
    rx: mpsc::UnboundedReceiver<()>,
}

impl ChannelTicker {
    pub fn new() -> (Self, mpsc::UnboundedSender<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { rx }, tx)
    }
}

#[async_trait]
impl Ticker for ChannelTicker {
    async fn tick(&mut self) {
        if self.rx.recv().await.is_none() {
            std::future::pending::<()>().await;
        }
    }
}

pub struct ReconcileWorker<T: Ticker> {
    engine: Arc<ReconciliationEngine>,
    ticker: T,
}

impl<T: Ticker + 'static> ReconcileWorker<T> {
    pub fn new(engine: Arc<ReconciliationEngine>, ticker: T) -> Self {
        Self { engine, ticker }
    }

    /// Spawn the worker loop on the current runtime
    pub fn start(self) -> WorkerHandle {
        let token = CancellationToken::new();
        let cycles = Arc::new(AtomicU64::new(0));

        let join = tokio::spawn(self.run(token.clone(), cycles.clone()));

        WorkerHandle {
            token,
            join,
            cycles,
        }
    }

    async fn run(mut self, token: CancellationToken, cycles: Arc<AtomicU64>) {
        info!(
            batch_size = self.engine.config().batch_size,
            claim_lease_secs = self.engine.config().claim_lease.as_secs(),
            "Starting reconcile worker"
        );

        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = self.ticker.tick() => {}
            }

            // Never start a cycle once shutdown was requested
            if token.is_cancelled() {
                break;
            }

            // Outside select!: cancellation never interrupts a running cycle
            let result = AssertUnwindSafe(self.engine.run_cycle())
                .catch_unwind()
                .await;

            match result {
                Ok(Ok(report)) if report.is_empty() => debug!("No orders to reconcile"),
                Ok(Ok(report)) => info!(
                    claimed = report.claimed,
                    processed = report.processed,
                    invalid = report.invalid,
                    requeued = report.requeued,
                    skipped = report.skipped,
                    failed = report.failed,
                    "Reconcile cycle finished"
                ),
                Ok(Err(e)) => error!(error = %e, "Reconcile cycle failed"),
                Err(panic) => error!(
                    panic = %panic_message(&*panic),
                    "Reconcile cycle panicked"
                ),
            }

            cycles.fetch_add(1, Ordering::SeqCst);
        }

        info!("Reconcile worker stopped");
    }
}

/// Handle to a running [`ReconcileWorker`]
pub struct WorkerHandle {
    token: CancellationToken,
    join: JoinHandle<()>,
    cycles: Arc<AtomicU64>,
}

impl WorkerHandle {
    /// Cycles finished so far, failed ones included
    pub fn cycles_completed(&self) -> u64 {
        self.cycles.load(Ordering::SeqCst)
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Request stop and wait for the in-flight cycle, if any, to finish.
    pub async fn shutdown(self) {
        info!("Shutting down reconcile worker");
        self.token.cancel();
        if let Err(e) = self.join.await {
            error!(error = %e, "Reconcile worker task failed");
        }
    }
}
