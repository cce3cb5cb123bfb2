//! Loyalty Ledger service
//!
//! ```text
//! ┌──────────┐   ┌────────────────┐   ┌───────────────────┐
//! │ orders   │──▶│ ReconcileWorker│──▶│ accrual authority │
//! │ (PG)     │◀──│  (every tick)  │◀──│  GET /api/orders  │
//! └──────────┘   └───────┬────────┘   └───────────────────┘
//!                        ▼
//!                  ┌──────────┐
//!                  │ balance  │  append-only ledger (PG)
//!                  └──────────┘
//! ```
//!
//! Usage: `loyalty_ledger [--env|-e <name>]` loads `config/<name>.yaml`.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use loyalty_ledger::accrual::HttpAccrualClient;
use loyalty_ledger::config::AppConfig;
use loyalty_ledger::db::{Database, init_schema};
use loyalty_ledger::logging::init_logging;
use loyalty_ledger::{
    EngineConfig, IntervalTicker, PgBalanceLedger, PgOrderStore, ReconcileWorker,
    ReconciliationEngine,
};

fn get_env() -> String {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if (args[i] == "--env" || args[i] == "-e") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }
    "dev".to_string()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = get_env();
    let app_config = AppConfig::load(&env)?;
    let _log_guard = init_logging(&app_config)?;

    tracing::info!("Starting Loyalty Ledger in {} mode", env);

    let db = Database::connect(app_config.database_url()?)
        .await
        .context("Failed to connect to PostgreSQL")?;
    init_schema(db.pool()).await?;

    let gateway = HttpAccrualClient::new(&app_config.accrual)?;
    tracing::info!(
        base_url = %app_config.accrual.base_url,
        timeout_ms = app_config.accrual.request_timeout_ms,
        "Accrual client ready"
    );

    let engine = Arc::new(ReconciliationEngine::new(
        Arc::new(PgOrderStore::new(db.pool().clone())),
        Arc::new(PgBalanceLedger::new(db.pool().clone())),
        Arc::new(gateway),
        EngineConfig::from(&app_config.reconcile),
    ));
    engine.health_check().await?;

    let ticker = IntervalTicker::new(Duration::from_millis(app_config.reconcile.interval_ms));
    let worker = ReconcileWorker::new(engine, ticker).start();

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    tracing::info!("Shutdown signal received");

    worker.shutdown().await;
    db.close().await;

    tracing::info!("Loyalty Ledger stopped");
    Ok(())
}
