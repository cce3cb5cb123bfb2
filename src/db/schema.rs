use anyhow::Result;
use sqlx::PgPool;

/// Create tables and indexes if they do not exist
pub async fn init_schema(pool: &PgPool) -> Result<()> {
    tracing::info!("Initializing PostgreSQL schema...");

    for &(name, sql) in STATEMENTS {
        sqlx::query(sql)
            .execute(pool)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to create {}: {}", name, e))?;
    }

    tracing::info!("PostgreSQL schema initialized successfully");
    Ok(())
}

const STATEMENTS: &[(&str, &str)] = &[
    ("orders table", CREATE_ORDERS_TABLE),
    ("orders claim index", CREATE_ORDERS_CLAIM_INDEX),
    ("orders user index", CREATE_ORDERS_USER_INDEX),
    ("balance table", CREATE_BALANCE_TABLE),
    ("balance credit index", CREATE_BALANCE_CREDIT_INDEX),
    ("balance user index", CREATE_BALANCE_USER_INDEX),
];

/// Orders: status is NEW | PROCESSING | INVALID | PROCESSED
/// claimed_at is set only while PROCESSING
const CREATE_ORDERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS orders (
    id          BIGSERIAL PRIMARY KEY,
    number      TEXT NOT NULL UNIQUE,
    status      TEXT NOT NULL,
    user_id     BIGINT NOT NULL,
    created_at  TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    claimed_at  TIMESTAMPTZ NULL
)
"#;

const CREATE_ORDERS_CLAIM_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_orders_status_created ON orders (status, created_at)";

const CREATE_ORDERS_USER_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_orders_user ON orders (user_id, created_at DESC)";

/// Append-only ledger: sum in minor units, type 0=CREDIT 1=WITHDRAWAL
const CREATE_BALANCE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS balance (
    id            BIGSERIAL PRIMARY KEY,
    order_number  TEXT NOT NULL,
    sum           BIGINT NOT NULL CHECK (sum >= 0),
    type          SMALLINT NOT NULL,
    user_id       BIGINT NOT NULL,
    created_at    TIMESTAMPTZ NOT NULL DEFAULT NOW()
)
"#;

/// At most one CREDIT per order
const CREATE_BALANCE_CREDIT_INDEX: &str = "CREATE UNIQUE INDEX IF NOT EXISTS uq_balance_credit_order ON balance (order_number) WHERE type = 0";

const CREATE_BALANCE_USER_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_balance_user_type ON balance (user_id, type)";
