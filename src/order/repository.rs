//! Order store
//!
//! [`OrderStore`] is the persistence seam used by the reconciliation engine.
//! [`PgOrderStore`] is the PostgreSQL implementation.

use super::models::{Order, OrderStatus, OrderView};
use super::number::OrderNumber;
use crate::core_types::UserId;
use crate::error::{AppError, AppResult};
use crate::ledger::EntryType;
use crate::money::from_minor_units;
use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use std::str::FromStr;
use std::time::Duration;

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Insert a new order in NEW state.
    ///
    /// Fails with `AppError::Conflict` if the number is already taken.
    async fn create(&self, number: &OrderNumber, user_id: UserId) -> AppResult<Order>;

    /// Look up an order by number, `AppError::NotFound` if absent
    async fn find_by_number(&self, number: &str) -> AppResult<Order>;

    /// Atomically move up to `limit` claimable orders to PROCESSING and
    /// return them, oldest first.
    ///
    /// Claimable: NEW, or PROCESSING with a claim older than `lease`.
    /// Two concurrent callers never receive the same order.
    async fn claim_batch(&self, limit: usize, lease: Duration) -> AppResult<Vec<Order>>;

    /// Persist `order.status` (last write wins)
    async fn update_status(&self, order: &Order) -> AppResult<()>;

    /// Orders of a user with their credited amount, newest first
    async fn list_with_balance(&self, user_id: UserId) -> AppResult<Vec<OrderView>>;

    async fn health_check(&self) -> AppResult<()>;
}

/// PostgreSQL order store
pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_order(row: &PgRow) -> AppResult<Order> {
        let status: String = row.try_get("status")?;
        Ok(Order {
            id: row.try_get("id")?,
            number: row.try_get("number")?,
            user_id: row.try_get("user_id")?,
            status: OrderStatus::from_str(&status).map_err(AppError::Internal)?,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn create(&self, number: &OrderNumber, user_id: UserId) -> AppResult<Order> {
        let row = sqlx::query(
            r#"INSERT INTO orders (number, status, user_id, created_at)
               VALUES ($1, $2, $3, NOW())
               RETURNING id, number, status, user_id, created_at"#,
        )
        .bind(number.as_str())
        .bind(OrderStatus::New.as_str())
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Self::row_to_order(&row)
    }

    async fn find_by_number(&self, number: &str) -> AppResult<Order> {
        let row = sqlx::query(
            r#"SELECT id, number, status, user_id, created_at
               FROM orders WHERE number = $1"#,
        )
        .bind(number)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Self::row_to_order(&row),
            None => Err(AppError::NotFound(format!("order {}", number))),
        }
    }

    async fn claim_batch(&self, limit: usize, lease: Duration) -> AppResult<Vec<Order>> {
        // SKIP LOCKED keeps concurrent claimers off each other's rows
        let rows = sqlx::query(
            r#"
            UPDATE orders o
            SET status = $1, claimed_at = NOW()
            WHERE o.id IN (
                SELECT id FROM orders
                WHERE status = $2
                   OR (status = $1 AND claimed_at < NOW() - INTERVAL '1 second' * $3)
                ORDER BY created_at, id
                LIMIT $4
                FOR UPDATE SKIP LOCKED
            )
            RETURNING o.id, o.number, o.status, o.user_id, o.created_at
            "#,
        )
        .bind(OrderStatus::Processing.as_str())
        .bind(OrderStatus::New.as_str())
        .bind(lease.as_secs() as i64)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        let mut orders = rows
            .iter()
            .map(Self::row_to_order)
            .collect::<AppResult<Vec<_>>>()?;

        // RETURNING does not preserve the sub-select order
        orders.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(orders)
    }

    async fn update_status(&self, order: &Order) -> AppResult<()> {
        let result = sqlx::query(
            r#"UPDATE orders
               SET status = $1,
                   claimed_at = CASE WHEN $2 THEN claimed_at ELSE NULL END
               WHERE id = $3"#,
        )
        .bind(order.status.as_str())
        .bind(order.status == OrderStatus::Processing)
        .bind(order.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("order id {}", order.id)));
        }
        Ok(())
    }

    async fn list_with_balance(&self, user_id: UserId) -> AppResult<Vec<OrderView>> {
        let rows = sqlx::query(
            r#"
            SELECT o.number, o.status, o.created_at, b.sum AS accrual
            FROM orders o
            LEFT JOIN balance b ON b.order_number = o.number AND b.type = $1
            WHERE o.user_id = $2
            ORDER BY o.created_at DESC, o.id DESC
            "#,
        )
        .bind(EntryType::Credit.id())
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let mut views = Vec::with_capacity(rows.len());
        for row in rows {
            let status: String = row.try_get("status")?;
            let accrual: Option<i64> = row.try_get("accrual")?;
            views.push(OrderView {
                number: row.try_get("number")?,
                status: OrderStatus::from_str(&status).map_err(AppError::Internal)?,
                accrual: accrual.map(from_minor_units),
                uploaded_at: row.try_get("created_at")?,
            });
        }

        Ok(views)
    }

    async fn health_check(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
