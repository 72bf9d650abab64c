//! # ledger::postgres
//!
//! PostgreSQL ledger on `sqlx`. The `orders` table is created on connect
//! from `migrations/001_orders.sql`.

use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::info;

use super::{Ledger, LedgerError};
use crate::models::PositionRecord;

const MIGRATION: &str = include_str!("../../migrations/001_orders.sql");

pub struct PgLedger {
    pool: PgPool,
}

impl PgLedger {
    /// Connect, then apply the embedded migration.
    pub async fn connect(database_url: &str) -> Result<Self, LedgerError> {
        info!("Connecting to PostgreSQL...");

        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(std::time::Duration::from_secs(5))
            .connect(database_url)
            .await?;

        sqlx::query(MIGRATION)
            .execute(&pool)
            .await?;

        info!("✅ PostgreSQL connected and migrations applied");
        Ok(Self { pool })
    }
}

#[async_trait]
impl Ledger for PgLedger {
    async fn append_record(&self, record: &PositionRecord) -> Result<(), LedgerError> {
        sqlx::query(
            r#"
            INSERT INTO orders
              (record_id, instrument, size, side, price, ts, kind, profit, stop_loss)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(record.record_id)
        .bind(record.instrument.product_id())
        .bind(i64::from(record.size))
        .bind(record.side.as_str())
        .bind(record.price)
        .bind(record.timestamp)
        .bind(record.kind.as_str())
        .bind(record.profit)
        .bind(record.stop_loss)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn total_profit(&self) -> Result<f64, LedgerError> {
        let total: f64 = sqlx::query_scalar("SELECT COALESCE(SUM(profit), 0)::DOUBLE PRECISION FROM orders")
            .fetch_one(&self.pool)
            .await?;

        Ok(total)
    }
}
