//! # ledger — Position Ledger
//!
//! Append-only store of [`PositionRecord`]s plus the running total of
//! realised profit.
//!
//! | Backend          | When                                        |
//! |------------------|---------------------------------------------|
//! | [`PgLedger`]     | `postgres` feature on and `DATABASE_URL` set |
//! | [`MemoryLedger`] | otherwise (and in tests)                    |

pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::PositionRecord;

pub use memory::MemoryLedger;
#[cfg(feature = "postgres")]
pub use postgres::PgLedger;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[cfg(feature = "postgres")]
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("ledger unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait Ledger: Send + Sync {
    async fn append_record(&self, record: &PositionRecord) -> Result<(), LedgerError>;

    /// Sum of the `profit` column over every stored record.
    async fn total_profit(&self) -> Result<f64, LedgerError>;
}
