use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{Ledger, LedgerError};
use crate::models::PositionRecord;

/// Process-local ledger. Contents are lost on restart.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    records: Mutex<Vec<PositionRecord>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything appended so far, oldest first.
    pub async fn records(&self) -> Vec<PositionRecord> {
        self.records.lock().await.clone()
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn append_record(&self, record: &PositionRecord) -> Result<(), LedgerError> {
        self.records.lock().await.push(record.clone());
        Ok(())
    }

    async fn total_profit(&self) -> Result<f64, LedgerError> {
        Ok(self.records.lock().await.iter().map(|r| r.profit).sum())
    }
}
