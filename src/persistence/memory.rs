//! In-memory transaction log, the default record store.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::TransactionLog;
use crate::domain::{ClaimStatus, ClaimTransaction, PoolId, TransactionId};
use crate::error::LedgerError;

/// In-process [`TransactionLog`] backed by a `HashMap`.
///
/// Authoritative at runtime whether or not the PostgreSQL mirror is
/// enabled; the mirror only adds durability across restarts.
#[derive(Debug, Default)]
pub struct MemoryTransactionLog {
    records: RwLock<HashMap<(PoolId, TransactionId), ClaimTransaction>>,
}

impl MemoryTransactionLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a record as-is, bypassing the reserved-only check on
    /// [`TransactionLog::append_reserved`]. Used to rebuild the log from
    /// durable storage on restart.
    pub async fn restore(&self, record: ClaimTransaction) {
        let key = (record.pool_id, record.transaction_id);
        self.records.write().await.insert(key, record);
    }

    /// Total number of records across all pools.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Returns `true` if the log holds no records.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl TransactionLog for MemoryTransactionLog {
    async fn append_reserved(&self, record: ClaimTransaction) -> Result<(), LedgerError> {
        if record.status != ClaimStatus::Reserved {
            return Err(LedgerError::Internal(format!(
                "appended record {} is not reserved",
                record.transaction_id
            )));
        }
        let key = (record.pool_id, record.transaction_id);
        let mut map = self.records.write().await;
        if map.contains_key(&key) {
            return Err(LedgerError::Internal(format!(
                "transaction {} already recorded for pool {}",
                record.transaction_id, record.pool_id
            )));
        }
        map.insert(key, record);
        Ok(())
    }

    async fn finalize(
        &self,
        pool_id: PoolId,
        transaction_id: TransactionId,
        status: ClaimStatus,
        finalized_at: DateTime<Utc>,
    ) -> Result<ClaimTransaction, LedgerError> {
        if !status.is_terminal() {
            return Err(LedgerError::Internal(format!(
                "cannot finalize transaction {transaction_id} to non-terminal state"
            )));
        }
        let mut map = self.records.write().await;
        let record = map.get_mut(&(pool_id, transaction_id)).ok_or_else(|| {
            LedgerError::Internal(format!(
                "transaction {transaction_id} not found for pool {pool_id}"
            ))
        })?;
        if record.is_terminal() {
            return Err(LedgerError::Inconsistent(format!(
                "transaction {transaction_id} already finalized as {}",
                record.status.as_str()
            )));
        }
        record.status = status;
        record.finalized_at = Some(finalized_at);
        Ok(record.clone())
    }

    async fn get(
        &self,
        pool_id: PoolId,
        transaction_id: TransactionId,
    ) -> Result<Option<ClaimTransaction>, LedgerError> {
        let map = self.records.read().await;
        Ok(map.get(&(pool_id, transaction_id)).cloned())
    }

    async fn committed_for_pool(
        &self,
        pool_id: PoolId,
    ) -> Result<Vec<ClaimTransaction>, LedgerError> {
        let map = self.records.read().await;
        Ok(map
            .values()
            .filter(|r| r.pool_id == pool_id && r.status == ClaimStatus::Committed)
            .cloned()
            .collect())
    }

    async fn reserved_total_for_pool(&self, pool_id: PoolId) -> Result<u64, LedgerError> {
        let map = self.records.read().await;
        Ok(map
            .values()
            .filter(|r| r.pool_id == pool_id && r.status == ClaimStatus::Reserved)
            .map(|r| r.amount)
            .sum())
    }

    async fn reserved_older_than(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<ClaimTransaction>, LedgerError> {
        let map = self.records.read().await;
        Ok(map
            .values()
            .filter(|r| r.status == ClaimStatus::Reserved && r.reserved_at < cutoff)
            .cloned()
            .collect())
    }
}
