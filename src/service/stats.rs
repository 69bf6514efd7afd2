//! Read-only statistics derived from committed transactions.

use std::collections::HashSet;
use std::sync::Arc;

use crate::domain::{PoolId, PoolRegistry};
use crate::error::LedgerError;
use crate::persistence::TransactionLog;

/// Aggregate view of a pool.
///
/// `remaining_amount` is read from the registry — the same counter that
/// admits claims — never recomputed from the log, so the two views
/// cannot diverge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    /// Fixed pool size.
    pub total_amount: u64,
    /// Current remaining balance (registry value).
    pub remaining_amount: u64,
    /// Number of committed claims.
    pub committed_count: usize,
    /// Number of distinct participants with at least one committed claim.
    pub unique_participants: usize,
    /// Sum of committed amounts.
    pub disbursed: u64,
}

/// Derives [`PoolStats`] from the registry and the transaction log.
///
/// Only `Committed` records count; `Reserved` and `Released` attempts
/// are invisible to statistics.
#[derive(Debug, Clone)]
pub struct StatsAggregator {
    registry: Arc<PoolRegistry>,
    log: Arc<dyn TransactionLog>,
}

impl StatsAggregator {
    /// Creates a new aggregator.
    #[must_use]
    pub fn new(registry: Arc<PoolRegistry>, log: Arc<dyn TransactionLog>) -> Self {
        Self { registry, log }
    }

    /// Computes statistics for a pool.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::PoolNotFound`] for an unknown pool or
    /// [`LedgerError::PersistenceError`] if the log cannot be read.
    pub async fn stats(&self, pool_id: PoolId) -> Result<PoolStats, LedgerError> {
        let pool = self.registry.get(pool_id).await?;
        let committed = self.log.committed_for_pool(pool_id).await?;

        let disbursed = committed.iter().map(|r| r.amount).sum();
        let unique: HashSet<&str> = committed
            .iter()
            .map(|r| r.participant_id.as_str())
            .collect();

        Ok(PoolStats {
            total_amount: pool.total_amount(),
            remaining_amount: pool.remaining(),
            committed_count: committed.len(),
            unique_participants: unique.len(),
            disbursed,
        })
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{ClaimStatus, ClaimTransaction, ParticipantId, TransactionId};
    use crate::persistence::MemoryTransactionLog;
    use chrono::Utc;

    async fn seed(
        log: &MemoryTransactionLog,
        pool_id: PoolId,
        participant: &str,
        amount: u64,
        status: ClaimStatus,
    ) {
        let record = ClaimTransaction::reserve(
            pool_id,
            TransactionId::new(),
            ParticipantId::new(participant),
            amount,
        );
        let tx = record.transaction_id;
        let _ = log.append_reserved(record).await;
        if status.is_terminal() {
            let _ = log.finalize(pool_id, tx, status, Utc::now()).await;
        }
    }

    #[tokio::test]
    async fn stats_count_committed_only() {
        let registry = Arc::new(PoolRegistry::new());
        let log = Arc::new(MemoryTransactionLog::new());
        let Ok(pool) = registry.create_pool(100, 30).await else {
            panic!("pool creation failed");
        };
        let pool_id = pool.pool_id();

        seed(&log, pool_id, "alice", 30, ClaimStatus::Committed).await;
        seed(&log, pool_id, "alice", 30, ClaimStatus::Committed).await;
        seed(&log, pool_id, "bob", 30, ClaimStatus::Released).await;
        seed(&log, pool_id, "carol", 30, ClaimStatus::Reserved).await;

        let aggregator =
            StatsAggregator::new(Arc::clone(&registry), log as Arc<dyn TransactionLog>);
        let Ok(stats) = aggregator.stats(pool_id).await else {
            panic!("stats failed");
        };

        assert_eq!(stats.total_amount, 100);
        assert_eq!(stats.committed_count, 2);
        // alice claimed twice; participants are not deduplicated at claim
        // time but the unique count collapses them.
        assert_eq!(stats.unique_participants, 1);
        assert_eq!(stats.disbursed, 60);
    }

    #[tokio::test]
    async fn remaining_matches_registry_value() {
        let registry = Arc::new(PoolRegistry::new());
        let log = Arc::new(MemoryTransactionLog::new());
        let Ok(pool) = registry.create_pool(100, 30).await else {
            panic!("pool creation failed");
        };
        let Ok(Some(_held)) = registry.try_reserve(pool.pool_id()).await else {
            panic!("reservation failed");
        };

        let aggregator =
            StatsAggregator::new(Arc::clone(&registry), log as Arc<dyn TransactionLog>);
        let Ok(stats) = aggregator.stats(pool.pool_id()).await else {
            panic!("stats failed");
        };
        assert_eq!(stats.remaining_amount, pool.remaining());
        assert_eq!(stats.remaining_amount, 70);
    }

    #[tokio::test]
    async fn unknown_pool_is_not_found() {
        let registry = Arc::new(PoolRegistry::new());
        let log = Arc::new(MemoryTransactionLog::new());
        let aggregator = StatsAggregator::new(registry, log as Arc<dyn TransactionLog>);

        let result = aggregator.stats(PoolId::new()).await;
        assert!(matches!(result, Err(LedgerError::PoolNotFound(_))));
    }
}
