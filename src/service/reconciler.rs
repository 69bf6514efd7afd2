//! Reconciliation sweep for claims left in an indeterminate state.
//!
//! A crash or gateway timeout can strand a transaction in `Reserved`
//! with its amount held. The sweep resolves every such record older
//! than a grace period by asking the gateway what actually happened:
//! a settled transfer commits (the amount was already held), anything
//! else releases. When the outcome is unknowable the sweep releases —
//! under-disbursement over double-pay. It then audits each pool's
//! conservation law and freezes pools whose books cannot be reconciled.

use std::sync::Arc;

use chrono::Utc;

use crate::domain::{
    ClaimStatus, ClaimTransaction, EventBus, LedgerEvent, PoolId, PoolRegistry, PoolState,
    TransactionId,
};
use crate::gateway::{DisbursementGateway, OutcomeReport};
use crate::persistence::{PostgresPersistence, TransactionLog};

/// Counts from one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Stale reservations finalized to `Committed`.
    pub committed: usize,
    /// Stale reservations finalized to `Released`.
    pub released: usize,
    /// Pools frozen by the conservation audit.
    pub frozen: usize,
}

/// Periodic sweep resolving stale reservations and auditing pool books.
#[derive(Debug, Clone)]
pub struct Reconciler {
    registry: Arc<PoolRegistry>,
    log: Arc<dyn TransactionLog>,
    gateway: Arc<dyn DisbursementGateway>,
    event_bus: EventBus,
    persistence: Option<Arc<PostgresPersistence>>,
    grace: chrono::Duration,
}

impl Reconciler {
    /// Creates a sweep over the given ledger components.
    #[must_use]
    pub fn new(
        registry: Arc<PoolRegistry>,
        log: Arc<dyn TransactionLog>,
        gateway: Arc<dyn DisbursementGateway>,
        event_bus: EventBus,
        grace: chrono::Duration,
    ) -> Self {
        Self {
            registry,
            log,
            gateway,
            event_bus,
            persistence: None,
            grace,
        }
    }

    /// Attaches the PostgreSQL mirror.
    #[must_use]
    pub fn with_persistence(mut self, persistence: Arc<PostgresPersistence>) -> Self {
        self.persistence = Some(persistence);
        self
    }

    /// Runs one full pass: resolve stale reservations, then audit every
    /// pool. Individual failures are logged and skipped; the sweep never
    /// aborts the process.
    pub async fn reconcile_once(&self) -> ReconcileReport {
        let mut report = ReconcileReport::default();

        let cutoff = Utc::now() - self.grace;
        let stale = match self.log.reserved_older_than(cutoff).await {
            Ok(records) => records,
            Err(err) => {
                tracing::error!(error = %err, "reconciliation scan failed");
                return report;
            }
        };

        for record in stale {
            match self.gateway.lookup_outcome(record.transaction_id).await {
                OutcomeReport::Succeeded => {
                    if self.settle_committed(&record).await {
                        report.committed += 1;
                    }
                }
                OutcomeReport::Failed | OutcomeReport::Unknown => {
                    if self.settle_released(&record).await {
                        report.released += 1;
                    }
                }
            }
        }

        for pool in self.registry.all().await {
            if self.audit_pool(&pool).await {
                report.frozen += 1;
            }
        }

        report
    }

    /// Spawns the periodic sweep. The first tick fires immediately,
    /// which doubles as the restart-recovery pass.
    pub fn spawn(self: Arc<Self>, period: std::time::Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                let report = self.reconcile_once().await;
                if report.committed + report.released + report.frozen > 0 {
                    tracing::info!(
                        committed = report.committed,
                        released = report.released,
                        frozen = report.frozen,
                        "reconciliation sweep settled stale claims"
                    );
                }
            }
        })
    }

    /// Finalizes a stale reservation whose transfer settled. The amount
    /// was already deducted at reservation time, so the balance is
    /// untouched; statistics start counting the claim.
    async fn settle_committed(&self, record: &ClaimTransaction) -> bool {
        let now = Utc::now();
        if let Err(err) = self
            .log
            .finalize(record.pool_id, record.transaction_id, ClaimStatus::Committed, now)
            .await
        {
            tracing::error!(
                pool_id = %record.pool_id,
                transaction_id = %record.transaction_id,
                error = %err,
                "failed to commit reconciled claim"
            );
            return false;
        }
        self.mirror_finalize(record.pool_id, record.transaction_id, ClaimStatus::Committed, record.amount)
            .await;
        self.publish(LedgerEvent::ClaimCommitted {
            pool_id: record.pool_id,
            transaction_id: record.transaction_id,
            participant_id: record.participant_id.clone(),
            amount: record.amount,
            timestamp: now,
        })
        .await;
        tracing::info!(
            pool_id = %record.pool_id,
            transaction_id = %record.transaction_id,
            amount = record.amount,
            "stale reservation committed after outcome lookup"
        );
        true
    }

    /// Finalizes a stale reservation whose transfer failed or is
    /// unknowable, returning the amount to the pool.
    async fn settle_released(&self, record: &ClaimTransaction) -> bool {
        let now = Utc::now();
        if let Err(err) = self
            .log
            .finalize(record.pool_id, record.transaction_id, ClaimStatus::Released, now)
            .await
        {
            tracing::error!(
                pool_id = %record.pool_id,
                transaction_id = %record.transaction_id,
                error = %err,
                "failed to release reconciled claim"
            );
            return false;
        }

        match self.registry.get(record.pool_id).await {
            Ok(pool) => {
                if let Err(err) = pool.release(record.amount) {
                    tracing::error!(
                        pool_id = %record.pool_id,
                        error = %err,
                        "re-credit failed during reconciliation"
                    );
                }
            }
            Err(err) => {
                tracing::error!(pool_id = %record.pool_id, error = %err, "pool missing during reconciliation");
            }
        }

        self.mirror_finalize(record.pool_id, record.transaction_id, ClaimStatus::Released, record.amount)
            .await;
        self.publish(LedgerEvent::ClaimReleased {
            pool_id: record.pool_id,
            transaction_id: record.transaction_id,
            participant_id: record.participant_id.clone(),
            amount: record.amount,
            timestamp: now,
        })
        .await;
        tracing::warn!(
            pool_id = %record.pool_id,
            transaction_id = %record.transaction_id,
            amount = record.amount,
            "stale reservation released"
        );
        true
    }

    /// Checks the conservation law
    /// `total == remaining + open reserved + committed` and freezes the
    /// pool when the accounted sum exceeds the total — money that was
    /// credited without ever being reserved. Returns `true` if the pool
    /// was frozen by this call.
    ///
    /// An accounted sum *below* total is only logged: a claim between
    /// its balance deduction and its record append looks exactly like
    /// that, and freezing on it would take healthy pools offline.
    async fn audit_pool(&self, pool: &Arc<PoolState>) -> bool {
        let pool_id = pool.pool_id();
        let committed_sum: u64 = match self.log.committed_for_pool(pool_id).await {
            Ok(records) => records.iter().map(|r| r.amount).sum(),
            Err(err) => {
                tracing::error!(%pool_id, error = %err, "audit query failed");
                return false;
            }
        };
        let reserved_sum = match self.log.reserved_total_for_pool(pool_id).await {
            Ok(sum) => sum,
            Err(err) => {
                tracing::error!(%pool_id, error = %err, "audit query failed");
                return false;
            }
        };

        let accounted = u128::from(pool.remaining())
            + u128::from(reserved_sum)
            + u128::from(committed_sum);
        let total = u128::from(pool.total_amount());

        if accounted > total && !pool.is_frozen() {
            let reason = format!(
                "accounted {accounted} exceeds total {total} (remaining {}, reserved {reserved_sum}, committed {committed_sum})",
                pool.remaining()
            );
            tracing::error!(%pool_id, %reason, "conservation audit failed; freezing pool");
            pool.freeze();
            if let Some(pg) = &self.persistence
                && let Err(err) = pg.set_frozen(pool_id).await
            {
                tracing::warn!(%pool_id, error = %err, "failed to mirror pool freeze");
            }
            self.publish(LedgerEvent::PoolFrozen {
                pool_id,
                reason,
                timestamp: Utc::now(),
            })
            .await;
            return true;
        }
        if accounted < total {
            tracing::debug!(
                %pool_id,
                accounted = %accounted,
                total = %total,
                "accounted sum below total; in-flight claims or lost credits"
            );
        }
        false
    }

    /// Best-effort terminal-state write-through to the mirror.
    async fn mirror_finalize(
        &self,
        pool_id: PoolId,
        transaction_id: TransactionId,
        status: ClaimStatus,
        amount: u64,
    ) {
        let Some(pg) = &self.persistence else {
            return;
        };
        match pg
            .finalize_transaction(pool_id, transaction_id, status, Utc::now())
            .await
        {
            Ok(true) => {}
            Ok(false) => {
                tracing::warn!(%pool_id, %transaction_id, "mirror finalize matched no reserved row");
            }
            Err(err) => {
                tracing::warn!(%pool_id, %transaction_id, error = %err, "mirror finalize failed");
            }
        }
        if status == ClaimStatus::Released {
            match pg.credit_remaining(pool_id, amount).await {
                Ok(true) => {}
                Ok(false) => {
                    tracing::warn!(%pool_id, amount, "mirror credit matched no row; balance mirror drifted");
                }
                Err(err) => {
                    tracing::warn!(%pool_id, error = %err, "mirror credit failed");
                }
            }
        }
    }

    /// Publishes an event on the bus and mirrors it to the durable event
    /// log when enabled.
    async fn publish(&self, event: LedgerEvent) {
        if let Some(pg) = &self.persistence {
            match serde_json::to_value(&event) {
                Ok(payload) => {
                    if let Err(err) = pg
                        .save_event(*event.pool_id().as_uuid(), event.event_type_str(), &payload)
                        .await
                    {
                        tracing::warn!(error = %err, "event log write failed");
                    }
                }
                Err(err) => {
                    tracing::warn!(error = %err, "event serialization failed");
                }
            }
        }
        let _ = self.event_bus.publish(event);
    }
}
