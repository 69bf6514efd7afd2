//! Claim ledger: the reserve-then-confirm claim protocol.
//!
//! [`ClaimLedger`] arbitrates concurrent claims against a pool. Funds are
//! reserved *before* the gateway call so two racing claims can never both
//! disburse past `total_amount`, and only a confirmed success consumes
//! the reservation for good, so a failed transfer never burns a share.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::domain::{
    ClaimCode, ClaimStatus, ClaimTransaction, EventBus, LedgerEvent, ParticipantId, PoolId,
    PoolRegistry, PoolState, TransactionId,
};
use crate::error::LedgerError;
use crate::gateway::{DisburseOutcome, DisbursementGateway};
use crate::persistence::{PostgresPersistence, TransactionLog};

/// Outcome of a successful claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClaimReceipt {
    /// The claim's transaction identifier.
    pub transaction_id: TransactionId,
    /// The disbursed amount in minor currency units.
    pub amount: u64,
}

/// Orchestration layer for pool creation and claim submission.
///
/// Owns references to the [`PoolRegistry`] for balances, the
/// [`TransactionLog`] for records, the [`DisbursementGateway`] for the
/// external transfer, and the [`EventBus`] for event emission. The
/// registry's per-pool CAS counter is authoritative for admission; the
/// optional PostgreSQL mirror only adds durability.
#[derive(Debug, Clone)]
pub struct ClaimLedger {
    registry: Arc<PoolRegistry>,
    log: Arc<dyn TransactionLog>,
    gateway: Arc<dyn DisbursementGateway>,
    event_bus: EventBus,
    persistence: Option<Arc<PostgresPersistence>>,
    disburse_timeout: Duration,
}

impl ClaimLedger {
    /// Creates a new ledger without a durable mirror.
    #[must_use]
    pub fn new(
        registry: Arc<PoolRegistry>,
        log: Arc<dyn TransactionLog>,
        gateway: Arc<dyn DisbursementGateway>,
        event_bus: EventBus,
        disburse_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            log,
            gateway,
            event_bus,
            persistence: None,
            disburse_timeout,
        }
    }

    /// Attaches the PostgreSQL mirror.
    #[must_use]
    pub fn with_persistence(mut self, persistence: Arc<PostgresPersistence>) -> Self {
        self.persistence = Some(persistence);
        self
    }

    /// Returns a reference to the inner [`EventBus`].
    #[must_use]
    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Returns a reference to the inner [`PoolRegistry`].
    #[must_use]
    pub fn registry(&self) -> &Arc<PoolRegistry> {
        &self.registry
    }

    /// Returns a reference to the transaction log.
    #[must_use]
    pub fn log(&self) -> &Arc<dyn TransactionLog> {
        &self.log
    }

    /// Creates a new giveaway pool and its scannable claim code.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InvalidArgument`] on invalid amounts or
    /// [`LedgerError::PersistenceError`] if the durable pool record
    /// cannot be written.
    pub async fn create_pool(
        &self,
        total_amount: u64,
        per_claim_amount: u64,
    ) -> Result<(Arc<PoolState>, ClaimCode), LedgerError> {
        let state = PoolState::new(total_amount, per_claim_amount)?;
        let snapshot = state.snapshot();
        if let Some(pg) = &self.persistence {
            pg.save_pool(&snapshot).await?;
        }
        let pool = self.registry.insert(state).await?;
        let pool_id = pool.pool_id();
        let claim_code = ClaimCode::for_pool(pool_id);

        self.publish(LedgerEvent::PoolCreated {
            pool_id,
            total_amount,
            per_claim_amount,
            timestamp: Utc::now(),
        })
        .await;

        tracing::info!(%pool_id, total_amount, per_claim_amount, "pool created");
        Ok((pool, claim_code))
    }

    /// Submits one claim attempt against a pool.
    ///
    /// Protocol: frozen check → idempotency lookup → advisory balance
    /// check → atomic reservation → persisted `Reserved` record →
    /// bounded gateway call → `Committed` or `Released` terminal state.
    /// No pool lock is held across the gateway round-trip.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::PoolNotFound`] for an unknown pool.
    /// - [`LedgerError::PoolExhausted`] when the balance cannot cover a
    ///   share; nothing is mutated and no record is created.
    /// - [`LedgerError::DisbursementFailed`] when the gateway fails
    ///   definitively; the reservation is released (net-zero effect).
    /// - [`LedgerError::DisbursementTimeout`] when the gateway does not
    ///   answer in time; the reservation stays held for reconciliation.
    /// - [`LedgerError::ClaimPending`] / [`LedgerError::InvalidArgument`]
    ///   on idempotency-key conflicts.
    /// - [`LedgerError::Inconsistent`] when the pool is frozen for audit.
    pub async fn submit_claim(
        &self,
        pool_id: PoolId,
        participant_id: ParticipantId,
        idempotency_key: Option<TransactionId>,
    ) -> Result<ClaimReceipt, LedgerError> {
        let pool = self.registry.get(pool_id).await?;
        if pool.is_frozen() {
            return Err(LedgerError::Inconsistent(format!(
                "pool {pool_id} is frozen pending audit"
            )));
        }

        // A resubmitted key replays the recorded outcome; it never takes
        // a second reservation.
        if let Some(key) = idempotency_key
            && let Some(existing) = self.log.get(pool_id, key).await?
        {
            return Self::replay(&existing, &participant_id);
        }

        // Advisory fast path. Admission is the CAS reservation below.
        let per_claim = pool.per_claim_amount();
        if pool.remaining() < per_claim {
            return Err(LedgerError::PoolExhausted);
        }

        let Some(token) = pool.try_reserve() else {
            return Err(LedgerError::PoolExhausted);
        };

        let transaction_id = idempotency_key.unwrap_or_else(TransactionId::new);
        let record = ClaimTransaction::reserve(
            pool_id,
            transaction_id,
            participant_id.clone(),
            token.amount(),
        );
        let amount = record.amount;

        // The Reserved record must exist before any money can move.
        if let Err(err) = self.log.append_reserved(record.clone()).await {
            self.registry.release_reservation(token).await?;
            // Two first submissions racing on one idempotency key can
            // both miss the lookup above; the loser of the append finds
            // the winner's record here and replays it.
            if idempotency_key.is_some()
                && let Ok(Some(existing)) = self.log.get(pool_id, transaction_id).await
            {
                return Self::replay(&existing, &participant_id);
            }
            return Err(err);
        }
        if let Some(pg) = &self.persistence {
            if let Err(err) = pg.insert_transaction(&record).await {
                let _ = self
                    .log
                    .finalize(pool_id, transaction_id, ClaimStatus::Released, Utc::now())
                    .await;
                self.registry.release_reservation(token).await?;
                return Err(err);
            }
            self.mirror_debit(pool_id, amount).await;
        }

        self.publish(LedgerEvent::ClaimReserved {
            pool_id,
            transaction_id,
            participant_id: participant_id.clone(),
            amount,
            remaining_amount: pool.remaining(),
            timestamp: Utc::now(),
        })
        .await;

        let outcome = match tokio::time::timeout(
            self.disburse_timeout,
            self.gateway.disburse(transaction_id, &participant_id, amount),
        )
        .await
        {
            Ok(outcome) => outcome,
            Err(_) => DisburseOutcome::TimedOut,
        };

        match outcome {
            DisburseOutcome::Succeeded => {
                // Money moved: the reservation is consumed for good. If
                // the terminal write fails the record stays Reserved and
                // the sweep commits it later via outcome lookup; it is
                // never released on this path.
                let now = Utc::now();
                if let Err(err) = self
                    .log
                    .finalize(pool_id, transaction_id, ClaimStatus::Committed, now)
                    .await
                {
                    tracing::error!(
                        %pool_id, %transaction_id, error = %err,
                        "commit write failed after successful disbursement"
                    );
                }
                self.mirror_finalize(pool_id, transaction_id, ClaimStatus::Committed, amount)
                    .await;
                self.publish(LedgerEvent::ClaimCommitted {
                    pool_id,
                    transaction_id,
                    participant_id,
                    amount,
                    timestamp: now,
                })
                .await;
                tracing::info!(%pool_id, %transaction_id, amount, "claim committed");
                Ok(ClaimReceipt {
                    transaction_id,
                    amount,
                })
            }
            DisburseOutcome::Failed => {
                // Record the release before re-crediting: losing the
                // credit leaves the ledger under-disbursed, which the
                // audit flags; the reverse order could double-credit.
                let now = Utc::now();
                self.log
                    .finalize(pool_id, transaction_id, ClaimStatus::Released, now)
                    .await?;
                self.registry.release_reservation(token).await?;
                self.mirror_finalize(pool_id, transaction_id, ClaimStatus::Released, amount)
                    .await;
                self.publish(LedgerEvent::ClaimReleased {
                    pool_id,
                    transaction_id,
                    participant_id,
                    amount,
                    timestamp: now,
                })
                .await;
                tracing::warn!(%pool_id, %transaction_id, amount, "claim released after gateway failure");
                Err(LedgerError::DisbursementFailed(*transaction_id.as_uuid()))
            }
            DisburseOutcome::TimedOut => {
                // Outcome unknown: the record stays Reserved and the
                // amount stays held. Releasing now could overshoot
                // total_amount if the transfer later lands; the sweep
                // settles it after the grace period.
                tracing::warn!(%pool_id, %transaction_id, amount, "disbursement timed out; claim held for reconciliation");
                Err(LedgerError::DisbursementTimeout(*transaction_id.as_uuid()))
            }
        }
    }

    /// Replays the recorded outcome for a resubmitted idempotency key.
    fn replay(
        existing: &ClaimTransaction,
        participant_id: &ParticipantId,
    ) -> Result<ClaimReceipt, LedgerError> {
        if existing.participant_id != *participant_id {
            return Err(LedgerError::InvalidArgument(
                "idempotency key was already used by another participant".to_string(),
            ));
        }
        match existing.status {
            ClaimStatus::Committed => Ok(ClaimReceipt {
                transaction_id: existing.transaction_id,
                amount: existing.amount,
            }),
            ClaimStatus::Released => Err(LedgerError::DisbursementFailed(
                *existing.transaction_id.as_uuid(),
            )),
            ClaimStatus::Reserved => Err(LedgerError::ClaimPending(
                *existing.transaction_id.as_uuid(),
            )),
        }
    }

    /// Best-effort balance debit on the mirror. The in-memory counter is
    /// authoritative; drift here is surfaced, not fatal.
    async fn mirror_debit(&self, pool_id: PoolId, amount: u64) {
        let Some(pg) = &self.persistence else {
            return;
        };
        match pg.debit_remaining(pool_id, amount).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::warn!(%pool_id, amount, "mirror debit matched no row; balance mirror drifted");
            }
            Err(err) => {
                tracing::warn!(%pool_id, error = %err, "mirror debit failed");
            }
        }
    }

    /// Best-effort terminal-state write-through to the mirror, crediting
    /// the mirrored balance back on a release.
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
