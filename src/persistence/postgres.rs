//! PostgreSQL mirror of pools, claim transactions, and the event log.
//!
//! The in-memory registry and transaction log stay authoritative at
//! runtime; this mirror makes their state durable and is the hydration
//! source on restart. Balance updates use conditional SQL so a drifted
//! mirror can never debit below zero or credit above `total_amount`.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::models::PoolRecord;
use crate::domain::{ClaimStatus, ClaimTransaction, ParticipantId, PoolId, PoolSnapshot, TransactionId};
use crate::error::LedgerError;

/// PostgreSQL-backed persistence using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresPersistence {
    pool: PgPool,
    event_log_enabled: bool,
}

/// Converts a ledger amount into a `BIGINT` column value.
fn to_db_amount(amount: u64) -> Result<i64, LedgerError> {
    i64::try_from(amount)
        .map_err(|_| LedgerError::PersistenceError(format!("amount {amount} exceeds BIGINT range")))
}

/// Converts a `BIGINT` column value back into a ledger amount.
fn from_db_amount(value: i64) -> Result<u64, LedgerError> {
    u64::try_from(value)
        .map_err(|_| LedgerError::PersistenceError(format!("negative stored amount {value}")))
}

impl PostgresPersistence {
    /// Creates a new mirror with the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool, event_log_enabled: bool) -> Self {
        Self {
            pool,
            event_log_enabled,
        }
    }

    /// Upserts a pool row from a snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::PersistenceError`] on database failure.
    pub async fn save_pool(&self, snapshot: &PoolSnapshot) -> Result<(), LedgerError> {
        sqlx::query(
            "INSERT INTO pools (pool_id, total_amount, per_claim_amount, remaining_amount, frozen, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (pool_id) DO UPDATE SET remaining_amount = EXCLUDED.remaining_amount, frozen = EXCLUDED.frozen",
        )
        .bind(*snapshot.pool_id.as_uuid())
        .bind(to_db_amount(snapshot.total_amount)?)
        .bind(to_db_amount(snapshot.per_claim_amount)?)
        .bind(to_db_amount(snapshot.remaining_amount)?)
        .bind(snapshot.frozen)
        .bind(snapshot.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| LedgerError::PersistenceError(e.to_string()))?;

        Ok(())
    }

    /// Conditionally debits the mirrored balance.
    ///
    /// The `WHERE remaining_amount >= $2` guard makes the update a no-op
    /// instead of a constraint violation when the mirror has drifted;
    /// `false` means the row was not updated.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::PersistenceError`] on database failure.
    pub async fn debit_remaining(&self, pool_id: PoolId, amount: u64) -> Result<bool, LedgerError> {
        let amount = to_db_amount(amount)?;
        let result = sqlx::query(
            "UPDATE pools SET remaining_amount = remaining_amount - $2 \
             WHERE pool_id = $1 AND remaining_amount >= $2",
        )
        .bind(*pool_id.as_uuid())
        .bind(amount)
        .execute(&self.pool)
        .await
        .map_err(|e| LedgerError::PersistenceError(e.to_string()))?;

        Ok(result.rows_affected() == 1)
    }

    /// Conditionally re-credits the mirrored balance, capped at
    /// `total_amount`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::PersistenceError`] on database failure.
    pub async fn credit_remaining(
        &self,
        pool_id: PoolId,
        amount: u64,
    ) -> Result<bool, LedgerError> {
        let amount = to_db_amount(amount)?;
        let result = sqlx::query(
            "UPDATE pools SET remaining_amount = remaining_amount + $2 \
             WHERE pool_id = $1 AND remaining_amount + $2 <= total_amount",
        )
        .bind(*pool_id.as_uuid())
        .bind(amount)
        .execute(&self.pool)
        .await
        .map_err(|e| LedgerError::PersistenceError(e.to_string()))?;

        Ok(result.rows_affected() == 1)
    }

    /// Marks a pool as frozen.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::PersistenceError`] on database failure.
    pub async fn set_frozen(&self, pool_id: PoolId) -> Result<(), LedgerError> {
        sqlx::query("UPDATE pools SET frozen = TRUE WHERE pool_id = $1")
            .bind(*pool_id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| LedgerError::PersistenceError(e.to_string()))?;

        Ok(())
    }

    /// Inserts a reserved claim transaction row.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::PersistenceError`] on database failure
    /// (including a duplicate `(pool_id, transaction_id)` pair).
    pub async fn insert_transaction(&self, record: &ClaimTransaction) -> Result<(), LedgerError> {
        sqlx::query(
            "INSERT INTO claim_transactions \
             (pool_id, transaction_id, participant_id, amount, status, reserved_at, finalized_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(*record.pool_id.as_uuid())
        .bind(*record.transaction_id.as_uuid())
        .bind(record.participant_id.as_str())
        .bind(to_db_amount(record.amount)?)
        .bind(record.status.as_str())
        .bind(record.reserved_at)
        .bind(record.finalized_at)
        .execute(&self.pool)
        .await
        .map_err(|e| LedgerError::PersistenceError(e.to_string()))?;

        Ok(())
    }

    /// Finalizes a mirrored transaction row, guarded on the row still
    /// being reserved so a terminal state is written at most once.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::PersistenceError`] on database failure.
    pub async fn finalize_transaction(
        &self,
        pool_id: PoolId,
        transaction_id: TransactionId,
        status: ClaimStatus,
        finalized_at: DateTime<Utc>,
    ) -> Result<bool, LedgerError> {
        let result = sqlx::query(
            "UPDATE claim_transactions SET status = $3, finalized_at = $4 \
             WHERE pool_id = $1 AND transaction_id = $2 AND status = 'reserved'",
        )
        .bind(*pool_id.as_uuid())
        .bind(*transaction_id.as_uuid())
        .bind(status.as_str())
        .bind(finalized_at)
        .execute(&self.pool)
        .await
        .map_err(|e| LedgerError::PersistenceError(e.to_string()))?;

        Ok(result.rows_affected() == 1)
    }

    /// Loads all pool rows (restart hydration).
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::PersistenceError`] on database failure.
    pub async fn load_pools(&self) -> Result<Vec<PoolRecord>, LedgerError> {
        let rows = sqlx::query_as::<_, (Uuid, i64, i64, i64, bool, DateTime<Utc>)>(
            "SELECT pool_id, total_amount, per_claim_amount, remaining_amount, frozen, created_at \
             FROM pools ORDER BY created_at ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| LedgerError::PersistenceError(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(
                |(pool_id, total_amount, per_claim_amount, remaining_amount, frozen, created_at)| {
                    PoolRecord {
                        pool_id,
                        total_amount,
                        per_claim_amount,
                        remaining_amount,
                        frozen,
                        created_at,
                    }
                },
            )
            .collect())
    }

    /// Loads all claim transaction rows (restart hydration).
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::PersistenceError`] on database failure or a
    /// row with an unknown status string.
    pub async fn load_transactions(&self) -> Result<Vec<ClaimTransaction>, LedgerError> {
        let rows = sqlx::query_as::<
            _,
            (
                Uuid,
                Uuid,
                String,
                i64,
                String,
                DateTime<Utc>,
                Option<DateTime<Utc>>,
            ),
        >(
            "SELECT pool_id, transaction_id, participant_id, amount, status, reserved_at, finalized_at \
             FROM claim_transactions ORDER BY reserved_at ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| LedgerError::PersistenceError(e.to_string()))?;

        let mut records = Vec::with_capacity(rows.len());
        for (pool_id, transaction_id, participant_id, amount, status, reserved_at, finalized_at) in
            rows
        {
            let status = ClaimStatus::parse(&status).ok_or_else(|| {
                LedgerError::PersistenceError(format!(
                    "transaction {transaction_id} has unknown status {status}"
                ))
            })?;
            records.push(ClaimTransaction {
                pool_id: PoolId::from_uuid(pool_id),
                transaction_id: TransactionId::from_uuid(transaction_id),
                participant_id: ParticipantId::new(participant_id),
                amount: from_db_amount(amount)?,
                status,
                reserved_at,
                finalized_at,
            });
        }
        Ok(records)
    }

    /// Appends an event to the event log. No-op when the event log is
    /// disabled.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::PersistenceError`] on database failure.
    pub async fn save_event(
        &self,
        pool_id: Uuid,
        event_type: &str,
        payload: &serde_json::Value,
    ) -> Result<i64, LedgerError> {
        if !self.event_log_enabled {
            return Ok(0);
        }
        let row = sqlx::query_scalar::<_, i64>(
            "INSERT INTO events (pool_id, event_type, payload) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(pool_id)
        .bind(event_type)
        .bind(payload)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| LedgerError::PersistenceError(e.to_string()))?;

        Ok(row)
    }
}
