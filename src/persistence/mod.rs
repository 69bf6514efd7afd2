//! Persistence layer: transaction log and PostgreSQL mirror.
//!
//! [`TransactionLog`] is the ledger's record-keeping contract: append a
//! `Reserved` record, finalize it exactly once, and answer the queries
//! the statistics aggregator and the reconciliation sweep need. The
//! default implementation is in-memory; when persistence is enabled the
//! PostgreSQL mirror additionally makes pools, transactions, and events
//! durable and hydrates the registry on restart.

pub mod memory;
pub mod models;
pub mod postgres;

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{ClaimStatus, ClaimTransaction, PoolId, TransactionId};
use crate::error::LedgerError;

pub use memory::MemoryTransactionLog;
pub use postgres::PostgresPersistence;

/// Append-only claim transaction store.
///
/// Records enter in [`ClaimStatus::Reserved`] and transition to exactly
/// one terminal state; implementations must reject a second terminal
/// transition.
#[async_trait]
pub trait TransactionLog: Send + Sync + fmt::Debug {
    /// Appends a freshly reserved record.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Internal`] if a record with the same
    /// `(pool_id, transaction_id)` already exists, or the record is not
    /// in [`ClaimStatus::Reserved`].
    async fn append_reserved(&self, record: ClaimTransaction) -> Result<(), LedgerError>;

    /// Moves a reserved record to a terminal state, returning the
    /// finalized record.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Inconsistent`] if the record is already
    /// terminal, and [`LedgerError::Internal`] if it does not exist or
    /// `status` is not terminal.
    async fn finalize(
        &self,
        pool_id: PoolId,
        transaction_id: TransactionId,
        status: ClaimStatus,
        finalized_at: DateTime<Utc>,
    ) -> Result<ClaimTransaction, LedgerError>;

    /// Looks up a record by identity.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::PersistenceError`] on storage failure.
    async fn get(
        &self,
        pool_id: PoolId,
        transaction_id: TransactionId,
    ) -> Result<Option<ClaimTransaction>, LedgerError>;

    /// Returns all committed records for a pool.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::PersistenceError`] on storage failure.
    async fn committed_for_pool(
        &self,
        pool_id: PoolId,
    ) -> Result<Vec<ClaimTransaction>, LedgerError>;

    /// Returns the sum of amounts of currently open (reserved) records
    /// for a pool.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::PersistenceError`] on storage failure.
    async fn reserved_total_for_pool(&self, pool_id: PoolId) -> Result<u64, LedgerError>;

    /// Returns all reserved records whose reservation is older than
    /// `cutoff` (reconciliation sweep input).
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::PersistenceError`] on storage failure.
    async fn reserved_older_than(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<ClaimTransaction>, LedgerError>;
}
