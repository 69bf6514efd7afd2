//! Concurrent pool storage.
//!
//! [`PoolRegistry`] stores all active pools in a `HashMap` behind a
//! [`tokio::sync::RwLock`]. The outer lock only guards map membership;
//! balance arithmetic lives in each [`PoolState`]'s atomic counter, so
//! reservations against different pools never block one another and the
//! map lock is never held across a reservation.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use super::PoolId;
use super::pool::{PoolState, ReservationToken};
use crate::error::LedgerError;

/// Central store for all active giveaway pools.
///
/// # Concurrency
///
/// - Lookups take the outer read lock briefly and clone the `Arc`.
/// - Reservation and release go through the pool's own CAS counter;
///   the registry adds no serialization beyond map access.
#[derive(Debug)]
pub struct PoolRegistry {
    pools: RwLock<HashMap<PoolId, Arc<PoolState>>>,
}

impl PoolRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            pools: RwLock::new(HashMap::new()),
        }
    }

    /// Validates parameters and inserts a fresh pool.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InvalidArgument`] on invalid amounts
    /// (see [`PoolState::new`]).
    pub async fn create_pool(
        &self,
        total_amount: u64,
        per_claim_amount: u64,
    ) -> Result<Arc<PoolState>, LedgerError> {
        let state = PoolState::new(total_amount, per_claim_amount)?;
        self.insert(state).await
    }

    /// Inserts an already-constructed pool (creation or restart hydration).
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InvalidArgument`] if a pool with the same
    /// ID already exists (should never happen with UUID v4).
    pub async fn insert(&self, state: PoolState) -> Result<Arc<PoolState>, LedgerError> {
        let pool_id = state.pool_id();
        let mut map = self.pools.write().await;
        if map.contains_key(&pool_id) {
            return Err(LedgerError::InvalidArgument(format!(
                "pool {pool_id} already exists"
            )));
        }
        let arc = Arc::new(state);
        map.insert(pool_id, Arc::clone(&arc));
        Ok(arc)
    }

    /// Returns a shared handle to the pool.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::PoolNotFound`] if no pool with the given ID
    /// exists.
    pub async fn get(&self, pool_id: PoolId) -> Result<Arc<PoolState>, LedgerError> {
        let map = self.pools.read().await;
        map.get(&pool_id)
            .cloned()
            .ok_or(LedgerError::PoolNotFound(*pool_id.as_uuid()))
    }

    /// Atomically reserves one share against the pool.
    ///
    /// Returns `None` without mutation when the remaining balance cannot
    /// cover another share. This is the sole admission path for claims.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::PoolNotFound`] if the pool does not exist.
    pub async fn try_reserve(
        &self,
        pool_id: PoolId,
    ) -> Result<Option<ReservationToken>, LedgerError> {
        let pool = self.get(pool_id).await?;
        Ok(pool.try_reserve())
    }

    /// Re-credits a reservation, consuming its token.
    ///
    /// Single use is enforced upstream by move semantics on the token and
    /// by the transaction log's single-terminal-transition rule.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::PoolNotFound`] if the pool is gone, or
    /// [`LedgerError::Inconsistent`] if the credit would exceed
    /// `total_amount` (the pool is frozen in that case).
    pub async fn release_reservation(&self, token: ReservationToken) -> Result<(), LedgerError> {
        let pool = self.get(token.pool_id()).await?;
        pool.release(token.amount())?;
        Ok(())
    }

    /// Returns handles to every pool (reconciliation sweep input).
    pub async fn all(&self) -> Vec<Arc<PoolState>> {
        self.pools.read().await.values().cloned().collect()
    }

    /// Returns the number of pools in the registry.
    pub async fn len(&self) -> usize {
        self.pools.read().await.len()
    }

    /// Returns `true` if the registry contains no pools.
    pub async fn is_empty(&self) -> bool {
        self.pools.read().await.is_empty()
    }
}

impl Default for PoolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
