//! Pool state with lock-free reservation arithmetic.
//!
//! [`PoolState`] holds a giveaway pool's fixed parameters plus its live
//! `remaining_amount`, stored in an [`AtomicU64`]. The check-and-decrement
//! of a reservation is a single compare-and-swap loop, so two concurrent
//! reservations against the same pool can never both succeed when their
//! combined amount would exceed the remaining balance, and reservations
//! against different pools never contend on any shared lock.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::PoolId;
use crate::error::LedgerError;

/// Proof of a successful reservation against a pool.
///
/// Deliberately neither `Clone` nor `Copy`: a token is consumed exactly
/// once, either implicitly by a committed claim or explicitly through
/// [`PoolState::release`] /
/// [`PoolRegistry::release_reservation`](super::PoolRegistry::release_reservation).
#[derive(Debug)]
#[must_use = "an unconsumed reservation token leaks reserved funds"]
pub struct ReservationToken {
    pool_id: PoolId,
    amount: u64,
}

impl ReservationToken {
    fn new(pool_id: PoolId, amount: u64) -> Self {
        Self { pool_id, amount }
    }

    /// The pool this reservation was taken against.
    #[must_use]
    pub const fn pool_id(&self) -> PoolId {
        self.pool_id
    }

    /// The reserved amount in minor currency units.
    #[must_use]
    pub const fn amount(&self) -> u64 {
        self.amount
    }
}

/// Live state of a single giveaway pool.
///
/// `total_amount` and `per_claim_amount` are immutable after creation.
/// `remaining` is mutated exclusively through the CAS loops in
/// [`try_reserve`](Self::try_reserve) and [`release`](Self::release).
/// A frozen pool rejects all further claims until manually audited.
#[derive(Debug)]
pub struct PoolState {
    pool_id: PoolId,
    total_amount: u64,
    per_claim_amount: u64,
    remaining: AtomicU64,
    frozen: AtomicBool,
    created_at: DateTime<Utc>,
}

impl PoolState {
    /// Creates a fresh pool with `remaining_amount = total_amount`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InvalidArgument`] if either amount is zero
    /// or `per_claim_amount` exceeds `total_amount`.
    pub fn new(total_amount: u64, per_claim_amount: u64) -> Result<Self, LedgerError> {
        if total_amount == 0 {
            return Err(LedgerError::InvalidArgument(
                "totalAmount must be positive".to_string(),
            ));
        }
        if per_claim_amount == 0 {
            return Err(LedgerError::InvalidArgument(
                "perClaimAmount must be positive".to_string(),
            ));
        }
        if per_claim_amount > total_amount {
            return Err(LedgerError::InvalidArgument(
                "perClaimAmount cannot exceed totalAmount".to_string(),
            ));
        }
        Ok(Self {
            pool_id: PoolId::new(),
            total_amount,
            per_claim_amount,
            remaining: AtomicU64::new(total_amount),
            frozen: AtomicBool::new(false),
            created_at: Utc::now(),
        })
    }

    /// Rebuilds a pool from a persisted record (restart hydration).
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Inconsistent`] if the stored balance
    /// violates `0 <= remaining <= total` or the fixed parameters are
    /// invalid.
    pub fn hydrate(
        pool_id: PoolId,
        total_amount: u64,
        per_claim_amount: u64,
        remaining_amount: u64,
        frozen: bool,
        created_at: DateTime<Utc>,
    ) -> Result<Self, LedgerError> {
        if total_amount == 0 || per_claim_amount == 0 || per_claim_amount > total_amount {
            return Err(LedgerError::Inconsistent(format!(
                "pool {pool_id} has invalid stored parameters"
            )));
        }
        if remaining_amount > total_amount {
            return Err(LedgerError::Inconsistent(format!(
                "pool {pool_id} stored remaining {remaining_amount} exceeds total {total_amount}"
            )));
        }
        Ok(Self {
            pool_id,
            total_amount,
            per_claim_amount,
            remaining: AtomicU64::new(remaining_amount),
            frozen: AtomicBool::new(frozen),
            created_at,
        })
    }

    /// Pool identifier.
    #[must_use]
    pub const fn pool_id(&self) -> PoolId {
        self.pool_id
    }

    /// Fixed pool size in minor currency units.
    #[must_use]
    pub const fn total_amount(&self) -> u64 {
        self.total_amount
    }

    /// Fixed share size disbursed per successful claim.
    #[must_use]
    pub const fn per_claim_amount(&self) -> u64 {
        self.per_claim_amount
    }

    /// Current remaining balance. Advisory only: it may change the moment
    /// it is read. Admission is governed by [`try_reserve`](Self::try_reserve).
    #[must_use]
    pub fn remaining(&self) -> u64 {
        self.remaining.load(Ordering::Acquire)
    }

    /// Whether the pool has been frozen for manual audit.
    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.frozen.load(Ordering::Acquire)
    }

    /// Freezes the pool. All subsequent claims fail closed with
    /// [`LedgerError::Inconsistent`] until the pool is manually resolved.
    pub fn freeze(&self) {
        self.frozen.store(true, Ordering::Release);
    }

    /// Creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Atomically reserves one share, returning `None` without mutation
    /// when the remaining balance cannot cover it.
    ///
    /// This is the sole admission path: the CAS retry loop guarantees the
    /// check and the decrement happen as one step, so the sum of
    /// outstanding reservations and committed claims can never exceed
    /// `total_amount`.
    pub fn try_reserve(&self) -> Option<ReservationToken> {
        let amount = self.per_claim_amount;
        let mut current = self.remaining.load(Ordering::Acquire);
        loop {
            if current < amount {
                return None;
            }
            let next = current - amount;
            match self.remaining.compare_exchange_weak(
                current,
                next,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Some(ReservationToken::new(self.pool_id, amount)),
                Err(observed) => current = observed,
            }
        }
    }

    /// Re-credits a previously reserved amount, returning the new balance.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Inconsistent`] and freezes the pool if the
    /// credit would push `remaining` above `total_amount` — that can only
    /// mean an amount was released that was never reserved.
    pub fn release(&self, amount: u64) -> Result<u64, LedgerError> {
        let mut current = self.remaining.load(Ordering::Acquire);
        loop {
            let next = current.checked_add(amount).unwrap_or(u64::MAX);
            if next > self.total_amount {
                self.freeze();
                return Err(LedgerError::Inconsistent(format!(
                    "releasing {amount} would overflow pool {} ({} of {})",
                    self.pool_id, current, self.total_amount
                )));
            }
            match self.remaining.compare_exchange_weak(
                current,
                next,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Ok(next),
                Err(observed) => current = observed,
            }
        }
    }

    /// Point-in-time copy of the pool. Callers must not assume it stays
    /// current.
    #[must_use]
    pub fn snapshot(&self) -> PoolSnapshot {
        PoolSnapshot {
            pool_id: self.pool_id,
            total_amount: self.total_amount,
            per_claim_amount: self.per_claim_amount,
            remaining_amount: self.remaining(),
            frozen: self.is_frozen(),
            created_at: self.created_at,
        }
    }
}

/// Immutable point-in-time copy of a pool's state.
#[derive(Debug, Clone, Serialize)]
pub struct PoolSnapshot {
    /// Pool identifier.
    pub pool_id: PoolId,
    /// Fixed pool size.
    pub total_amount: u64,
    /// Fixed share size.
    pub per_claim_amount: u64,
    /// Remaining balance at snapshot time.
    pub remaining_amount: u64,
    /// Whether the pool was frozen at snapshot time.
    pub frozen: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn new_pool_starts_full() {
        let Ok(pool) = PoolState::new(100, 30) else {
            panic!("valid pool");
        };
        assert_eq!(pool.remaining(), 100);
        assert!(!pool.is_frozen());
    }

    #[test]
    fn zero_amounts_are_rejected() {
        assert!(PoolState::new(0, 30).is_err());
        assert!(PoolState::new(100, 0).is_err());
    }

    #[test]
    fn per_claim_larger_than_total_is_rejected() {
        assert!(PoolState::new(100, 101).is_err());
    }

    #[test]
    fn reserve_decrements_remaining() {
        let Ok(pool) = PoolState::new(100, 30) else {
            panic!("valid pool");
        };
        let token = pool.try_reserve();
        let Some(token) = token else {
            panic!("reservation should succeed");
        };
        assert_eq!(token.amount(), 30);
        assert_eq!(pool.remaining(), 70);
    }

    #[test]
    fn reserve_denied_below_per_claim() {
        // A remainder of 20 against a 30-unit share: drain one share from
        // a 50-unit pool to get there (20 < 30 is invalid at creation).
        let Ok(pool) = PoolState::new(50, 30) else {
            panic!("valid pool");
        };
        let Some(_token) = pool.try_reserve() else {
            panic!("first reservation should succeed");
        };
        assert_eq!(pool.remaining(), 20);
        assert!(pool.try_reserve().is_none());
        // Denial must not mutate.
        assert_eq!(pool.remaining(), 20);
    }

    #[test]
    fn release_restores_balance() {
        let Ok(pool) = PoolState::new(100, 30) else {
            panic!("valid pool");
        };
        let Some(token) = pool.try_reserve() else {
            panic!("reservation should succeed");
        };
        assert_eq!(pool.remaining(), 70);
        let result = pool.release(token.amount());
        assert_eq!(result.ok(), Some(100));
    }

    #[test]
    fn release_beyond_total_freezes_pool() {
        let Ok(pool) = PoolState::new(100, 30) else {
            panic!("valid pool");
        };
        let result = pool.release(1);
        assert!(result.is_err());
        assert!(pool.is_frozen());
    }

    #[test]
    fn concurrent_reservations_never_oversubscribe() {
        // totalAmount=100, perClaimAmount=30: at most 3 of 4 concurrent
        // claimants may win, even before any commit completes.
        let Ok(pool) = PoolState::new(100, 30) else {
            panic!("valid pool");
        };
        let pool = Arc::new(pool);

        let mut handles = Vec::new();
        for _ in 0..4 {
            let pool = Arc::clone(&pool);
            handles.push(std::thread::spawn(move || pool.try_reserve().is_some()));
        }
        let wins = handles
            .into_iter()
            .map(|h| h.join())
            .filter(|r| matches!(r, Ok(true)))
            .count();

        assert_eq!(wins, 3);
        assert_eq!(pool.remaining(), 10);
    }

    #[test]
    fn hydrate_rejects_remaining_above_total() {
        let result = PoolState::hydrate(PoolId::new(), 100, 30, 130, false, Utc::now());
        assert!(result.is_err());
    }

    #[test]
    fn snapshot_is_point_in_time() {
        let Ok(pool) = PoolState::new(100, 30) else {
            panic!("valid pool");
        };
        let before = pool.snapshot();
        let Some(_token) = pool.try_reserve() else {
            panic!("reservation should succeed");
        };
        assert_eq!(before.remaining_amount, 100);
        assert_eq!(pool.snapshot().remaining_amount, 70);
    }
}
