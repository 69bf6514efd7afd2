//! Domain events reflecting ledger state mutations.
//!
//! Every state change emits a [`LedgerEvent`] through the
//! [`super::EventBus`]. Events are broadcast to in-process subscribers
//! and optionally appended to the PostgreSQL event log.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{ParticipantId, PoolId, TransactionId};

/// Domain event emitted after every ledger state mutation.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum LedgerEvent {
    /// Emitted when a new giveaway pool is created.
    PoolCreated {
        /// Pool identifier.
        pool_id: PoolId,
        /// Fixed pool size in minor currency units.
        total_amount: u64,
        /// Fixed share size per claim.
        per_claim_amount: u64,
        /// Creation timestamp.
        timestamp: DateTime<Utc>,
    },

    /// Emitted when a claim wins a reservation.
    ClaimReserved {
        /// Pool identifier.
        pool_id: PoolId,
        /// Claim attempt identifier.
        transaction_id: TransactionId,
        /// Claiming participant.
        participant_id: ParticipantId,
        /// Reserved amount.
        amount: u64,
        /// Remaining pool balance after the reservation.
        remaining_amount: u64,
        /// Reservation timestamp.
        timestamp: DateTime<Utc>,
    },

    /// Emitted when a reserved claim commits after a successful
    /// disbursement.
    ClaimCommitted {
        /// Pool identifier.
        pool_id: PoolId,
        /// Claim attempt identifier.
        transaction_id: TransactionId,
        /// Claiming participant.
        participant_id: ParticipantId,
        /// Disbursed amount.
        amount: u64,
        /// Commit timestamp.
        timestamp: DateTime<Utc>,
    },

    /// Emitted when a reserved claim is released after a failed
    /// disbursement and its amount returns to the pool.
    ClaimReleased {
        /// Pool identifier.
        pool_id: PoolId,
        /// Claim attempt identifier.
        transaction_id: TransactionId,
        /// Claiming participant.
        participant_id: ParticipantId,
        /// Released amount.
        amount: u64,
        /// Release timestamp.
        timestamp: DateTime<Utc>,
    },

    /// Emitted when an accounting check fails and the pool is frozen for
    /// manual audit.
    PoolFrozen {
        /// Pool identifier.
        pool_id: PoolId,
        /// Why the pool was frozen.
        reason: String,
        /// Freeze timestamp.
        timestamp: DateTime<Utc>,
    },
}

impl LedgerEvent {
    /// Returns the pool ID associated with this event.
    #[must_use]
    pub fn pool_id(&self) -> PoolId {
        match self {
            Self::PoolCreated { pool_id, .. }
            | Self::ClaimReserved { pool_id, .. }
            | Self::ClaimCommitted { pool_id, .. }
            | Self::ClaimReleased { pool_id, .. }
            | Self::PoolFrozen { pool_id, .. } => *pool_id,
        }
    }

    /// Returns the event type as a static string slice.
    #[must_use]
    pub const fn event_type_str(&self) -> &'static str {
        match self {
            Self::PoolCreated { .. } => "pool_created",
            Self::ClaimReserved { .. } => "claim_reserved",
            Self::ClaimCommitted { .. } => "claim_committed",
            Self::ClaimReleased { .. } => "claim_released",
            Self::PoolFrozen { .. } => "pool_frozen",
        }
    }
}
