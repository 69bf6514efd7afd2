//! Claim transaction records and their status state machine.
//!
//! Every claim attempt that wins a reservation produces exactly one
//! [`ClaimTransaction`], created in [`ClaimStatus::Reserved`] and later
//! finalized to exactly one of [`ClaimStatus::Committed`] or
//! [`ClaimStatus::Released`]. The single-terminal-transition rule is
//! enforced by the transaction log, not by this type.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ParticipantId, PoolId, TransactionId};

/// Lifecycle state of a claim transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ClaimStatus {
    /// Funds are deducted from the pool; the disbursement outcome is not
    /// yet known.
    Reserved,
    /// The disbursement succeeded; the reservation is permanently consumed.
    Committed,
    /// The disbursement failed; the reservation was re-credited.
    Released,
}

impl ClaimStatus {
    /// Stable string form, used for event payloads and database rows.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Reserved => "reserved",
            Self::Committed => "committed",
            Self::Released => "released",
        }
    }

    /// Whether this is a terminal state.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Committed | Self::Released)
    }

    /// Parses the stable string form back into a status.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "reserved" => Some(Self::Reserved),
            "committed" => Some(Self::Committed),
            "released" => Some(Self::Released),
            _ => None,
        }
    }
}

/// A single claim attempt's ledger record.
///
/// Identified by `(pool_id, transaction_id)`. `amount` is fixed at the
/// pool's `per_claim_amount` as of reservation time. `reserved_at`
/// records when the reservation was taken; disbursement may settle in a
/// different real-world order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimTransaction {
    /// Pool the claim was made against.
    pub pool_id: PoolId,
    /// Attempt identifier (generated, or the client's idempotency key).
    pub transaction_id: TransactionId,
    /// Claiming participant. Deliberately not deduplicated per pool.
    pub participant_id: ParticipantId,
    /// Reserved share size in minor currency units.
    pub amount: u64,
    /// Current lifecycle state.
    pub status: ClaimStatus,
    /// When the reservation was taken.
    pub reserved_at: DateTime<Utc>,
    /// When the record reached a terminal state, if it has.
    pub finalized_at: Option<DateTime<Utc>>,
}

impl ClaimTransaction {
    /// Creates a fresh record in [`ClaimStatus::Reserved`].
    #[must_use]
    pub fn reserve(
        pool_id: PoolId,
        transaction_id: TransactionId,
        participant_id: ParticipantId,
        amount: u64,
    ) -> Self {
        Self {
            pool_id,
            transaction_id,
            participant_id,
            amount,
            status: ClaimStatus::Reserved,
            reserved_at: Utc::now(),
            finalized_at: None,
        }
    }

    /// Whether the record has reached a terminal state.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn fresh_record_is_reserved() {
        let record = ClaimTransaction::reserve(
            PoolId::new(),
            TransactionId::new(),
            ParticipantId::new("user-1"),
            30,
        );
        assert_eq!(record.status, ClaimStatus::Reserved);
        assert!(!record.is_terminal());
        assert!(record.finalized_at.is_none());
    }

    #[test]
    fn terminal_states() {
        assert!(!ClaimStatus::Reserved.is_terminal());
        assert!(ClaimStatus::Committed.is_terminal());
        assert!(ClaimStatus::Released.is_terminal());
    }

    #[test]
    fn status_string_round_trip() {
        for status in [
            ClaimStatus::Reserved,
            ClaimStatus::Committed,
            ClaimStatus::Released,
        ] {
            assert_eq!(ClaimStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(ClaimStatus::parse("refunded"), None);
    }

    #[test]
    fn record_serializes_with_snake_case_status() {
        let record = ClaimTransaction::reserve(
            PoolId::new(),
            TransactionId::new(),
            ParticipantId::new("user-1"),
            30,
        );
        let json = serde_json::to_string(&record).unwrap_or_default();
        assert!(json.contains("\"reserved\""));
        assert!(json.contains("user-1"));
    }
}
