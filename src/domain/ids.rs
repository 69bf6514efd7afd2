//! Type-safe identifiers for pools, claim transactions, and participants.
//!
//! [`PoolId`] and [`TransactionId`] are newtype wrappers around
//! [`uuid::Uuid`] (v4) so the two identifier spaces cannot be confused;
//! [`ParticipantId`] wraps the opaque participant string supplied by the
//! claim client.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Unique identifier for a giveaway pool.
///
/// Wraps a UUID v4. Generated once at pool creation time and immutable
/// thereafter. Used as the dictionary key in
/// [`super::PoolRegistry`](crate::domain::PoolRegistry) and as the primary
/// key of persisted pool records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(transparent)]
pub struct PoolId(uuid::Uuid);

impl PoolId {
    /// Creates a new random `PoolId` (UUID v4).
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Creates a `PoolId` from an existing [`uuid::Uuid`].
    #[must_use]
    pub const fn from_uuid(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner [`uuid::Uuid`].
    #[must_use]
    pub const fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }
}

impl Default for PoolId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<uuid::Uuid> for PoolId {
    fn from(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }
}

impl From<PoolId> for uuid::Uuid {
    fn from(id: PoolId) -> Self {
        id.0
    }
}

/// Unique identifier for a single claim attempt.
///
/// Generated per attempt (UUID v4), or supplied by the client as an
/// idempotency key. A claim transaction is identified by the pair
/// `(PoolId, TransactionId)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(transparent)]
pub struct TransactionId(uuid::Uuid);

impl TransactionId {
    /// Creates a new random `TransactionId` (UUID v4).
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Creates a `TransactionId` from an existing [`uuid::Uuid`].
    #[must_use]
    pub const fn from_uuid(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner [`uuid::Uuid`].
    #[must_use]
    pub const fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<uuid::Uuid> for TransactionId {
    fn from(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }
}

impl From<TransactionId> for uuid::Uuid {
    fn from(id: TransactionId) -> Self {
        id.0
    }
}

/// Opaque identifier of a claiming participant.
///
/// The ledger never interprets the contents — it is whatever the claim
/// client sends (a wallet handle, a device id, a phone-linked account).
/// Participants are deliberately *not* deduplicated per pool.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(transparent)]
pub struct ParticipantId(String);

impl ParticipantId {
    /// Wraps a raw participant string.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ParticipantId {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

impl From<&str> for ParticipantId {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}
