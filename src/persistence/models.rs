//! Database models for hydrating in-memory state on restart.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A pool row from the `pools` table.
///
/// Amounts are stored as `BIGINT`; the hydration path converts them back
/// to `u64` and rejects negative values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolRecord {
    /// Pool identifier.
    pub pool_id: Uuid,
    /// Fixed pool size in minor currency units.
    pub total_amount: i64,
    /// Fixed share size per claim.
    pub per_claim_amount: i64,
    /// Remaining balance as last mirrored.
    pub remaining_amount: i64,
    /// Whether the pool was frozen for audit.
    pub frozen: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}
