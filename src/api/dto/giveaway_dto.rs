//! Giveaway pool DTOs for create and stats operations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{ClaimCode, PoolId};

/// Request body for `POST /giveaway`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateGiveawayRequest {
    /// Total pool size in minor currency units.
    pub total_amount: u64,
    /// Share size disbursed per successful claim.
    pub per_claim_amount: u64,
}

/// Response body for `POST /giveaway` (201 Created).
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateGiveawayResponse {
    /// Unique pool identifier.
    pub pool_id: PoolId,
    /// Opaque scannable claim token encoding the pool id.
    pub claim_code: ClaimCode,
    /// Total pool size echoed from the request.
    pub total_amount: u64,
    /// Share size echoed from the request.
    pub per_claim_amount: u64,
    /// Server creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Response body for `GET /giveaway/{id}/stats`.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    /// Total pool size.
    pub total_amount: u64,
    /// Current remaining balance.
    pub remaining_amount: u64,
    /// Number of committed claim transactions.
    pub transactions_count: usize,
    /// Number of distinct participants with a committed claim.
    pub unique_users: usize,
}
