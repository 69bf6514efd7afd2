//! Claim submission DTOs.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::TransactionId;

/// Request body for `POST /scan/{poolId}`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClaimRequest {
    /// Opaque participant identifier supplied by the claim client.
    pub participant_id: String,
    /// Optional client-chosen idempotency key. Resubmitting with the
    /// same key replays the recorded outcome instead of claiming again.
    #[serde(default)]
    pub idempotency_key: Option<TransactionId>,
}

/// Response body for a successful claim.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClaimResponse {
    /// Always `true` on this path; failures use the error body.
    pub success: bool,
    /// Disbursed amount in minor currency units.
    pub amount: u64,
    /// The claim's transaction identifier.
    pub transaction_id: TransactionId,
}
