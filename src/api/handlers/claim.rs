//! Claim submission handler.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};

use crate::api::dto::{ClaimRequest, ClaimResponse};
use crate::app_state::AppState;
use crate::domain::{ParticipantId, PoolId};
use crate::error::{ErrorResponse, LedgerError};

/// `POST /scan/:id` — Submit one claim against a pool.
///
/// # Errors
///
/// Returns [`LedgerError::PoolExhausted`] when the pool cannot cover
/// another share, [`LedgerError::DisbursementFailed`] /
/// [`LedgerError::DisbursementTimeout`] on gateway faults, and
/// [`LedgerError::PoolNotFound`] for an unknown pool.
#[utoipa::path(
    post,
    path = "/scan/{id}",
    tag = "Claims",
    summary = "Claim one share",
    description = "Atomically reserves one share for the participant, disburses it through the payment gateway, and commits the transaction. Clients may pass an `idempotencyKey` to make retries safe.",
    params(
        ("id" = uuid::Uuid, Path, description = "Pool UUID from the scanned claim code"),
    ),
    request_body = ClaimRequest,
    responses(
        (status = 200, description = "Share disbursed", body = ClaimResponse),
        (status = 400, description = "Giveaway has ended", body = ErrorResponse),
        (status = 404, description = "Giveaway not found", body = ErrorResponse),
        (status = 409, description = "Claim pending or pool frozen", body = ErrorResponse),
        (status = 500, description = "Transaction failed", body = ErrorResponse),
    )
)]
pub async fn scan(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
    Json(req): Json<ClaimRequest>,
) -> Result<impl IntoResponse, LedgerError> {
    if req.participant_id.trim().is_empty() {
        return Err(LedgerError::InvalidArgument(
            "participantId must not be empty".to_string(),
        ));
    }

    let receipt = state
        .ledger
        .submit_claim(
            PoolId::from_uuid(id),
            ParticipantId::new(req.participant_id),
            req.idempotency_key,
        )
        .await?;

    Ok(Json(ClaimResponse {
        success: true,
        amount: receipt.amount,
        transaction_id: receipt.transaction_id,
    }))
}

/// Claim submission routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/scan/{id}", post(scan))
}
