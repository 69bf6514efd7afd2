//! Giveaway pool handlers: create and stats.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{CreateGiveawayRequest, CreateGiveawayResponse, StatsResponse};
use crate::app_state::AppState;
use crate::domain::PoolId;
use crate::error::{ErrorResponse, LedgerError};

/// `POST /giveaway` — Create a new giveaway pool.
///
/// # Errors
///
/// Returns [`LedgerError::InvalidArgument`] on invalid amounts.
#[utoipa::path(
    post,
    path = "/giveaway",
    tag = "Giveaway",
    summary = "Create a giveaway pool",
    description = "Creates a pool that distributes `totalAmount` in fixed shares of `perClaimAmount` and returns the scannable claim code for it.",
    request_body = CreateGiveawayRequest,
    responses(
        (status = 201, description = "Pool created successfully", body = CreateGiveawayResponse),
        (status = 400, description = "Invalid amounts", body = ErrorResponse),
    )
)]
pub async fn create_giveaway(
    State(state): State<AppState>,
    Json(req): Json<CreateGiveawayRequest>,
) -> Result<impl IntoResponse, LedgerError> {
    let (pool, claim_code) = state
        .ledger
        .create_pool(req.total_amount, req.per_claim_amount)
        .await?;

    let response = CreateGiveawayResponse {
        pool_id: pool.pool_id(),
        claim_code,
        total_amount: pool.total_amount(),
        per_claim_amount: pool.per_claim_amount(),
        created_at: pool.created_at(),
    };

    Ok((StatusCode::CREATED, Json(response)))
}

/// `GET /giveaway/:id/stats` — Aggregate pool statistics.
///
/// # Errors
///
/// Returns [`LedgerError::PoolNotFound`] if the pool does not exist.
#[utoipa::path(
    get,
    path = "/giveaway/{id}/stats",
    tag = "Giveaway",
    summary = "Get pool statistics",
    description = "Returns the pool's remaining balance plus counts derived from committed claims only.",
    params(
        ("id" = uuid::Uuid, Path, description = "Pool UUID"),
    ),
    responses(
        (status = 200, description = "Pool statistics", body = StatsResponse),
        (status = 404, description = "Pool not found", body = ErrorResponse),
    )
)]
pub async fn giveaway_stats(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, LedgerError> {
    let stats = state.stats.stats(PoolId::from_uuid(id)).await?;

    Ok(Json(StatsResponse {
        total_amount: stats.total_amount,
        remaining_amount: stats.remaining_amount,
        transactions_count: stats.committed_count,
        unique_users: stats.unique_participants,
    }))
}

/// Giveaway pool routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/giveaway", post(create_giveaway))
        .route("/giveaway/{id}/stats", get(giveaway_stats))
}
