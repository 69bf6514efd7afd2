//! Ledger error types with HTTP status code mapping.
//!
//! [`LedgerError`] is the central error type for the service. Each variant
//! maps to a specific HTTP status code and a flat JSON error body of the
//! form `{"error": "<message>"}` — the wire shape claim clients expect.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Flat JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {"error": "Giveaway has ended"}
/// ```
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    /// Human-readable error message.
    pub error: String,
}

/// Server-side error enum with HTTP status code mapping.
///
/// Client-caused conditions (`InvalidArgument`, `PoolNotFound`,
/// `PoolExhausted`) map to 4xx; external disbursement faults and internal
/// failures map to 5xx. `Inconsistent` and `ClaimPending` map to 409 —
/// the request conflicts with ledger state that must settle first.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// Pool with the given ID was not found.
    #[error("pool not found: {0}")]
    PoolNotFound(uuid::Uuid),

    /// Request validation failed (bad creation parameters, malformed key).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The pool's remaining balance cannot cover another share.
    #[error("pool exhausted")]
    PoolExhausted,

    /// The disbursement gateway reported a definitive failure.
    #[error("disbursement failed for transaction {0}")]
    DisbursementFailed(uuid::Uuid),

    /// The disbursement gateway did not answer within the configured
    /// timeout; the claim stays reserved pending reconciliation.
    #[error("disbursement timed out for transaction {0}")]
    DisbursementTimeout(uuid::Uuid),

    /// A claim with this idempotency key is still in flight.
    #[error("claim {0} is still being processed")]
    ClaimPending(uuid::Uuid),

    /// Ledger state failed an accounting check; the pool is frozen for
    /// manual audit and rejects further claims.
    #[error("inconsistent ledger state: {0}")]
    Inconsistent(String),

    /// Persistence layer failure.
    #[error("persistence error: {0}")]
    PersistenceError(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl LedgerError {
    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidArgument(_) | Self::PoolExhausted => StatusCode::BAD_REQUEST,
            Self::PoolNotFound(_) => StatusCode::NOT_FOUND,
            Self::ClaimPending(_) | Self::Inconsistent(_) => StatusCode::CONFLICT,
            Self::DisbursementFailed(_)
            | Self::DisbursementTimeout(_)
            | Self::PersistenceError(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the message exposed to clients.
    ///
    /// Disbursement faults collapse to `"Transaction failed"` and unknown
    /// pools to `"Giveaway not found"` regardless of internal detail, so
    /// the wire contract stays stable while logs keep the full story.
    #[must_use]
    pub fn client_message(&self) -> String {
        match self {
            Self::PoolNotFound(_) => "Giveaway not found".to_string(),
            Self::PoolExhausted => "Giveaway has ended".to_string(),
            Self::DisbursementFailed(_) | Self::DisbursementTimeout(_) => {
                "Transaction failed".to_string()
            }
            Self::ClaimPending(_) => "Claim is still being processed".to_string(),
            Self::Inconsistent(_) => "Giveaway is locked pending audit".to_string(),
            Self::PersistenceError(_) | Self::Internal(_) => "Internal server error".to_string(),
            Self::InvalidArgument(msg) => msg.clone(),
        }
    }
}

impl IntoResponse for LedgerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = ErrorResponse {
            error: self.client_message(),
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn exhausted_maps_to_bad_request() {
        let err = LedgerError::PoolExhausted;
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.client_message(), "Giveaway has ended");
    }

    #[test]
    fn unknown_pool_maps_to_not_found() {
        let err = LedgerError::PoolNotFound(uuid::Uuid::new_v4());
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.client_message(), "Giveaway not found");
    }

    #[test]
    fn disbursement_faults_share_client_message() {
        let id = uuid::Uuid::new_v4();
        let failed = LedgerError::DisbursementFailed(id);
        let timed_out = LedgerError::DisbursementTimeout(id);
        assert_eq!(failed.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(timed_out.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(failed.client_message(), "Transaction failed");
        assert_eq!(timed_out.client_message(), "Transaction failed");
    }

    #[test]
    fn invalid_argument_surfaces_detail() {
        let err = LedgerError::InvalidArgument("totalAmount must be positive".to_string());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.client_message(), "totalAmount must be positive");
    }

    #[test]
    fn inconsistent_is_conflict() {
        let err = LedgerError::Inconsistent("balance drift".to_string());
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
    }
}
