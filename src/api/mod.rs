//! REST API layer: route handlers, DTOs, and router composition.
//!
//! Endpoints are mounted at the root to preserve the wire contract
//! claim clients already use (`/giveaway`, `/scan/{id}`). With the
//! `swagger-ui` feature (default) the OpenAPI document is served at
//! `/api-docs/openapi.json` with an interactive UI at `/swagger-ui`.

pub mod dto;
pub mod handlers;

use axum::Router;

use crate::app_state::AppState;

/// OpenAPI document assembled from the annotated handlers.
#[cfg(feature = "swagger-ui")]
#[derive(utoipa::OpenApi)]
#[openapi(
    paths(
        handlers::giveaway::create_giveaway,
        handlers::giveaway::giveaway_stats,
        handlers::claim::scan,
        handlers::system::health_handler,
    ),
    components(schemas(
        dto::CreateGiveawayRequest,
        dto::CreateGiveawayResponse,
        dto::StatsResponse,
        dto::ClaimRequest,
        dto::ClaimResponse,
        crate::error::ErrorResponse,
        handlers::system::HealthResponse,
    )),
    tags(
        (name = "Giveaway", description = "Pool creation and statistics"),
        (name = "Claims", description = "Share claims against a pool"),
        (name = "System", description = "Service health"),
    )
)]
struct ApiDoc;

/// Builds the complete API router with all REST endpoints.
pub fn build_router() -> Router<AppState> {
    let router = Router::new()
        .merge(handlers::routes())
        .merge(handlers::system::routes());

    #[cfg(feature = "swagger-ui")]
    let router = router.merge(
        utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
            .url("/api-docs/openapi.json", <ApiDoc as utoipa::OpenApi>::openapi()),
    );

    router
}
