//! System handlers: health and OpenAPI.

use crate::api::AppState;
use axum::{Json, extract::State, response::IntoResponse};

/// GET /health - Health check (no identity required)
#[utoipa::path(
    get,
    path = "/health",
    tag = "system",
    responses(
        (status = 200, description = "Service is up", body = crate::types::HealthReport)
    )
)]
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.checker.health().await)
}

/// GET /openapi.json - OpenAPI specification
#[utoipa::path(
    get,
    path = "/openapi.json",
    tag = "system",
    responses(
        (status = 200, description = "OpenAPI specification in JSON format")
    )
)]
pub async fn openapi_spec() -> impl IntoResponse {
    use crate::api::openapi::ApiDoc;
    use utoipa::OpenApi;

    Json(ApiDoc::openapi())
}
