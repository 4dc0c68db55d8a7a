//! REST API server module
//!
//! Exposes job submission and polling, result download, credential and user
//! administration, and health over JSON. Callers are identified per request
//! (see [`auth`]); the service does no authentication of its own.

use crate::checker::IndexChecker;
use crate::{Config, Result};
use axum::{
    Router,
    http::HeaderValue,
    routing::{delete, get, post},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod auth;
pub mod error_response;
pub mod openapi;
pub mod routes;
pub mod state;

pub use openapi::ApiDoc;
pub use state::AppState;

/// Create the API router with all route definitions
///
/// # Routes
///
/// ## Jobs
/// - `POST /jobs` - Submit a job
/// - `GET /jobs` - List visible jobs, most recent first
/// - `GET /jobs/:id` - Get one job
/// - `GET /jobs/:id/download` - Download the result table
///
/// ## Credentials
/// - `GET /credentials/status` - Pool snapshot (admin) or own balance (user)
/// - `POST /credentials/refresh` - Refresh every balance (admin)
/// - `POST /credentials` - Add a credential (admin)
/// - `DELETE /credentials/:id` - Remove a credential (admin)
///
/// ## Users
/// - `POST /users` - Create a user (admin)
/// - `POST /users/:id/credits` - Adjust a user's credits (admin)
///
/// ## System
/// - `GET /health` - Health check
/// - `GET /openapi.json` - OpenAPI specification
/// - `GET /swagger-ui` - Interactive Swagger UI documentation (if enabled)
pub fn create_router(checker: Arc<IndexChecker>, config: Arc<Config>) -> Router {
    let state = AppState::new(checker, config.clone());

    let router = Router::new()
        // Jobs
        .route("/jobs", post(routes::submit_job))
        .route("/jobs", get(routes::list_jobs))
        .route("/jobs/:id", get(routes::get_job))
        .route("/jobs/:id/download", get(routes::download_results))
        // Credentials
        .route("/credentials", post(routes::add_credential))
        .route("/credentials/:id", delete(routes::remove_credential))
        .route("/credentials/status", get(routes::credential_status))
        .route("/credentials/refresh", post(routes::refresh_credentials))
        // Users
        .route("/users", post(routes::create_user))
        .route("/users/:id/credits", post(routes::adjust_credits))
        // System
        .route("/health", get(routes::health_check))
        .route("/openapi.json", get(routes::openapi_spec));

    // SwaggerUi serves its own copy of the document; it must not collide with /openapi.json
    let router = if config.api.swagger_ui {
        router.merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
    } else {
        router
    };

    let router = router
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    if config.api.cors_enabled {
        let cors = build_cors_layer(&config.api.cors_origins);
        router.layer(cors)
    } else {
        router
    }
}

/// Build a CORS layer based on configured origins ("*" allows any origin)
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allow_any = origins.iter().any(|o| o == "*");

    if allow_any || origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Start the API server on the configured bind address.
///
/// Runs until the checker begins shutting down, then drains open connections
/// and returns.
///
/// # Example
///
/// ```no_run
/// use index_checker::{Config, IndexChecker};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Arc::new(Config::default());
/// let checker = Arc::new(IndexChecker::new((*config).clone()).await?);
///
/// index_checker::api::start_api_server(checker, config).await?;
/// # Ok(())
/// # }
/// ```
pub async fn start_api_server(checker: Arc<IndexChecker>, config: Arc<Config>) -> Result<()> {
    let bind_address = config.api.bind_address;

    tracing::info!(address = %bind_address, "Starting API server");

    let app = create_router(checker.clone(), config);

    let listener = TcpListener::bind(bind_address)
        .await
        .map_err(crate::error::Error::Io)?;

    tracing::info!(address = %bind_address, "API server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { checker.shutdown_signal().await })
        .await
        .map_err(|e| crate::error::Error::ApiServerError(e.to_string()))?;

    tracing::info!("API server stopped");
    Ok(())
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
