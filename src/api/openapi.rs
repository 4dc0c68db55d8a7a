//! OpenAPI documentation and schema generation
//!
//! This module defines the OpenAPI specification for the index-checker REST
//! API using utoipa for compile-time spec generation.

use utoipa::OpenApi;

/// OpenAPI documentation for the index-checker REST API
///
/// The spec can be accessed via:
/// - `/openapi.json` - JSON format OpenAPI specification
/// - `/swagger-ui` - Interactive Swagger UI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "index-checker REST API",
        version = "0.1.0",
        description = "Batch search-index checks for URL lists, metered by per-user credits and a pool of provider API keys",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server")
    ),
    paths(
        // Jobs
        crate::api::routes::submit_job,
        crate::api::routes::list_jobs,
        crate::api::routes::get_job,
        crate::api::routes::download_results,

        // Credentials
        crate::api::routes::credential_status,
        crate::api::routes::refresh_credentials,
        crate::api::routes::add_credential,
        crate::api::routes::remove_credential,

        // Users
        crate::api::routes::create_user,
        crate::api::routes::adjust_credits,

        // System
        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
    ),
    components(schemas(
        // Core types from types.rs
        crate::types::JobId,
        crate::types::UserId,
        crate::types::CredentialId,
        crate::types::Job,
        crate::types::JobStatus,
        crate::types::FinalStats,
        crate::types::CredentialStatus,
        crate::types::CredentialInfo,
        crate::types::PoolStatus,
        crate::types::HealthReport,

        // Service responses
        crate::checker::Submission,
        crate::checker::CredentialOverview,
        crate::checker::AdminOverview,
        crate::checker::UserOverview,
        crate::ledger::UserAccount,

        // API request/response types from routes
        crate::api::routes::SubmitJobRequest,
        crate::api::routes::AddCredentialRequest,
        crate::api::routes::CredentialCreated,
        crate::api::routes::CreateUserRequest,
        crate::api::routes::AdjustCreditsRequest,

        // Error types from error.rs
        crate::error::ApiError,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "jobs", description = "Jobs - Submit URL lists, poll progress, download result tables"),
        (name = "credentials", description = "Credentials - Provider API key pool status and administration"),
        (name = "users", description = "Users - Accounts and credit balances"),
        (name = "system", description = "System endpoints - Health checks and OpenAPI spec"),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Adds the two identity headers as security schemes
struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};

        if let Some(components) = &mut openapi.components {
            components.add_security_scheme(
                "admin_key",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("X-Api-Key"))),
            );
            components.add_security_scheme(
                "user_id",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("X-User-Id"))),
            );
        }
    }
}
