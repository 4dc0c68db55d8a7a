//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`jobs`] — Job submission, polling and result download
//! - [`credentials`] — Credential pool status and administration
//! - [`users`] — User accounts and credits
//! - [`system`] — Health and OpenAPI

use serde::{Deserialize, Serialize};

mod credentials;
mod jobs;
mod system;
mod users;

// Re-export all handlers so `routes::function_name` works from the router
pub use credentials::*;
pub use jobs::*;
pub use system::*;
pub use users::*;

// ============================================================================
// Request/Response Types (shared across handlers)
// ============================================================================

/// Request body for POST /jobs
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct SubmitJobRequest {
    /// Job name; also names the result file
    pub project_name: String,
    /// Newline-separated URLs; blank lines are ignored
    pub url_list: String,
}

/// Request body for POST /credentials
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct AddCredentialRequest {
    /// Provider API key
    pub key_value: String,
    /// Display name (defaults to "API Key N")
    #[serde(default)]
    pub name: String,
}

/// Response body for POST /credentials
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct CredentialCreated {
    /// ID of the new credential record
    pub id: crate::types::CredentialId,
}

/// Request body for POST /users
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct CreateUserRequest {
    /// Unique email address
    pub email: String,
    /// Opening balance (default: 0)
    #[serde(default)]
    pub credits: i64,
}

/// Request body for POST /users/:id/credits
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct AdjustCreditsRequest {
    /// Credits to add; negative to remove
    pub amount: i64,
    /// Ledger note (default: "Admin adjustment")
    pub description: Option<String>,
}
