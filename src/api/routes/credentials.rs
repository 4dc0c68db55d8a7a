//! Credential pool handlers.

use super::{AddCredentialRequest, CredentialCreated};
use crate::api::AppState;
use crate::error::Result;
use crate::types::{Caller, CredentialId};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

/// GET /credentials/status - Pool snapshot for admins, own balance for users
#[utoipa::path(
    get,
    path = "/credentials/status",
    tag = "credentials",
    responses(
        (status = 200, description = "Admin: pool snapshot and job count. User: credit balance", body = crate::checker::CredentialOverview),
        (status = 401, description = "No caller identity", body = crate::error::ApiError),
        (status = 404, description = "Unknown user", body = crate::error::ApiError)
    )
)]
pub async fn credential_status(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<impl IntoResponse> {
    let overview = state.checker.credential_overview(&caller).await?;
    Ok(Json(overview))
}

/// POST /credentials/refresh - Re-read every balance from the provider
#[utoipa::path(
    post,
    path = "/credentials/refresh",
    tag = "credentials",
    responses(
        (status = 200, description = "Pool snapshot after the refresh", body = crate::types::PoolStatus),
        (status = 403, description = "Admin access required", body = crate::error::ApiError)
    )
)]
pub async fn refresh_credentials(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<impl IntoResponse> {
    let status = state.checker.refresh_credentials(&caller).await?;
    Ok(Json(status))
}

/// POST /credentials - Add a credential
#[utoipa::path(
    post,
    path = "/credentials",
    tag = "credentials",
    request_body = AddCredentialRequest,
    responses(
        (status = 201, description = "Credential added to the pool", body = CredentialCreated),
        (status = 400, description = "Blank or duplicate key", body = crate::error::ApiError),
        (status = 403, description = "Admin access required", body = crate::error::ApiError)
    )
)]
pub async fn add_credential(
    State(state): State<AppState>,
    caller: Caller,
    Json(request): Json<AddCredentialRequest>,
) -> Result<impl IntoResponse> {
    let id = state
        .checker
        .add_credential(&caller, &request.key_value, &request.name)
        .await?;

    Ok((StatusCode::CREATED, Json(CredentialCreated { id })))
}

/// DELETE /credentials/:id - Remove a credential
#[utoipa::path(
    delete,
    path = "/credentials/{id}",
    tag = "credentials",
    params(
        ("id" = i64, Path, description = "Credential ID")
    ),
    responses(
        (status = 204, description = "Credential removed from the pool"),
        (status = 403, description = "Admin access required", body = crate::error::ApiError),
        (status = 404, description = "Credential not found", body = crate::error::ApiError)
    )
)]
pub async fn remove_credential(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<i64>,
) -> Result<StatusCode> {
    state
        .checker
        .remove_credential(&caller, CredentialId(id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
