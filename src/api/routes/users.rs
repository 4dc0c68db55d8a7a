//! User account handlers.

use super::{AdjustCreditsRequest, CreateUserRequest};
use crate::api::AppState;
use crate::error::Result;
use crate::types::{Caller, UserId};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

/// POST /users - Create a user
#[utoipa::path(
    post,
    path = "/users",
    tag = "users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = crate::ledger::UserAccount),
        (status = 400, description = "Invalid or duplicate email, negative credits", body = crate::error::ApiError),
        (status = 403, description = "Admin access required", body = crate::error::ApiError)
    )
)]
pub async fn create_user(
    State(state): State<AppState>,
    caller: Caller,
    Json(request): Json<CreateUserRequest>,
) -> Result<impl IntoResponse> {
    let account = state
        .checker
        .create_user(&caller, &request.email, request.credits)
        .await?;

    Ok((StatusCode::CREATED, Json(account)))
}

/// POST /users/:id/credits - Adjust a user's credits
#[utoipa::path(
    post,
    path = "/users/{id}/credits",
    tag = "users",
    params(
        ("id" = i64, Path, description = "User ID")
    ),
    request_body = AdjustCreditsRequest,
    responses(
        (status = 200, description = "Updated account", body = crate::ledger::UserAccount),
        (status = 400, description = "Zero amount or balance would go negative", body = crate::error::ApiError),
        (status = 403, description = "Admin access required", body = crate::error::ApiError),
        (status = 404, description = "User not found", body = crate::error::ApiError)
    )
)]
pub async fn adjust_credits(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<i64>,
    Json(request): Json<AdjustCreditsRequest>,
) -> Result<impl IntoResponse> {
    let account = state
        .checker
        .adjust_credits(
            &caller,
            UserId(id),
            request.amount,
            request.description.as_deref(),
        )
        .await?;

    Ok(Json(account))
}
