//! Job handlers.

use super::SubmitJobRequest;
use crate::api::AppState;
use crate::error::{Error, Result};
use crate::types::{Caller, JobId};
use axum::{
    Json,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};

/// POST /jobs - Submit a job
#[utoipa::path(
    post,
    path = "/jobs",
    tag = "jobs",
    request_body = SubmitJobRequest,
    responses(
        (status = 202, description = "Job accepted and started", body = crate::checker::Submission),
        (status = 400, description = "Blank project name or no URLs", body = crate::error::ApiError),
        (status = 401, description = "No caller identity", body = crate::error::ApiError),
        (status = 402, description = "Credits do not cover the job; details carry the job ID", body = crate::error::ApiError),
        (status = 503, description = "Shutting down", body = crate::error::ApiError)
    )
)]
pub async fn submit_job(
    State(state): State<AppState>,
    caller: Caller,
    Json(request): Json<SubmitJobRequest>,
) -> Result<impl IntoResponse> {
    let submission = state
        .checker
        .submit(&caller, &request.project_name, &request.url_list)
        .await?;

    Ok((StatusCode::ACCEPTED, Json(submission)))
}

/// GET /jobs - List jobs visible to the caller
#[utoipa::path(
    get,
    path = "/jobs",
    tag = "jobs",
    responses(
        (status = 200, description = "Jobs, most recent first", body = Vec<crate::types::Job>),
        (status = 401, description = "No caller identity", body = crate::error::ApiError)
    )
)]
pub async fn list_jobs(State(state): State<AppState>, caller: Caller) -> impl IntoResponse {
    Json(state.checker.list_jobs(&caller).await)
}

/// GET /jobs/:id - Get one job
#[utoipa::path(
    get,
    path = "/jobs/{id}",
    tag = "jobs",
    params(
        ("id" = i64, Path, description = "Job ID")
    ),
    responses(
        (status = 200, description = "Job snapshot", body = crate::types::Job),
        (status = 403, description = "Job belongs to another user", body = crate::error::ApiError),
        (status = 404, description = "Job not found", body = crate::error::ApiError)
    )
)]
pub async fn get_job(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    let job = state.checker.get_job(&caller, JobId(id)).await?;
    Ok(Json(job))
}

/// GET /jobs/:id/download - Download the result table
#[utoipa::path(
    get,
    path = "/jobs/{id}/download",
    tag = "jobs",
    params(
        ("id" = i64, Path, description = "Job ID")
    ),
    responses(
        (status = 200, description = "CSV result table", content_type = "text/csv"),
        (status = 403, description = "Job belongs to another user", body = crate::error::ApiError),
        (status = 404, description = "Job not done or file missing", body = crate::error::ApiError)
    )
)]
pub async fn download_results(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<i64>,
) -> Result<Response> {
    let (filename, path) = state.checker.result_file(&caller, JobId(id)).await?;

    let contents = tokio::fs::read(&path).await.map_err(|e| {
        tracing::error!(job_id = id, path = %path.display(), error = %e, "failed to read result file");
        Error::NotFound(format!("results for job {}", id))
    })?;

    let disposition = format!("attachment; filename=\"{}\"", filename.replace('"', "_"));
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        contents,
    )
        .into_response())
}
