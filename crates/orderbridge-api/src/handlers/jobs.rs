//! Job dashboard and operator handlers.

use axum::Json;
use axum::extract::{Path, Query, State};

use orderbridge_core::error::AppError;
use orderbridge_core::types::pagination::{PageRequest, PageResponse};
use orderbridge_entity::job::model::Job;

use crate::dto::request::JobListQuery;
use crate::dto::response::ApiResponse;
use crate::error::ApiError;
use crate::state::AppState;

/// GET /api/jobs
pub async fn list_jobs(
    State(state): State<AppState>,
    Query(query): Query<JobListQuery>,
) -> Result<Json<ApiResponse<PageResponse<Job>>>, ApiError> {
    let page = PageRequest::new(query.page.unwrap_or(1), query.page_size.unwrap_or(25));
    let jobs = state
        .job_repo
        .find_all(query.status, query.kind, &page)
        .await?;
    Ok(Json(ApiResponse::ok(jobs)))
}

/// GET /api/jobs/{id}
pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<i64>,
) -> Result<Json<ApiResponse<Job>>, ApiError> {
    let job = state
        .job_repo
        .find_by_id(job_id)
        .await?
        .ok_or_else(|| AppError::not_found("Job not found"))?;
    Ok(Json(ApiResponse::ok(job)))
}

/// POST /api/jobs/{id}/reenable
///
/// The only supported manual-intervention path: resets a terminal job to
/// pending with a fresh attempt budget.
pub async fn reenable_job(
    State(state): State<AppState>,
    Path(job_id): Path<i64>,
) -> Result<Json<ApiResponse<Job>>, ApiError> {
    let job = state
        .job_repo
        .find_by_id(job_id)
        .await?
        .ok_or_else(|| AppError::not_found("Job not found"))?;

    if !state.job_repo.reenable(job.id).await? {
        return Err(AppError::conflict(
            "Job is not in a terminal state and cannot be re-enabled",
        )
        .into());
    }

    let job = state
        .job_repo
        .find_by_id(job.id)
        .await?
        .ok_or_else(|| AppError::not_found("Job not found"))?;
    Ok(Json(ApiResponse::ok(job)))
}
