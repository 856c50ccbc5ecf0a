//! Import submission and progress handlers.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use validator::Validate;

use orderbridge_core::error::AppError;
use orderbridge_entity::import::batch::ImportBatch;

use crate::dto::request::ImportRequest;
use crate::dto::response::ApiResponse;
use crate::error::ApiError;
use crate::state::AppState;

/// POST /api/imports
pub async fn submit_import(
    State(state): State<AppState>,
    Json(request): Json<ImportRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ImportBatch>>), ApiError> {
    request
        .validate()
        .map_err(|e| AppError::validation(e.to_string()))?;

    let batch = state
        .import_service
        .stage_batch(&request.source_name, request.rows)
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(batch))))
}

/// GET /api/imports/{id}
pub async fn get_import(
    State(state): State<AppState>,
    Path(batch_id): Path<i64>,
) -> Result<Json<ApiResponse<ImportBatch>>, ApiError> {
    let batch = state.import_service.batch_progress(batch_id).await?;
    Ok(Json(ApiResponse::ok(batch)))
}
