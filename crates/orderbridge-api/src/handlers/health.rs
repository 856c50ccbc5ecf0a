//! Health check handler.

use axum::Json;
use axum::extract::State;

use crate::dto::response::ApiResponse;
use crate::error::ApiError;
use crate::state::AppState;

/// GET /api/health
pub async fn health(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let database = sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(&state.db_pool)
        .await
        .map(|v| v == 1)
        .unwrap_or(false);

    Ok(Json(ApiResponse::ok(serde_json::json!({
        "status": if database { "ok" } else { "degraded" },
        "database": database,
    }))))
}
