//! Channel rule administration handlers.

use axum::Json;
use axum::extract::{Path, State};

use orderbridge_entity::channel::rule::ChannelRule;

use crate::dto::request::ChannelRuleRequest;
use crate::dto::response::ApiResponse;
use crate::error::ApiError;
use crate::state::AppState;

/// GET /api/channels
pub async fn list_rules(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<ChannelRule>>>, ApiError> {
    let rules = state.channel_rule_repo.find_all().await?;
    Ok(Json(ApiResponse::ok(rules)))
}

/// PUT /api/channels/{channel}/rule
pub async fn upsert_rule(
    State(state): State<AppState>,
    Path(channel): Path<String>,
    Json(request): Json<ChannelRuleRequest>,
) -> Result<Json<ApiResponse<ChannelRule>>, ApiError> {
    let rule = state
        .channel_rule_repo
        .upsert(&channel, request.auto_invoice, request.auto_ship)
        .await?;
    Ok(Json(ApiResponse::ok(rule)))
}
