//! Route definitions for the OrderBridge HTTP API.
//!
//! All routes are organized by domain and mounted under `/api`. The
//! router receives `AppState` and passes it to all handlers via Axum's
//! `State` extractor.

use axum::{
    Router,
    routing::{get, post, put},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Build the complete Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .merge(health_routes())
        .merge(import_routes())
        .merge(order_routes())
        .merge(job_routes())
        .merge(channel_routes());

    Router::new()
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Liveness and database ping
fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health::health))
}

/// Import submission and progress
fn import_routes() -> Router<AppState> {
    Router::new()
        .route("/imports", post(handlers::imports::submit_import))
        .route("/imports/{id}", get(handlers::imports::get_import))
}

/// Order dashboard
fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/orders", get(handlers::orders::list_orders))
        .route("/orders/{id}", get(handlers::orders::get_order))
}

/// Job dashboard and operator re-enable
fn job_routes() -> Router<AppState> {
    Router::new()
        .route("/jobs", get(handlers::jobs::list_jobs))
        .route("/jobs/{id}", get(handlers::jobs::get_job))
        .route("/jobs/{id}/reenable", post(handlers::jobs::reenable_job))
}

/// Channel rule administration
fn channel_routes() -> Router<AppState> {
    Router::new()
        .route("/channels", get(handlers::channels::list_rules))
        .route("/channels/{channel}/rule", put(handlers::channels::upsert_rule))
}
