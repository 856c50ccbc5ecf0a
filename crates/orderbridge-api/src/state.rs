//! Shared application state threaded through all handlers.

use std::sync::Arc;

use sqlx::PgPool;

use orderbridge_core::config::AppConfig;
use orderbridge_database::repositories::channel_rule::ChannelRuleRepository;
use orderbridge_database::repositories::job::JobRepository;
use orderbridge_service::import::ImportService;
use orderbridge_service::order::OrderService;

/// Application state available to every request handler.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Database pool, used by the health check.
    pub db_pool: PgPool,
    /// Job repository for dashboard reads and re-enable.
    pub job_repo: Arc<JobRepository>,
    /// Channel rule repository for rule administration.
    pub channel_rule_repo: Arc<ChannelRuleRepository>,
    /// Import staging service.
    pub import_service: Arc<ImportService>,
    /// Order query service.
    pub order_service: Arc<OrderService>,
}
