//! Channel rule repository implementation.

use sqlx::PgPool;

use orderbridge_core::error::{AppError, ErrorKind};
use orderbridge_core::result::AppResult;
use orderbridge_entity::channel::rule::ChannelRule;

/// Repository for per-channel workflow automation rules.
#[derive(Debug, Clone)]
pub struct ChannelRuleRepository {
    pool: PgPool,
}

impl ChannelRuleRepository {
    /// Create a new channel rule repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find the rule for a channel, if one is configured.
    pub async fn find_by_channel(&self, channel: &str) -> AppResult<Option<ChannelRule>> {
        sqlx::query_as::<_, ChannelRule>("SELECT * FROM channel_rules WHERE channel = $1")
            .bind(channel)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to find channel rule", e)
            })
    }

    /// List all configured rules.
    pub async fn find_all(&self) -> AppResult<Vec<ChannelRule>> {
        sqlx::query_as::<_, ChannelRule>("SELECT * FROM channel_rules ORDER BY channel ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to list channel rules", e)
            })
    }

    /// Create or update the rule for a channel.
    pub async fn upsert(
        &self,
        channel: &str,
        auto_invoice: bool,
        auto_ship: bool,
    ) -> AppResult<ChannelRule> {
        sqlx::query_as::<_, ChannelRule>(
            "INSERT INTO channel_rules (channel, auto_invoice, auto_ship) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (channel) DO UPDATE \
             SET auto_invoice = EXCLUDED.auto_invoice, auto_ship = EXCLUDED.auto_ship, \
             updated_at = NOW() \
             RETURNING *",
        )
        .bind(channel)
        .bind(auto_invoice)
        .bind(auto_ship)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to upsert channel rule", e))
    }
}
