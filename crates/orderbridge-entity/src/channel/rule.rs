//! Channel rule entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Per-channel workflow automation rule.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ChannelRule {
    /// Unique rule identifier.
    pub id: i64,
    /// Sales channel name (unique).
    pub channel: String,
    /// Whether invoicing is triggered automatically after sync.
    pub auto_invoice: bool,
    /// Whether shipping is triggered automatically after invoicing.
    pub auto_ship: bool,
    /// When the rule was created.
    pub created_at: DateTime<Utc>,
    /// When the rule was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Resolved automation policy for a channel.
///
/// The default (no automation) is what unknown channels resolve to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelPolicy {
    /// Enqueue an invoice job after a successful sync.
    pub auto_invoice: bool,
    /// Enqueue a ship job after a successful invoice.
    pub auto_ship: bool,
}

impl From<&ChannelRule> for ChannelPolicy {
    fn from(rule: &ChannelRule) -> Self {
        Self {
            auto_invoice: rule.auto_invoice,
            auto_ship: rule.auto_ship,
        }
    }
}
