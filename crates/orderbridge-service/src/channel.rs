//! Channel policy resolution — decides which workflow steps run
//! automatically for a sales channel.

use std::sync::Arc;

use tracing::debug;

use orderbridge_core::error::AppError;
use orderbridge_database::repositories::channel_rule::ChannelRuleRepository;
use orderbridge_entity::channel::rule::ChannelPolicy;

/// Resolves the automation policy for a sales channel.
#[derive(Debug, Clone)]
pub struct ChannelPolicyService {
    /// Channel rule repository.
    rule_repo: Arc<ChannelRuleRepository>,
}

impl ChannelPolicyService {
    /// Create a new channel policy service.
    pub fn new(rule_repo: Arc<ChannelRuleRepository>) -> Self {
        Self { rule_repo }
    }

    /// Resolve the policy for `channel`.
    ///
    /// Channels without a configured rule fall back to the default policy
    /// (no automation), so unknown channels never auto-advance the
    /// workflow.
    pub async fn resolve(&self, channel: &str) -> Result<ChannelPolicy, AppError> {
        match self.rule_repo.find_by_channel(channel).await? {
            Some(rule) => Ok(ChannelPolicy::from(&rule)),
            None => {
                debug!(channel, "No channel rule configured, using default policy");
                Ok(ChannelPolicy::default())
            }
        }
    }
}
