//! Background worker configuration.

use serde::{Deserialize, Serialize};

/// Background job worker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Whether the worker is enabled.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Number of concurrent job processing tasks.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Maximum number of jobs claimed per poll.
    #[serde(default = "default_batch_size")]
    pub batch_size: i64,
    /// Interval in seconds between job queue polls.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,
    /// Base retry delay in seconds (grows linearly with attempts).
    #[serde(default = "default_retry_base_delay")]
    pub retry_base_delay_seconds: u64,
    /// Default maximum attempts for workflow jobs.
    #[serde(default = "default_max_attempts")]
    pub default_max_attempts: i32,
    /// Drain timeout in seconds when shutting down.
    #[serde(default = "default_drain_timeout")]
    pub drain_timeout_seconds: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            concurrency: default_concurrency(),
            batch_size: default_batch_size(),
            poll_interval_seconds: default_poll_interval(),
            retry_base_delay_seconds: default_retry_base_delay(),
            default_max_attempts: default_max_attempts(),
            drain_timeout_seconds: default_drain_timeout(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_concurrency() -> usize {
    4
}

fn default_batch_size() -> i64 {
    10
}

fn default_poll_interval() -> u64 {
    5
}

fn default_retry_base_delay() -> u64 {
    30
}

fn default_max_attempts() -> i32 {
    3
}

fn default_drain_timeout() -> u64 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_on_empty_section() {
        let config: WorkerConfig = serde_json::from_str("{}").unwrap();
        assert!(config.enabled);
        assert_eq!(config.concurrency, 4);
        assert_eq!(config.batch_size, 10);
        assert_eq!(config.poll_interval_seconds, 5);
        assert_eq!(config.retry_base_delay_seconds, 30);
        assert_eq!(config.default_max_attempts, 3);
    }
}
