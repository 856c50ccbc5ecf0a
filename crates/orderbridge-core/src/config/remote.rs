//! Remote order system configuration.

use serde::{Deserialize, Serialize};

/// Remote order system (external commerce backend) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Base URL of the remote order API.
    pub base_url: String,
    /// Bearer token for API authentication.
    #[serde(default)]
    pub api_token: String,
    /// Request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
    /// Whether import validates stock against the remote inventory.
    #[serde(default = "default_true")]
    pub validate_stock: bool,
}

fn default_request_timeout() -> u64 {
    30
}

fn default_true() -> bool {
    true
}
