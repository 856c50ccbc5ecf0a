//! Transient-error classification for remote failures.
//!
//! Decides whether a remote error is worth retrying. The carve-out for
//! 4xx responses exists because the remote system surfaces its internal
//! lock contention as a client-error status.

use orderbridge_remote::error::RemoteError;

/// Message substrings that mark a 4xx response as remote-store contention.
const CONTENTION_PATTERNS: &[&str] = &[
    "deadlock",
    "lock wait timeout",
    "serialization failure",
    "could not save source item",
    "could not be saved",
];

/// Classify a remote error as transient (retryable) or permanent.
///
/// - No response received → transient.
/// - 408 (request timeout) and 429 (rate limit) → transient.
/// - Any 5xx → transient.
/// - Other statuses → transient only when the message matches a known
///   contention pattern; otherwise the request itself is invalid and
///   retrying will not help.
pub fn is_transient(error: &RemoteError) -> bool {
    match error.status {
        None => true,
        Some(408) | Some(429) => true,
        Some(status) if (500..600).contains(&status) => true,
        Some(_) => {
            let message = error.message.to_lowercase();
            CONTENTION_PATTERNS
                .iter()
                .any(|pattern| message.contains(pattern))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_are_transient() {
        assert!(is_transient(&RemoteError::status(503, "Service Unavailable")));
        assert!(is_transient(&RemoteError::status(500, "Internal Server Error")));
    }

    #[test]
    fn rate_limit_and_timeout_are_transient() {
        assert!(is_transient(&RemoteError::status(429, "Too Many Requests")));
        assert!(is_transient(&RemoteError::status(408, "Request Timeout")));
    }

    #[test]
    fn plain_client_errors_are_permanent() {
        assert!(!is_transient(&RemoteError::status(404, "Not Found")));
        assert!(!is_transient(&RemoteError::status(400, "Invalid sku")));
        assert!(!is_transient(&RemoteError::status(422, "Missing address")));
    }

    #[test]
    fn contention_disguised_as_client_error_is_transient() {
        assert!(is_transient(&RemoteError::status(
            400,
            "Deadlock found when trying to get lock; try restarting transaction"
        )));
        assert!(is_transient(&RemoteError::status(
            400,
            "Could not save source item with id 99"
        )));
        assert!(is_transient(&RemoteError::status(
            400,
            "The order could not be saved"
        )));
        assert!(is_transient(&RemoteError::status(
            409,
            "serialization failure during commit"
        )));
    }

    #[test]
    fn network_errors_are_transient() {
        assert!(is_transient(&RemoteError::network("connection refused")));
    }
}
