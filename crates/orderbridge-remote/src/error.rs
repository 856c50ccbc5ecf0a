//! Remote order system error type.

/// An error returned by the remote order system.
///
/// `status` is the HTTP status code of the remote response; `None` means
/// no response was received at all (DNS, connect, timeout, TLS). This is
/// exactly the shape the transient-error classifier inspects.
#[derive(Debug, Clone)]
pub struct RemoteError {
    /// HTTP status code, when a response was received.
    pub status: Option<u16>,
    /// Remote error message (or transport error description).
    pub message: String,
}

impl RemoteError {
    /// A failure with an HTTP status code from the remote.
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
        }
    }

    /// A network-level failure where no response was received.
    pub fn network(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for RemoteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status {
            Some(status) => write!(f, "remote error (status {status}): {}", self.message),
            None => write!(f, "remote network error: {}", self.message),
        }
    }
}

impl std::error::Error for RemoteError {}
