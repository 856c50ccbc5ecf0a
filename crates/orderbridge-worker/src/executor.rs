//! Job executor — dispatches jobs to registered handlers.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use orderbridge_core::error::AppError;
use orderbridge_entity::job::model::Job;
use orderbridge_entity::job::status::JobKind;
use orderbridge_remote::error::RemoteError;

use crate::classifier::is_transient;

/// Error from job execution.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    /// Permanent failure — do not retry.
    #[error("permanent job failure: {0}")]
    Permanent(String),

    /// Transient failure — retry with backoff.
    #[error("transient job failure: {0}")]
    Transient(String),

    /// Infrastructure error of unknown outcome (database, serialization).
    #[error(transparent)]
    Internal(#[from] AppError),
}

impl HandlerError {
    /// Fold a remote failure into the retry decision via the classifier.
    pub fn from_remote(error: RemoteError) -> Self {
        if is_transient(&error) {
            Self::Transient(error.to_string())
        } else {
            Self::Permanent(error.to_string())
        }
    }

    /// Whether the runner should retry this failure.
    ///
    /// Internal errors are retryable: the outcome of the attempt is
    /// unknown, which classifies the same as a dropped connection.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Permanent(_))
    }
}

/// Trait for job handler implementations.
#[async_trait]
pub trait JobHandler: Send + Sync + std::fmt::Debug {
    /// The job kind this handler processes.
    fn kind(&self) -> JobKind;

    /// Execute the job.
    async fn execute(&self, job: &Job) -> Result<(), HandlerError>;
}

/// Dispatches jobs to the appropriate handler based on kind.
#[derive(Debug, Default)]
pub struct JobExecutor {
    /// Registered job handlers by kind.
    handlers: HashMap<JobKind, Arc<dyn JobHandler>>,
}

impl JobExecutor {
    /// Create a new job executor.
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a job handler.
    pub fn register(&mut self, handler: Arc<dyn JobHandler>) {
        let kind = handler.kind();
        info!(%kind, "Registered job handler");
        self.handlers.insert(kind, handler);
    }

    /// Execute a job by dispatching to the correct handler.
    pub async fn execute(&self, job: &Job) -> Result<(), HandlerError> {
        let handler = self.handlers.get(&job.kind).ok_or_else(|| {
            HandlerError::Permanent(format!("No handler registered for job kind '{}'", job.kind))
        })?;

        handler.execute(job).await
    }

    /// Check if a handler is registered for a job kind.
    pub fn has_handler(&self, kind: JobKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    /// The set of registered job kinds.
    pub fn registered_kinds(&self) -> Vec<JobKind> {
        self.handlers.keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_errors_map_through_the_classifier() {
        let transient = HandlerError::from_remote(RemoteError::status(503, "unavailable"));
        assert!(matches!(transient, HandlerError::Transient(_)));
        assert!(transient.is_retryable());

        let permanent = HandlerError::from_remote(RemoteError::status(404, "no such sku"));
        assert!(matches!(permanent, HandlerError::Permanent(_)));
        assert!(!permanent.is_retryable());
    }

    #[test]
    fn internal_errors_are_retryable() {
        let internal = HandlerError::Internal(AppError::database("connection reset"));
        assert!(internal.is_retryable());
    }
}
