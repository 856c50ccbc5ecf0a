//! Job runner — turns a single handler outcome into a job state
//! transition.
//!
//! The runner never retries in-process: a transient failure is written
//! back as a future-dated retry and picked up by a later claim, so other
//! jobs get fair access to the concurrency pool between attempts.

use std::sync::Arc;

use futures::FutureExt;
use tracing::{error, info, warn};

use orderbridge_entity::job::model::Job;

use crate::executor::{HandlerError, JobExecutor};
use crate::retry::RetryPolicy;
use crate::store::JobStore;

/// Executes one claimed job and drives the resulting state transition.
#[derive(Debug)]
pub struct JobRunner {
    /// Job store for state transitions.
    store: Arc<dyn JobStore>,
    /// Handler dispatch.
    executor: Arc<JobExecutor>,
    /// Backoff policy for transient failures.
    retry: RetryPolicy,
}

impl JobRunner {
    /// Create a new job runner.
    pub fn new(store: Arc<dyn JobStore>, executor: Arc<JobExecutor>, retry: RetryPolicy) -> Self {
        Self {
            store,
            executor,
            retry,
        }
    }

    /// Run a claimed job to its next state: done, retry, or failed.
    ///
    /// A panicking handler is contained here and folded into the
    /// transient path; nothing escapes to the worker loop.
    pub async fn run(&self, job: &Job) {
        info!(
            job_id = job.id,
            kind = %job.kind,
            attempt = job.attempts,
            max_attempts = job.max_attempts,
            "Executing job"
        );

        let result = match std::panic::AssertUnwindSafe(self.executor.execute(job))
            .catch_unwind()
            .await
        {
            Ok(result) => result,
            Err(panic) => {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| (*s).to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                Err(HandlerError::Transient(format!(
                    "handler panicked: {message}"
                )))
            }
        };

        match result {
            Ok(()) => {
                if let Err(e) = self.store.mark_done(job.id).await {
                    error!(job_id = job.id, error = %e, "Failed to mark job done");
                    return;
                }
                info!(job_id = job.id, kind = %job.kind, "Job completed");
            }
            Err(err) => self.settle_failure(job, err).await,
        }
    }

    /// Write back the failure outcome: permanent, exhausted, or retry.
    async fn settle_failure(&self, job: &Job, err: HandlerError) {
        let message = err.to_string();

        if !err.is_retryable() {
            warn!(job_id = job.id, error = %message, "Job failed permanently");
            if let Err(e) = self.store.mark_failed(job.id, &message).await {
                error!(job_id = job.id, error = %e, "Failed to mark job failed");
            }
            return;
        }

        if job.retries_exhausted() {
            warn!(
                job_id = job.id,
                attempts = job.attempts,
                error = %message,
                "Job failed transiently with retries exhausted"
            );
            if let Err(e) = self.store.mark_failed(job.id, &message).await {
                error!(job_id = job.id, error = %e, "Failed to mark job failed");
            }
            return;
        }

        let delay = self.retry.delay_for(job.attempts);
        warn!(
            job_id = job.id,
            attempt = job.attempts,
            retry_in_seconds = delay.as_secs(),
            error = %message,
            "Job failed transiently, scheduling retry"
        );
        if let Err(e) = self.store.schedule_retry(job.id, &message, delay).await {
            error!(job_id = job.id, error = %e, "Failed to schedule retry");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::store::JobStore;
    use crate::testing::InMemoryJobStore;
    use orderbridge_entity::job::model::NewJob;
    use orderbridge_entity::job::payload::JobPayload;
    use orderbridge_entity::job::status::{JobKind, JobStatus};

    /// Handler scripted to fail a fixed way.
    #[derive(Debug)]
    struct ScriptedHandler {
        kind: JobKind,
        calls: AtomicU32,
        outcome: fn() -> Result<(), HandlerError>,
    }

    #[async_trait]
    impl crate::executor::JobHandler for ScriptedHandler {
        fn kind(&self) -> JobKind {
            self.kind
        }

        async fn execute(
            &self,
            _job: &orderbridge_entity::job::model::Job,
        ) -> Result<(), HandlerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.outcome)()
        }
    }

    fn runner_with(
        store: Arc<InMemoryJobStore>,
        outcome: fn() -> Result<(), HandlerError>,
    ) -> (JobRunner, Arc<ScriptedHandler>) {
        let handler = Arc::new(ScriptedHandler {
            kind: JobKind::SyncOrder,
            calls: AtomicU32::new(0),
            outcome,
        });
        let mut executor = JobExecutor::new();
        executor.register(Arc::clone(&handler) as Arc<dyn crate::executor::JobHandler>);
        let runner = JobRunner::new(
            store,
            Arc::new(executor),
            RetryPolicy::new(Duration::ZERO),
        );
        (runner, handler)
    }

    async fn enqueue_sync(store: &InMemoryJobStore, order_id: i64, max_attempts: i32) -> i64 {
        store
            .enqueue(&NewJob::from_payload(
                &JobPayload::SyncOrder { order_id },
                max_attempts,
            ))
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn success_marks_done() {
        let store = Arc::new(InMemoryJobStore::new());
        let (runner, _) = runner_with(Arc::clone(&store), || Ok(()));
        let job_id = enqueue_sync(&store, 1, 3).await;

        let claimed = store.claim_due(1, "w1").await.unwrap();
        runner.run(&claimed[0]).await;

        let job = store.find_by_id(job_id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Done);
        assert_eq!(job.last_error, None);
    }

    #[tokio::test]
    async fn permanent_failure_is_terminal_on_first_attempt() {
        let store = Arc::new(InMemoryJobStore::new());
        let (runner, handler) = runner_with(Arc::clone(&store), || {
            Err(HandlerError::Permanent("bad request".to_string()))
        });
        let job_id = enqueue_sync(&store, 1, 3).await;

        let claimed = store.claim_due(1, "w1").await.unwrap();
        runner.run(&claimed[0]).await;

        let job = store.find_by_id(job_id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.last_error.unwrap().contains("bad request"));
        assert_eq!(handler.calls.load(Ordering::SeqCst), 1);

        // Terminal: never claimed again.
        assert!(store.claim_due(10, "w1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn transient_failures_retry_until_exhaustion() {
        let store = Arc::new(InMemoryJobStore::new());
        let (runner, handler) = runner_with(Arc::clone(&store), || {
            Err(HandlerError::Transient("remote flapping".to_string()))
        });
        let job_id = enqueue_sync(&store, 1, 3).await;

        // Drain until no more claims; zero backoff keeps retries due.
        loop {
            let claimed = store.claim_due(10, "w1").await.unwrap();
            if claimed.is_empty() {
                break;
            }
            for job in &claimed {
                runner.run(job).await;
            }
        }

        let job = store.find_by_id(job_id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.attempts, 3);
        assert_eq!(handler.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn transient_failure_schedules_backoff() {
        let store = Arc::new(InMemoryJobStore::new());
        let handler = Arc::new(ScriptedHandler {
            kind: JobKind::SyncOrder,
            calls: AtomicU32::new(0),
            outcome: || Err(HandlerError::Transient("busy".to_string())),
        });
        let mut executor = JobExecutor::new();
        executor.register(handler as Arc<dyn crate::executor::JobHandler>);
        let runner = JobRunner::new(
            Arc::clone(&store) as Arc<dyn JobStore>,
            Arc::new(executor),
            RetryPolicy::new(Duration::from_secs(30)),
        );

        let job_id = enqueue_sync(&store, 1, 3).await;
        let claimed = store.claim_due(1, "w1").await.unwrap();
        runner.run(&claimed[0]).await;

        let job = store.find_by_id(job_id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Retry);
        assert!(job.next_run_at.is_some());
        // Future-dated: invisible to an immediate claim.
        assert!(store.claim_due(10, "w1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn panicking_handler_is_contained_and_retried() {
        let store = Arc::new(InMemoryJobStore::new());
        let (runner, _) = runner_with(Arc::clone(&store), || panic!("handler exploded"));
        let job_id = enqueue_sync(&store, 1, 3).await;

        let claimed = store.claim_due(1, "w1").await.unwrap();
        runner.run(&claimed[0]).await;

        let job = store.find_by_id(job_id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Retry);
        assert!(job.last_error.unwrap().contains("handler exploded"));
    }
}
