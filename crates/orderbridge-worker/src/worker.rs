//! Worker loop — continuous polling and bounded-concurrency dispatch.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Semaphore, watch};
use tokio::time;
use tracing::{error, info, trace};

use orderbridge_core::config::worker::WorkerConfig;

use crate::runner::JobRunner;
use crate::store::JobStore;

/// Polls the job store and dispatches claimed jobs to the runner.
///
/// Concurrency is bounded by a semaphore whose permits are owned by the
/// spawned tasks: a permit is released when its task ends (panics
/// included), so the next queued job starts the moment a slot frees and
/// shutdown can deterministically wait for drain.
#[derive(Debug)]
pub struct WorkerRunner {
    /// Job store to claim from.
    store: Arc<dyn JobStore>,
    /// Per-job runner.
    runner: Arc<JobRunner>,
    /// Worker configuration.
    config: WorkerConfig,
    /// Worker identifier recorded on claimed jobs.
    worker_id: String,
}

impl WorkerRunner {
    /// Create a new worker runner.
    pub fn new(
        store: Arc<dyn JobStore>,
        runner: Arc<JobRunner>,
        config: WorkerConfig,
        worker_id: String,
    ) -> Self {
        Self {
            store,
            runner,
            config,
            worker_id,
        }
    }

    /// Run until the cancel signal flips to `true`.
    pub async fn run(&self, mut cancel: watch::Receiver<bool>) {
        info!(
            worker_id = %self.worker_id,
            concurrency = self.config.concurrency,
            batch_size = self.config.batch_size,
            poll_interval_seconds = self.config.poll_interval_seconds,
            "Worker started"
        );

        let semaphore = Arc::new(Semaphore::new(self.config.concurrency));
        let poll_interval = Duration::from_secs(self.config.poll_interval_seconds);

        loop {
            if *cancel.borrow() {
                info!(worker_id = %self.worker_id, "Worker received shutdown signal");
                break;
            }

            // A storage failure here must only cost liveness, never
            // correctness: treat it as an empty poll and back off.
            let claimed = match self
                .store
                .claim_due(self.config.batch_size, &self.worker_id)
                .await
            {
                Ok(jobs) => jobs,
                Err(e) => {
                    error!(worker_id = %self.worker_id, error = %e, "Claim failed");
                    Vec::new()
                }
            };

            let full_batch = claimed.len() as i64 >= self.config.batch_size;

            for job in claimed {
                let permit = match Arc::clone(&semaphore).acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return,
                };
                let runner = Arc::clone(&self.runner);
                tokio::spawn(async move {
                    let _permit = permit;
                    runner.run(&job).await;
                });
            }

            if full_batch {
                // More work is likely due; claim again immediately.
                continue;
            }

            trace!(worker_id = %self.worker_id, "Queue drained, sleeping until next poll");
            tokio::select! {
                _ = cancel.changed() => {}
                _ = time::sleep(poll_interval) => {}
            }
        }

        info!(
            worker_id = %self.worker_id,
            "Waiting for in-flight jobs to complete..."
        );
        let max_permits = self.config.concurrency as u32;
        let _ = time::timeout(
            Duration::from_secs(self.config.drain_timeout_seconds),
            semaphore.acquire_many(max_permits),
        )
        .await;

        info!(worker_id = %self.worker_id, "Worker shut down");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;
    use tokio::sync::watch;

    use super::*;
    use crate::executor::{HandlerError, JobExecutor, JobHandler};
    use crate::retry::RetryPolicy;
    use crate::testing::InMemoryJobStore;
    use orderbridge_entity::job::model::{Job, NewJob};
    use orderbridge_entity::job::payload::JobPayload;
    use orderbridge_entity::job::status::{JobKind, JobStatus};

    #[derive(Debug)]
    struct CountingHandler {
        calls: AtomicU32,
    }

    #[async_trait]
    impl JobHandler for CountingHandler {
        fn kind(&self) -> JobKind {
            JobKind::SyncOrder
        }

        async fn execute(&self, _job: &Job) -> Result<(), HandlerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn test_config() -> WorkerConfig {
        WorkerConfig {
            concurrency: 2,
            batch_size: 5,
            poll_interval_seconds: 1,
            drain_timeout_seconds: 5,
            ..WorkerConfig::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn worker_drains_the_queue_and_shuts_down() {
        let store = Arc::new(InMemoryJobStore::new());
        for order_id in 1..=7 {
            store
                .enqueue(&NewJob::from_payload(
                    &JobPayload::SyncOrder { order_id },
                    3,
                ))
                .await
                .unwrap();
        }

        let handler = Arc::new(CountingHandler {
            calls: AtomicU32::new(0),
        });
        let mut executor = JobExecutor::new();
        executor.register(Arc::clone(&handler) as Arc<dyn JobHandler>);

        let runner = Arc::new(JobRunner::new(
            Arc::clone(&store) as Arc<dyn JobStore>,
            Arc::new(executor),
            RetryPolicy::default(),
        ));
        let worker = WorkerRunner::new(
            Arc::clone(&store) as Arc<dyn JobStore>,
            runner,
            test_config(),
            "w-test".to_string(),
        );

        let (cancel_tx, cancel_rx) = watch::channel(false);
        let handle = tokio::spawn(async move { worker.run(cancel_rx).await });

        // Paused time auto-advances through the poll sleeps; give the
        // loop a few cycles to work through both batches.
        for _ in 0..50 {
            tokio::task::yield_now().await;
            time::sleep(Duration::from_millis(100)).await;
            if handler.calls.load(Ordering::SeqCst) == 7 {
                break;
            }
        }

        cancel_tx.send(true).unwrap();
        handle.await.unwrap();

        assert_eq!(handler.calls.load(Ordering::SeqCst), 7);
        for job_id in 1..=7 {
            let job = store.find_by_id(job_id).await.unwrap().unwrap();
            assert_eq!(job.status, JobStatus::Done, "job {job_id} not done");
        }
    }
}
