//! Storage contract for the job queue.
//!
//! The worker core is written against this trait; production uses the
//! sqlx-backed [`JobRepository`], tests use an in-memory store with the
//! same claim semantics.

use std::time::Duration;

use async_trait::async_trait;

use orderbridge_core::result::AppResult;
use orderbridge_database::repositories::job::JobRepository;
use orderbridge_entity::job::model::{Job, NewJob};

/// Durable storage for jobs with atomic claim semantics.
///
/// Implementations must guarantee:
/// - `claim_due` never returns the same job to two concurrent claimants,
///   and increments `attempts` atomically with the transition to running.
/// - `enqueue` is idempotent per `(kind, target_id)`: it reuses a
///   non-terminal job, re-enables a terminal one, and inserts otherwise.
#[async_trait]
pub trait JobStore: Send + Sync + std::fmt::Debug {
    /// Enqueue a job, idempotently per `(kind, target_id)`.
    async fn enqueue(&self, new: &NewJob) -> AppResult<Job>;

    /// Claim up to `limit` due jobs for `worker_id`, oldest first.
    async fn claim_due(&self, limit: i64, worker_id: &str) -> AppResult<Vec<Job>>;

    /// Mark a job as successfully completed.
    async fn mark_done(&self, job_id: i64) -> AppResult<()>;

    /// Mark a job as permanently failed.
    async fn mark_failed(&self, job_id: i64, message: &str) -> AppResult<()>;

    /// Schedule a retry after `delay`.
    async fn schedule_retry(&self, job_id: i64, message: &str, delay: Duration) -> AppResult<()>;

    /// Re-enable a terminal job. Returns `false` when the job does not
    /// exist or is not terminal.
    async fn reenable(&self, job_id: i64) -> AppResult<bool>;

    /// Find a job by id.
    async fn find_by_id(&self, job_id: i64) -> AppResult<Option<Job>>;
}

#[async_trait]
impl JobStore for JobRepository {
    async fn enqueue(&self, new: &NewJob) -> AppResult<Job> {
        JobRepository::enqueue(self, new).await
    }

    async fn claim_due(&self, limit: i64, worker_id: &str) -> AppResult<Vec<Job>> {
        JobRepository::claim_due(self, limit, worker_id).await
    }

    async fn mark_done(&self, job_id: i64) -> AppResult<()> {
        JobRepository::mark_done(self, job_id).await
    }

    async fn mark_failed(&self, job_id: i64, message: &str) -> AppResult<()> {
        JobRepository::mark_failed(self, job_id, message).await
    }

    async fn schedule_retry(&self, job_id: i64, message: &str, delay: Duration) -> AppResult<()> {
        JobRepository::schedule_retry(self, job_id, message, delay).await
    }

    async fn reenable(&self, job_id: i64) -> AppResult<bool> {
        JobRepository::reenable(self, job_id).await
    }

    async fn find_by_id(&self, job_id: i64) -> AppResult<Option<Job>> {
        JobRepository::find_by_id(self, job_id).await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use super::JobStore;
    use crate::testing::InMemoryJobStore;
    use orderbridge_entity::job::model::NewJob;
    use orderbridge_entity::job::payload::JobPayload;
    use orderbridge_entity::job::status::JobStatus;

    fn sync_job(order_id: i64) -> NewJob {
        NewJob::from_payload(&JobPayload::SyncOrder { order_id }, 3)
    }

    #[tokio::test]
    async fn claim_increments_attempts_exactly_once() {
        let store = InMemoryJobStore::new();
        let job = store.enqueue(&sync_job(1)).await.unwrap();
        assert_eq!(job.attempts, 0);

        let claimed = store.claim_due(10, "w1").await.unwrap();
        assert_eq!(claimed.len(), 1);
        assert_eq!(claimed[0].attempts, 1);
        assert_eq!(claimed[0].status, JobStatus::Running);

        // Running jobs are invisible to further claims.
        assert!(store.claim_due(10, "w1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn enqueue_is_idempotent_while_job_is_live() {
        let store = InMemoryJobStore::new();
        let first = store.enqueue(&sync_job(42)).await.unwrap();
        let second = store.enqueue(&sync_job(42)).await.unwrap();
        assert_eq!(first.id, second.id);

        // A different target gets its own row.
        let other = store.enqueue(&sync_job(43)).await.unwrap();
        assert_ne!(first.id, other.id);
    }

    #[tokio::test]
    async fn enqueue_reenables_terminal_job_instead_of_duplicating() {
        let store = InMemoryJobStore::new();
        let job = store.enqueue(&sync_job(42)).await.unwrap();
        store.claim_due(1, "w1").await.unwrap();
        store.mark_failed(job.id, "boom").await.unwrap();

        let revived = store.enqueue(&sync_job(42)).await.unwrap();
        assert_eq!(revived.id, job.id);
        assert_eq!(revived.status, JobStatus::Pending);
        assert_eq!(revived.attempts, 0);
        assert_eq!(revived.last_error, None);
        assert_eq!(revived.next_run_at, None);
    }

    #[tokio::test]
    async fn reenable_only_touches_terminal_jobs() {
        let store = InMemoryJobStore::new();
        let job = store.enqueue(&sync_job(1)).await.unwrap();
        assert!(!store.reenable(job.id).await.unwrap());

        store.claim_due(1, "w1").await.unwrap();
        store.mark_failed(job.id, "boom").await.unwrap();
        assert!(store.reenable(job.id).await.unwrap());

        let job = store.find_by_id(job.id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.attempts, 0);
    }

    #[tokio::test]
    async fn claims_are_fifo_by_id() {
        let store = InMemoryJobStore::new();
        for order_id in 1..=5 {
            store.enqueue(&sync_job(order_id)).await.unwrap();
        }
        let claimed = store.claim_due(3, "w1").await.unwrap();
        let ids: Vec<i64> = claimed.iter().map(|j| j.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn concurrent_claimants_never_share_a_job() {
        let store = Arc::new(InMemoryJobStore::new());
        for order_id in 1..=20 {
            store.enqueue(&sync_job(order_id)).await.unwrap();
        }

        let mut handles = Vec::new();
        for worker in 0..4 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store
                    .claim_due(5, &format!("w{worker}"))
                    .await
                    .unwrap()
                    .into_iter()
                    .map(|j| j.id)
                    .collect::<Vec<_>>()
            }));
        }

        let mut seen = HashSet::new();
        let mut total = 0;
        for handle in handles {
            for id in handle.await.unwrap() {
                assert!(seen.insert(id), "job {id} claimed twice");
                total += 1;
            }
        }
        assert_eq!(total, 20);
    }
}
