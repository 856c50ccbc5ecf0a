//! Job queue facade for enqueuing work.

use std::sync::Arc;

use tracing::debug;

use orderbridge_core::result::AppResult;
use orderbridge_entity::job::model::{Job, NewJob};
use orderbridge_entity::job::payload::JobPayload;

use crate::store::JobStore;

/// Typed enqueue front of the job store.
///
/// Handlers and services enqueue through this facade so the max-attempts
/// default and the `(kind, target_id)` derivation live in one place.
#[derive(Debug, Clone)]
pub struct JobQueue {
    /// Backing job store.
    store: Arc<dyn JobStore>,
    /// Max attempts given to enqueued jobs.
    default_max_attempts: i32,
}

impl JobQueue {
    /// Create a new job queue.
    pub fn new(store: Arc<dyn JobStore>, default_max_attempts: i32) -> Self {
        Self {
            store,
            default_max_attempts,
        }
    }

    /// Enqueue a job for the given payload.
    ///
    /// Idempotent per `(kind, target_id)`: re-enqueuing while an earlier
    /// job for the same target is live returns that job.
    pub async fn enqueue(&self, payload: JobPayload) -> AppResult<Job> {
        let job = self
            .store
            .enqueue(&NewJob::from_payload(&payload, self.default_max_attempts))
            .await?;

        debug!(
            job_id = job.id,
            kind = %job.kind,
            target_id = job.target_id,
            "Enqueued job"
        );
        Ok(job)
    }

    /// The backing store.
    pub fn store(&self) -> &Arc<dyn JobStore> {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::testing::InMemoryJobStore;
    use orderbridge_entity::job::status::JobKind;

    #[tokio::test]
    async fn enqueue_derives_kind_and_target_from_payload() {
        let store = Arc::new(InMemoryJobStore::new());
        let queue = JobQueue::new(store, 5);

        let job = queue
            .enqueue(JobPayload::InvoiceOrder { order_id: 9 })
            .await
            .unwrap();

        assert_eq!(job.kind, JobKind::InvoiceOrder);
        assert_eq!(job.target_id, 9);
        assert_eq!(job.max_attempts, 5);
        assert_eq!(job.payload["kind"], "invoice_order");
    }
}
