//! Import staging — persists parsed order rows and hands the batch to
//! the job queue.

use std::sync::Arc;

use tracing::info;

use orderbridge_core::error::AppError;
use orderbridge_database::repositories::import::ImportRepository;
use orderbridge_database::repositories::job::JobRepository;
use orderbridge_entity::import::batch::ImportBatch;
use orderbridge_entity::import::row::OrderRowInput;
use orderbridge_entity::job::model::NewJob;
use orderbridge_entity::job::payload::JobPayload;

/// Stages import batches and enqueues the import job.
#[derive(Debug, Clone)]
pub struct ImportService {
    /// Import staging repository.
    import_repo: Arc<ImportRepository>,
    /// Job repository for enqueuing the batch job.
    job_repo: Arc<JobRepository>,
    /// Max attempts given to import jobs.
    max_attempts: i32,
}

impl ImportService {
    /// Create a new import service.
    pub fn new(
        import_repo: Arc<ImportRepository>,
        job_repo: Arc<JobRepository>,
        max_attempts: i32,
    ) -> Self {
        Self {
            import_repo,
            job_repo,
            max_attempts,
        }
    }

    /// Stage `rows` as a batch and enqueue an import job for it.
    pub async fn stage_batch(
        &self,
        source_name: &str,
        rows: Vec<OrderRowInput>,
    ) -> Result<ImportBatch, AppError> {
        if rows.is_empty() {
            return Err(AppError::validation("Import contains no rows"));
        }

        let payloads: Vec<serde_json::Value> = rows
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<_, _>>()?;

        let batch = self.import_repo.create_batch(source_name, &payloads).await?;

        let job = self
            .job_repo
            .enqueue(&NewJob::from_payload(
                &JobPayload::ImportOrders { batch_id: batch.id },
                self.max_attempts,
            ))
            .await?;

        info!(
            batch_id = batch.id,
            job_id = job.id,
            rows = batch.total_rows,
            source = source_name,
            "Staged import batch"
        );

        Ok(batch)
    }

    /// Fetch batch progress for the API.
    pub async fn batch_progress(&self, batch_id: i64) -> Result<ImportBatch, AppError> {
        self.import_repo
            .find_batch(batch_id)
            .await?
            .ok_or_else(|| AppError::not_found("Import batch not found"))
    }
}
