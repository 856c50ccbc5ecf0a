//! Job repository implementation.
//!
//! The claim path is the single point of cross-worker coordination:
//! `FOR UPDATE SKIP LOCKED` makes rows held by a concurrent claimant
//! invisible instead of blocking, and the status flip plus attempt
//! increment happen in the same statement that selects the rows.

use std::time::Duration;

use chrono::Utc;
use sqlx::PgPool;

use orderbridge_core::error::{AppError, ErrorKind};
use orderbridge_core::result::AppResult;
use orderbridge_core::types::pagination::{PageRequest, PageResponse};
use orderbridge_entity::job::model::{Job, NewJob};
use orderbridge_entity::job::status::{JobKind, JobStatus};

/// Repository for job queue persistence and dashboard reads.
#[derive(Debug, Clone)]
pub struct JobRepository {
    pool: PgPool,
}

impl JobRepository {
    /// Create a new job repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Enqueue a job, idempotently per `(kind, target_id)`.
    ///
    /// An existing non-terminal job is returned as-is; an existing
    /// terminal job is re-enabled (attempts and error reset) instead of
    /// duplicated; otherwise a new row is inserted. The row lock taken by
    /// the initial select serializes concurrent enqueues for the same
    /// target.
    pub async fn enqueue(&self, new: &NewJob) -> AppResult<Job> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to begin enqueue", e))?;

        let existing = sqlx::query_as::<_, Job>(
            "SELECT * FROM jobs WHERE kind = $1 AND target_id = $2 FOR UPDATE",
        )
        .bind(new.kind)
        .bind(new.target_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to look up job", e))?;

        let job = match existing {
            Some(job) if !job.status.is_terminal() => job,
            Some(job) => sqlx::query_as::<_, Job>(
                "UPDATE jobs SET status = 'pending', attempts = 0, last_error = NULL, \
                 next_run_at = NULL, worker_id = NULL, payload = $2, max_attempts = $3, \
                 updated_at = NOW() \
                 WHERE id = $1 RETURNING *",
            )
            .bind(job.id)
            .bind(&new.payload)
            .bind(new.max_attempts)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to re-enable job", e)
            })?,
            None => sqlx::query_as::<_, Job>(
                "INSERT INTO jobs (kind, target_id, payload, max_attempts) \
                 VALUES ($1, $2, $3, $4) RETURNING *",
            )
            .bind(new.kind)
            .bind(new.target_id)
            .bind(&new.payload)
            .bind(new.max_attempts)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to insert job", e))?,
        };

        tx.commit()
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to commit enqueue", e))?;

        Ok(job)
    }

    /// Claim up to `limit` due jobs for `worker_id`.
    ///
    /// One statement selects due rows in ascending id order with
    /// `FOR UPDATE SKIP LOCKED`, flips them to running, and increments
    /// their attempt counter. Rows locked by a concurrent claim are
    /// skipped, never double-claimed.
    pub async fn claim_due(&self, limit: i64, worker_id: &str) -> AppResult<Vec<Job>> {
        let mut jobs = sqlx::query_as::<_, Job>(
            "UPDATE jobs SET status = 'running', attempts = attempts + 1, \
             worker_id = $2, updated_at = NOW() \
             WHERE id IN ( \
                SELECT id FROM jobs \
                WHERE status IN ('pending', 'retry') \
                AND (next_run_at IS NULL OR next_run_at <= NOW()) \
                ORDER BY id ASC \
                FOR UPDATE SKIP LOCKED \
                LIMIT $1 \
             ) RETURNING *",
        )
        .bind(limit)
        .bind(worker_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to claim jobs", e))?;

        // RETURNING does not guarantee order; restore FIFO for dispatch.
        jobs.sort_by_key(|job| job.id);
        Ok(jobs)
    }

    /// Mark a job as successfully completed.
    pub async fn mark_done(&self, job_id: i64) -> AppResult<()> {
        sqlx::query(
            "UPDATE jobs SET status = 'done', last_error = NULL, updated_at = NOW() WHERE id = $1",
        )
        .bind(job_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to mark job done", e))?;
        Ok(())
    }

    /// Mark a job as permanently failed.
    pub async fn mark_failed(&self, job_id: i64, message: &str) -> AppResult<()> {
        sqlx::query(
            "UPDATE jobs SET status = 'failed', last_error = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(job_id)
        .bind(message)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to mark job failed", e))?;
        Ok(())
    }

    /// Schedule a retry after `delay`.
    pub async fn schedule_retry(
        &self,
        job_id: i64,
        message: &str,
        delay: Duration,
    ) -> AppResult<()> {
        let next_run_at = Utc::now() + chrono::Duration::seconds(delay.as_secs() as i64);
        sqlx::query(
            "UPDATE jobs SET status = 'retry', last_error = $2, next_run_at = $3, \
             updated_at = NOW() WHERE id = $1",
        )
        .bind(job_id)
        .bind(message)
        .bind(next_run_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to schedule retry", e))?;
        Ok(())
    }

    /// Re-enable a terminal job (operator action). Returns `false` when
    /// the job does not exist or is not terminal.
    pub async fn reenable(&self, job_id: i64) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE jobs SET status = 'pending', attempts = 0, last_error = NULL, \
             next_run_at = NULL, worker_id = NULL, updated_at = NOW() \
             WHERE id = $1 AND status IN ('done', 'failed')",
        )
        .bind(job_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to re-enable job", e))?;
        Ok(result.rows_affected() > 0)
    }

    /// Find a job by id.
    pub async fn find_by_id(&self, job_id: i64) -> AppResult<Option<Job>> {
        sqlx::query_as::<_, Job>("SELECT * FROM jobs WHERE id = $1")
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find job", e))
    }

    /// List jobs for the dashboard, newest first, optionally filtered by
    /// status and kind.
    pub async fn find_all(
        &self,
        status: Option<JobStatus>,
        kind: Option<JobKind>,
        page: &PageRequest,
    ) -> AppResult<PageResponse<Job>> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM jobs \
             WHERE ($1::job_status IS NULL OR status = $1) \
             AND ($2::job_kind IS NULL OR kind = $2)",
        )
        .bind(status)
        .bind(kind)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to count jobs", e))?;

        let jobs = sqlx::query_as::<_, Job>(
            "SELECT * FROM jobs \
             WHERE ($1::job_status IS NULL OR status = $1) \
             AND ($2::job_kind IS NULL OR kind = $2) \
             ORDER BY id DESC LIMIT $3 OFFSET $4",
        )
        .bind(status)
        .bind(kind)
        .bind(page.limit() as i64)
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list jobs", e))?;

        Ok(PageResponse::new(
            jobs,
            page.page,
            page.page_size,
            total as u64,
        ))
    }
}
