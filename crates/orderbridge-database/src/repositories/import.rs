//! Import batch and row repository implementation.

use sqlx::PgPool;

use orderbridge_core::error::{AppError, ErrorKind};
use orderbridge_core::result::AppResult;
use orderbridge_entity::import::batch::ImportBatch;
use orderbridge_entity::import::row::ImportRow;

/// Repository for import staging tables.
#[derive(Debug, Clone)]
pub struct ImportRepository {
    pool: PgPool,
}

impl ImportRepository {
    /// Create a new import repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Stage a batch with its parsed rows in one transaction.
    pub async fn create_batch(
        &self,
        source_name: &str,
        rows: &[serde_json::Value],
    ) -> AppResult<ImportBatch> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin batch insert", e)
        })?;

        let batch = sqlx::query_as::<_, ImportBatch>(
            "INSERT INTO import_batches (source_name, total_rows) VALUES ($1, $2) RETURNING *",
        )
        .bind(source_name)
        .bind(rows.len() as i32)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to insert batch", e))?;

        for (index, payload) in rows.iter().enumerate() {
            sqlx::query(
                "INSERT INTO import_rows (batch_id, line_number, payload) VALUES ($1, $2, $3)",
            )
            .bind(batch.id)
            .bind((index + 1) as i32)
            .bind(payload)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to insert import row", e)
            })?;
        }

        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit batch insert", e)
        })?;

        Ok(batch)
    }

    /// Find a batch by id.
    pub async fn find_batch(&self, batch_id: i64) -> AppResult<Option<ImportBatch>> {
        sqlx::query_as::<_, ImportBatch>("SELECT * FROM import_batches WHERE id = $1")
            .bind(batch_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find batch", e))
    }

    /// Load the rows of a batch that are still staged, in file order.
    ///
    /// Re-executions of the import job only see rows an earlier attempt
    /// did not finish.
    pub async fn staged_rows(&self, batch_id: i64) -> AppResult<Vec<ImportRow>> {
        sqlx::query_as::<_, ImportRow>(
            "SELECT * FROM import_rows WHERE batch_id = $1 AND status = 'staged' \
             ORDER BY line_number ASC",
        )
        .bind(batch_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to load staged rows", e))
    }

    /// Mark a row as materialized into an order.
    pub async fn mark_row_imported(&self, row_id: i64) -> AppResult<()> {
        sqlx::query(
            "UPDATE import_rows SET status = 'imported', error = NULL, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(row_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to mark row imported", e))?;
        Ok(())
    }

    /// Mark a row as invalid with a row-level error.
    pub async fn mark_row_invalid(&self, row_id: i64, error: &str) -> AppResult<()> {
        sqlx::query(
            "UPDATE import_rows SET status = 'invalid', error = $2, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(row_id)
        .bind(error)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to mark row invalid", e))?;
        Ok(())
    }

    /// Transition a batch to processing.
    pub async fn set_batch_processing(&self, batch_id: i64) -> AppResult<()> {
        sqlx::query(
            "UPDATE import_batches SET status = 'processing', updated_at = NOW() WHERE id = $1",
        )
        .bind(batch_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to update batch", e))?;
        Ok(())
    }

    /// Finalize a batch with its counters, derived from row statuses.
    pub async fn finalize_batch(&self, batch_id: i64) -> AppResult<ImportBatch> {
        sqlx::query_as::<_, ImportBatch>(
            "UPDATE import_batches SET \
             imported_rows = (SELECT COUNT(*) FROM import_rows \
                WHERE batch_id = $1 AND status = 'imported'), \
             failed_rows = (SELECT COUNT(*) FROM import_rows \
                WHERE batch_id = $1 AND status = 'invalid'), \
             status = CASE WHEN EXISTS (SELECT 1 FROM import_rows \
                WHERE batch_id = $1 AND status = 'invalid') \
                THEN 'completed_with_errors'::import_batch_status \
                ELSE 'completed'::import_batch_status END, \
             updated_at = NOW() \
             WHERE id = $1 RETURNING *",
        )
        .bind(batch_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to finalize batch", e))
    }
}
