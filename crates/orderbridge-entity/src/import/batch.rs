//! Import batch entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

/// Lifecycle of a staged import batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "import_batch_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ImportBatchStatus {
    /// Rows staged, import job not yet run.
    Staged,
    /// Import job is materializing orders.
    Processing,
    /// All rows imported.
    Completed,
    /// Finished, but some rows were invalid.
    CompletedWithErrors,
}

impl ImportBatchStatus {
    /// Return the status as a snake_case string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Staged => "staged",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::CompletedWithErrors => "completed_with_errors",
        }
    }
}

impl fmt::Display for ImportBatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A staged bulk import of orders from one source file.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ImportBatch {
    /// Unique batch identifier.
    pub id: i64,
    /// Name of the source file or feed.
    pub source_name: String,
    /// Total number of staged rows.
    pub total_rows: i32,
    /// Rows materialized into orders.
    pub imported_rows: i32,
    /// Rows rejected as invalid.
    pub failed_rows: i32,
    /// Batch lifecycle status.
    pub status: ImportBatchStatus,
    /// When the batch was staged.
    pub created_at: DateTime<Utc>,
    /// When the batch was last updated.
    pub updated_at: DateTime<Utc>,
}
