//! Job entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::payload::JobPayload;
use super::status::{JobKind, JobStatus};

/// A persisted unit of asynchronous work.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Job {
    /// Unique job identifier; claim order is ascending id.
    pub id: i64,
    /// What kind of work this job performs.
    pub kind: JobKind,
    /// Target entity id (order id, or import batch id for imports).
    pub target_id: i64,
    /// Kind-specific payload (JSON), decoded at the handler boundary.
    pub payload: serde_json::Value,
    /// Current lifecycle status.
    pub status: JobStatus,
    /// Number of claims performed so far.
    pub attempts: i32,
    /// Ceiling after which a transient failure becomes permanent.
    pub max_attempts: i32,
    /// Earliest time eligible for claim (None = immediately eligible).
    pub next_run_at: Option<DateTime<Utc>>,
    /// Most recent failure message.
    pub last_error: Option<String>,
    /// Worker that holds (or last held) the job.
    pub worker_id: Option<String>,
    /// When the job was created.
    pub created_at: DateTime<Utc>,
    /// When the job was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Decode the typed payload for this job.
    pub fn decode_payload(&self) -> Result<JobPayload, serde_json::Error> {
        serde_json::from_value(self.payload.clone())
    }

    /// Check whether another transient failure would exhaust the job.
    pub fn retries_exhausted(&self) -> bool {
        self.attempts >= self.max_attempts
    }
}

/// Data required to enqueue a new job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewJob {
    /// What kind of work to perform.
    pub kind: JobKind,
    /// Target entity id.
    pub target_id: i64,
    /// Kind-specific payload.
    pub payload: serde_json::Value,
    /// Maximum claim attempts.
    pub max_attempts: i32,
}

impl NewJob {
    /// Build a `NewJob` from a typed payload.
    pub fn from_payload(payload: &JobPayload, max_attempts: i32) -> Self {
        Self {
            kind: payload.kind(),
            target_id: payload.target_id(),
            payload: serde_json::json!(payload),
            max_attempts,
        }
    }
}
