//! Job status and kind enumerations.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of a background job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "job_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Waiting to be claimed by a worker.
    Pending,
    /// Currently held by a worker.
    Running,
    /// Failed transiently, waiting for its next eligible run time.
    Retry,
    /// Successfully completed.
    Done,
    /// Failed permanently or exhausted its retries.
    Failed,
}

impl JobStatus {
    /// Check if the job is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Check if the job is eligible for claim (subject to `next_run_at`).
    pub fn is_claimable(&self) -> bool {
        matches!(self, Self::Pending | Self::Retry)
    }

    /// Return the status as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Retry => "retry",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The closed set of work the queue knows how to execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "job_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// Place an imported order in the remote system.
    SyncOrder,
    /// Create the remote invoice for a placed order.
    InvoiceOrder,
    /// Create the remote shipment for an invoiced order.
    ShipOrder,
    /// Validate and materialize a staged import batch.
    ImportOrders,
}

impl JobKind {
    /// Return the kind as a snake_case string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SyncOrder => "sync_order",
            Self::InvoiceOrder => "invoice_order",
            Self::ShipOrder => "ship_order",
            Self::ImportOrders => "import_orders",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
