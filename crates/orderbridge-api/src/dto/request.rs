//! Request DTOs and query parameter schemas.

use serde::{Deserialize, Serialize};
use validator::Validate;

use orderbridge_entity::import::row::OrderRowInput;
use orderbridge_entity::job::status::{JobKind, JobStatus};
use orderbridge_entity::order::model::OrderStatus;

/// Body of `POST /api/imports`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ImportRequest {
    /// Name of the source file or feed.
    #[validate(length(min = 1, max = 255))]
    pub source_name: String,
    /// Parsed order rows.
    #[validate(length(min = 1, message = "import must contain at least one row"))]
    pub rows: Vec<OrderRowInput>,
}

/// Body of `PUT /api/channels/{channel}/rule`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelRuleRequest {
    /// Whether invoicing is triggered automatically after sync.
    pub auto_invoice: bool,
    /// Whether shipping is triggered automatically after invoicing.
    pub auto_ship: bool,
}

/// Query parameters of `GET /api/jobs`.
#[derive(Debug, Clone, Deserialize)]
pub struct JobListQuery {
    /// Filter by job status.
    pub status: Option<JobStatus>,
    /// Filter by job kind.
    pub kind: Option<JobKind>,
    /// Page number (1-based).
    pub page: Option<u64>,
    /// Items per page.
    pub page_size: Option<u64>,
}

/// Query parameters of `GET /api/orders`.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderListQuery {
    /// Filter by workflow status.
    pub status: Option<OrderStatus>,
    /// Page number (1-based).
    pub page: Option<u64>,
    /// Items per page.
    pub page_size: Option<u64>,
}
