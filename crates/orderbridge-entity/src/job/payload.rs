//! Typed job payload definitions.
//!
//! One concrete schema per job kind; the serde tag matches the `kind`
//! column so payloads remain self-describing in the dashboard.

use serde::{Deserialize, Serialize};

use super::status::JobKind;

/// Typed payloads for the closed set of job kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobPayload {
    /// Place an order in the remote system.
    SyncOrder {
        /// Local order id.
        order_id: i64,
    },
    /// Create the remote invoice for an order.
    InvoiceOrder {
        /// Local order id.
        order_id: i64,
    },
    /// Create the remote shipment for an order.
    ShipOrder {
        /// Local order id.
        order_id: i64,
    },
    /// Validate and materialize a staged import batch.
    ImportOrders {
        /// Import batch id.
        batch_id: i64,
    },
}

impl JobPayload {
    /// The job kind this payload belongs to.
    pub fn kind(&self) -> JobKind {
        match self {
            Self::SyncOrder { .. } => JobKind::SyncOrder,
            Self::InvoiceOrder { .. } => JobKind::InvoiceOrder,
            Self::ShipOrder { .. } => JobKind::ShipOrder,
            Self::ImportOrders { .. } => JobKind::ImportOrders,
        }
    }

    /// The target entity id carried by this payload.
    pub fn target_id(&self) -> i64 {
        match self {
            Self::SyncOrder { order_id }
            | Self::InvoiceOrder { order_id }
            | Self::ShipOrder { order_id } => *order_id,
            Self::ImportOrders { batch_id } => *batch_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_round_trips_with_kind_tag() {
        let payload = JobPayload::SyncOrder { order_id: 42 };
        let value = serde_json::json!(&payload);
        assert_eq!(value["kind"], "sync_order");
        assert_eq!(value["order_id"], 42);

        let decoded: JobPayload = serde_json::from_value(value).unwrap();
        assert_eq!(decoded, payload);
        assert_eq!(decoded.kind(), JobKind::SyncOrder);
        assert_eq!(decoded.target_id(), 42);
    }

    #[test]
    fn import_payload_targets_batch() {
        let payload = JobPayload::ImportOrders { batch_id: 7 };
        assert_eq!(payload.kind(), JobKind::ImportOrders);
        assert_eq!(payload.target_id(), 7);
    }
}
