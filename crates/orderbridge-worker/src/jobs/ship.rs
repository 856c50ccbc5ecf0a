//! Ship job handler — creates the remote shipment for an invoiced order.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use orderbridge_entity::job::model::Job;
use orderbridge_entity::job::payload::JobPayload;
use orderbridge_entity::job::status::JobKind;
use orderbridge_remote::api::RemoteOrderApi;

use crate::executor::{HandlerError, JobHandler};
use crate::jobs::OrderStore;

/// Creates the remote shipment.
///
/// Safe under at-least-once execution: an order with a persisted
/// shipment timestamp is a no-op.
#[derive(Debug)]
pub struct ShipOrderHandler {
    /// Order persistence.
    orders: Arc<dyn OrderStore>,
    /// Remote order system.
    remote: Arc<dyn RemoteOrderApi>,
}

impl ShipOrderHandler {
    /// Create a new ship handler.
    pub fn new(orders: Arc<dyn OrderStore>, remote: Arc<dyn RemoteOrderApi>) -> Self {
        Self { orders, remote }
    }
}

#[async_trait]
impl JobHandler for ShipOrderHandler {
    fn kind(&self) -> JobKind {
        JobKind::ShipOrder
    }

    async fn execute(&self, job: &Job) -> Result<(), HandlerError> {
        let order_id = match job.decode_payload() {
            Ok(JobPayload::ShipOrder { order_id }) => order_id,
            Ok(other) => {
                return Err(HandlerError::Permanent(format!(
                    "ship handler received '{}' payload",
                    other.kind()
                )));
            }
            Err(e) => return Err(HandlerError::Permanent(format!("invalid payload: {e}"))),
        };

        let order = self
            .orders
            .find_order(order_id)
            .await?
            .ok_or_else(|| HandlerError::Permanent(format!("order {order_id} not found")))?;

        if order.shipped_at.is_some() {
            debug!(order_id, "Order already shipped, nothing to do");
            return Ok(());
        }

        let remote_order_id = order.remote_order_id.as_deref().ok_or_else(|| {
            HandlerError::Permanent(format!("order {order_id} has no remote order reference"))
        })?;

        let shipment_id = self
            .remote
            .create_shipment(remote_order_id)
            .await
            .map_err(HandlerError::from_remote)?;

        self.orders.set_shipped(order.id, &shipment_id).await?;

        info!(
            order_id,
            remote_order_id,
            shipment_id = %shipment_id,
            "Order shipped remotely"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::store::JobStore;
    use crate::testing::{InMemoryJobStore, InMemoryOrders, MockRemote, sample_new_order};
    use orderbridge_entity::job::model::NewJob;

    async fn claimed_ship_job(store: &InMemoryJobStore, order_id: i64) -> Job {
        store
            .enqueue(&NewJob::from_payload(
                &JobPayload::ShipOrder { order_id },
                3,
            ))
            .await
            .unwrap();
        store.claim_due(1, "w1").await.unwrap().remove(0)
    }

    #[tokio::test]
    async fn ship_persists_the_remote_shipment() {
        let store = InMemoryJobStore::new();
        let orders = Arc::new(InMemoryOrders::new());
        let remote = Arc::new(MockRemote::new());
        let handler = ShipOrderHandler::new(
            Arc::clone(&orders) as Arc<dyn OrderStore>,
            Arc::clone(&remote) as Arc<dyn RemoteOrderApi>,
        );

        let order = orders
            .create_order(&sample_new_order("SO-1", "webshop"))
            .await
            .unwrap();
        orders.set_placed(order.id, "cart-1", "order-1").await.unwrap();
        orders.set_invoiced(order.id, "invoice-1").await.unwrap();

        let job = claimed_ship_job(&store, order.id).await;
        handler.execute(&job).await.unwrap();

        let order = orders.find_order(order.id).await.unwrap().unwrap();
        assert!(order.shipped_at.is_some());
        assert!(order.remote_shipment_id.is_some());
        assert_eq!(remote.take_calls(), vec!["create_shipment"]);
    }

    #[tokio::test]
    async fn already_shipped_order_is_a_noop() {
        let store = InMemoryJobStore::new();
        let orders = Arc::new(InMemoryOrders::new());
        let remote = Arc::new(MockRemote::new());
        let handler = ShipOrderHandler::new(
            Arc::clone(&orders) as Arc<dyn OrderStore>,
            Arc::clone(&remote) as Arc<dyn RemoteOrderApi>,
        );

        let order = orders
            .create_order(&sample_new_order("SO-1", "webshop"))
            .await
            .unwrap();
        orders.set_placed(order.id, "cart-1", "order-1").await.unwrap();
        orders.set_shipped(order.id, "shipment-0").await.unwrap();

        let job = claimed_ship_job(&store, order.id).await;
        handler.execute(&job).await.unwrap();

        assert!(remote.take_calls().is_empty());
        let order = orders.find_order(order.id).await.unwrap().unwrap();
        assert_eq!(order.remote_shipment_id.as_deref(), Some("shipment-0"));
    }
}
