//! Invoice job handler — creates the remote invoice for a placed order.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use orderbridge_entity::job::model::Job;
use orderbridge_entity::job::payload::JobPayload;
use orderbridge_entity::job::status::JobKind;
use orderbridge_remote::api::RemoteOrderApi;

use crate::executor::{HandlerError, JobHandler};
use crate::jobs::{OrderStore, PolicyResolver};
use crate::queue::JobQueue;

/// Creates the remote invoice and conditionally enqueues shipping.
///
/// Safe under at-least-once execution: an order with a persisted invoice
/// timestamp is a no-op.
#[derive(Debug)]
pub struct InvoiceOrderHandler {
    /// Order persistence.
    orders: Arc<dyn OrderStore>,
    /// Remote order system.
    remote: Arc<dyn RemoteOrderApi>,
    /// Channel policy lookup, re-resolved after invoicing.
    policy: Arc<dyn PolicyResolver>,
    /// Queue for enqueuing the successor ship job.
    queue: Arc<JobQueue>,
}

impl InvoiceOrderHandler {
    /// Create a new invoice handler.
    pub fn new(
        orders: Arc<dyn OrderStore>,
        remote: Arc<dyn RemoteOrderApi>,
        policy: Arc<dyn PolicyResolver>,
        queue: Arc<JobQueue>,
    ) -> Self {
        Self {
            orders,
            remote,
            policy,
            queue,
        }
    }
}

#[async_trait]
impl JobHandler for InvoiceOrderHandler {
    fn kind(&self) -> JobKind {
        JobKind::InvoiceOrder
    }

    async fn execute(&self, job: &Job) -> Result<(), HandlerError> {
        let order_id = match job.decode_payload() {
            Ok(JobPayload::InvoiceOrder { order_id }) => order_id,
            Ok(other) => {
                return Err(HandlerError::Permanent(format!(
                    "invoice handler received '{}' payload",
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

        if order.invoiced_at.is_some() {
            debug!(order_id, "Order already invoiced, nothing to do");
            return Ok(());
        }

        let remote_order_id = order.remote_order_id.as_deref().ok_or_else(|| {
            HandlerError::Permanent(format!("order {order_id} has no remote order reference"))
        })?;

        let invoice_id = self
            .remote
            .create_invoice(remote_order_id)
            .await
            .map_err(HandlerError::from_remote)?;

        self.orders.set_invoiced(order.id, &invoice_id).await?;

        info!(
            order_id,
            remote_order_id,
            invoice_id = %invoice_id,
            "Order invoiced remotely"
        );

        if let Err(e) = self
            .remote
            .add_order_comment(remote_order_id, &format!("Invoice {invoice_id} created"))
            .await
        {
            warn!(
                order_id,
                error = %e,
                "Failed to annotate remote order (non-fatal)"
            );
        }

        // Policy is re-resolved after invoicing: rules may have changed
        // while the invoice job sat in the queue.
        let policy = self.policy.resolve(&order.channel).await?;
        if policy.auto_ship {
            let ship_job = self.queue.enqueue(JobPayload::ShipOrder { order_id }).await?;
            info!(
                order_id,
                job_id = ship_job.id,
                "Auto-ship enabled for channel, enqueued ship job"
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::store::JobStore;
    use crate::testing::{
        InMemoryJobStore, InMemoryOrders, MockRemote, StaticPolicy, sample_new_order,
    };
    use orderbridge_entity::job::status::JobStatus;
    use orderbridge_entity::order::model::Order;

    struct Fixture {
        store: Arc<InMemoryJobStore>,
        orders: Arc<InMemoryOrders>,
        remote: Arc<MockRemote>,
        handler: Arc<InvoiceOrderHandler>,
    }

    fn fixture(auto_ship: bool) -> Fixture {
        let store = Arc::new(InMemoryJobStore::new());
        let orders = Arc::new(InMemoryOrders::new());
        let remote = Arc::new(MockRemote::new());
        let queue = Arc::new(JobQueue::new(Arc::clone(&store) as Arc<dyn JobStore>, 3));
        let handler = Arc::new(InvoiceOrderHandler::new(
            Arc::clone(&orders) as Arc<dyn OrderStore>,
            Arc::clone(&remote) as Arc<dyn RemoteOrderApi>,
            Arc::new(StaticPolicy::new(false, auto_ship)) as Arc<dyn PolicyResolver>,
            Arc::clone(&queue),
        ));
        Fixture {
            store,
            orders,
            remote,
            handler,
        }
    }

    async fn placed_order(f: &Fixture) -> Order {
        let order = f
            .orders
            .create_order(&sample_new_order("SO-1", "webshop"))
            .await
            .unwrap();
        f.orders
            .set_placed(order.id, "cart-1", "order-1")
            .await
            .unwrap();
        f.orders.find_order(order.id).await.unwrap().unwrap()
    }

    async fn claimed_invoice_job(f: &Fixture, order_id: i64) -> Job {
        f.store
            .enqueue(&orderbridge_entity::job::model::NewJob::from_payload(
                &JobPayload::InvoiceOrder { order_id },
                3,
            ))
            .await
            .unwrap();
        f.store.claim_due(1, "w1").await.unwrap().remove(0)
    }

    #[tokio::test]
    async fn invoice_persists_and_enqueues_ship_per_policy() {
        let f = fixture(true);
        let order = placed_order(&f).await;
        let job = claimed_invoice_job(&f, order.id).await;

        f.handler.execute(&job).await.unwrap();

        let order = f.orders.find_order(order.id).await.unwrap().unwrap();
        assert!(order.invoiced_at.is_some());
        assert!(order.remote_invoice_id.is_some());

        let jobs = f.store.snapshot();
        assert!(jobs.iter().any(|j| {
            j.kind == JobKind::ShipOrder
                && j.target_id == order.id
                && j.status == JobStatus::Pending
        }));
    }

    #[tokio::test]
    async fn no_ship_job_without_auto_ship() {
        let f = fixture(false);
        let order = placed_order(&f).await;
        let job = claimed_invoice_job(&f, order.id).await;

        f.handler.execute(&job).await.unwrap();

        let jobs = f.store.snapshot();
        assert!(!jobs.iter().any(|j| j.kind == JobKind::ShipOrder));
    }

    #[tokio::test]
    async fn already_invoiced_order_is_a_noop() {
        let f = fixture(true);
        let order = placed_order(&f).await;
        f.orders.set_invoiced(order.id, "invoice-0").await.unwrap();
        let job = claimed_invoice_job(&f, order.id).await;

        f.handler.execute(&job).await.unwrap();

        assert!(f.remote.take_calls().is_empty());
        let order = f.orders.find_order(order.id).await.unwrap().unwrap();
        assert_eq!(order.remote_invoice_id.as_deref(), Some("invoice-0"));
    }

    #[tokio::test]
    async fn order_without_remote_reference_fails_permanently() {
        let f = fixture(true);
        let order = f
            .orders
            .create_order(&sample_new_order("SO-2", "webshop"))
            .await
            .unwrap();
        let job = claimed_invoice_job(&f, order.id).await;

        let err = f.handler.execute(&job).await.unwrap_err();
        assert!(matches!(err, HandlerError::Permanent(_)));
    }
}
