//! Sync job handler — places an imported order in the remote system.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use orderbridge_entity::job::model::Job;
use orderbridge_entity::job::payload::JobPayload;
use orderbridge_entity::job::status::JobKind;
use orderbridge_entity::order::model::Order;
use orderbridge_remote::api::{RemoteAddress, RemoteCartItem, RemoteOrderApi};

use crate::executor::{HandlerError, JobHandler};
use crate::jobs::{OrderStore, PolicyResolver};
use crate::queue::JobQueue;

/// Drives the remote order creation sequence for one imported order.
///
/// Safe under at-least-once execution: an order that already carries a
/// remote order reference is returned untouched, with zero remote calls.
#[derive(Debug)]
pub struct SyncOrderHandler {
    /// Order persistence.
    orders: Arc<dyn OrderStore>,
    /// Remote order system.
    remote: Arc<dyn RemoteOrderApi>,
    /// Channel policy lookup for the successor decision.
    policy: Arc<dyn PolicyResolver>,
    /// Queue for enqueuing the successor invoice job.
    queue: Arc<JobQueue>,
}

impl SyncOrderHandler {
    /// Create a new sync handler.
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

    /// Run the cart → items → address → payment → place sequence.
    async fn place_remotely(&self, order: &Order) -> Result<(String, String), HandlerError> {
        let items = self.orders.order_items(order.id).await?;
        if items.is_empty() {
            return Err(HandlerError::Permanent(format!(
                "order {} has no line items",
                order.id
            )));
        }

        let cart_id = self
            .remote
            .create_cart()
            .await
            .map_err(HandlerError::from_remote)?;

        for item in &items {
            self.remote
                .add_item(
                    &cart_id,
                    &RemoteCartItem {
                        sku: item.sku.clone(),
                        quantity: item.quantity,
                        unit_price_cents: item.unit_price_cents,
                    },
                )
                .await
                .map_err(HandlerError::from_remote)?;
        }

        self.remote
            .set_addresses(
                &cart_id,
                &RemoteAddress {
                    email: order.customer_email.clone(),
                    firstname: order.customer_firstname.clone(),
                    lastname: order.customer_lastname.clone(),
                    street: order.street.clone(),
                    city: order.city.clone(),
                    postcode: order.postcode.clone(),
                    country_code: order.country_code.clone(),
                },
            )
            .await
            .map_err(HandlerError::from_remote)?;

        self.remote
            .set_payment(&cart_id, &order.payment_method)
            .await
            .map_err(HandlerError::from_remote)?;

        let remote_order_id = self
            .remote
            .place_order(&cart_id)
            .await
            .map_err(HandlerError::from_remote)?;

        Ok((cart_id, remote_order_id))
    }

    /// Annotate the remote order. Failures here are logged, never fatal:
    /// the order is already placed and persisted.
    async fn annotate(&self, order: &Order, remote_order_id: &str) {
        let comment = match order.ordered_at {
            Some(ordered_at) => format!(
                "Imported from channel '{}' as {} (ordered {})",
                order.channel,
                order.external_ref,
                ordered_at.to_rfc3339()
            ),
            None => format!(
                "Imported from channel '{}' as {}",
                order.channel, order.external_ref
            ),
        };

        if let Err(e) = self.remote.add_order_comment(remote_order_id, &comment).await {
            warn!(
                order_id = order.id,
                remote_order_id,
                error = %e,
                "Failed to annotate remote order (non-fatal)"
            );
        }
    }
}

#[async_trait]
impl JobHandler for SyncOrderHandler {
    fn kind(&self) -> JobKind {
        JobKind::SyncOrder
    }

    async fn execute(&self, job: &Job) -> Result<(), HandlerError> {
        let order_id = match job.decode_payload() {
            Ok(JobPayload::SyncOrder { order_id }) => order_id,
            Ok(other) => {
                return Err(HandlerError::Permanent(format!(
                    "sync handler received '{}' payload",
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

        if order.remote_order_id.is_some() {
            debug!(order_id, "Order already placed remotely, nothing to do");
            return Ok(());
        }

        let (cart_id, remote_order_id) = self.place_remotely(&order).await?;
        self.orders
            .set_placed(order.id, &cart_id, &remote_order_id)
            .await?;

        info!(
            order_id,
            external_ref = %order.external_ref,
            remote_order_id = %remote_order_id,
            "Order placed remotely"
        );

        self.annotate(&order, &remote_order_id).await;

        let policy = self.policy.resolve(&order.channel).await?;
        if policy.auto_invoice {
            let invoice_job = self.queue.enqueue(JobPayload::InvoiceOrder { order_id }).await?;
            info!(
                order_id,
                job_id = invoice_job.id,
                "Auto-invoice enabled for channel, enqueued invoice job"
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::executor::JobExecutor;
    use crate::retry::RetryPolicy;
    use crate::runner::JobRunner;
    use crate::store::JobStore;
    use crate::testing::{
        InMemoryJobStore, InMemoryOrders, MockRemote, StaticPolicy, sample_new_order,
    };
    use orderbridge_entity::job::status::JobStatus;
    use orderbridge_remote::error::RemoteError;

    struct Fixture {
        store: Arc<InMemoryJobStore>,
        orders: Arc<InMemoryOrders>,
        remote: Arc<MockRemote>,
        queue: Arc<JobQueue>,
        handler: Arc<SyncOrderHandler>,
    }

    fn fixture(auto_invoice: bool) -> Fixture {
        let store = Arc::new(InMemoryJobStore::new());
        let orders = Arc::new(InMemoryOrders::new());
        let remote = Arc::new(MockRemote::new());
        let queue = Arc::new(JobQueue::new(
            Arc::clone(&store) as Arc<dyn JobStore>,
            3,
        ));
        let handler = Arc::new(SyncOrderHandler::new(
            Arc::clone(&orders) as Arc<dyn OrderStore>,
            Arc::clone(&remote) as Arc<dyn RemoteOrderApi>,
            Arc::new(StaticPolicy::new(auto_invoice, false)) as Arc<dyn PolicyResolver>,
            Arc::clone(&queue),
        ));
        Fixture {
            store,
            orders,
            remote,
            queue,
            handler,
        }
    }

    #[tokio::test]
    async fn sync_places_order_and_enqueues_invoice_per_policy() {
        let f = fixture(true);
        let order = f
            .orders
            .create_order(&sample_new_order("SO-42", "webshop"))
            .await
            .unwrap();

        let sync_job = f
            .queue
            .enqueue(JobPayload::SyncOrder { order_id: order.id })
            .await
            .unwrap();

        let mut executor = JobExecutor::new();
        executor.register(Arc::clone(&f.handler) as Arc<dyn crate::executor::JobHandler>);
        let runner = JobRunner::new(
            Arc::clone(&f.store) as Arc<dyn JobStore>,
            Arc::new(executor),
            RetryPolicy::default(),
        );

        let claimed = f.store.claim_due(10, "w1").await.unwrap();
        assert_eq!(claimed.len(), 1);
        runner.run(&claimed[0]).await;

        let order = f.orders.find_order(order.id).await.unwrap().unwrap();
        assert!(order.remote_order_id.is_some());
        assert!(order.synced_at.is_some());

        let jobs = f.store.snapshot();
        let done = jobs.iter().find(|j| j.id == sync_job.id).unwrap();
        assert_eq!(done.status, JobStatus::Done);
        assert!(jobs.iter().any(|j| {
            j.kind == JobKind::InvoiceOrder
                && j.target_id == order.id
                && j.status == JobStatus::Pending
        }));
        assert!(!jobs.iter().any(|j| j.kind == JobKind::ShipOrder));

        assert_eq!(
            f.remote.take_calls(),
            vec![
                "create_cart",
                "add_item",
                "set_addresses",
                "set_payment",
                "place_order",
                "add_order_comment",
            ]
        );
    }

    #[tokio::test]
    async fn second_invocation_makes_zero_remote_calls() {
        let f = fixture(false);
        let order = f
            .orders
            .create_order(&sample_new_order("SO-1", "webshop"))
            .await
            .unwrap();
        f.queue
            .enqueue(JobPayload::SyncOrder { order_id: order.id })
            .await
            .unwrap();
        let job = f.store.claim_due(1, "w1").await.unwrap().remove(0);

        f.handler.execute(&job).await.unwrap();
        assert!(!f.remote.take_calls().is_empty());
        let after_first = f.orders.find_order(order.id).await.unwrap().unwrap();

        f.handler.execute(&job).await.unwrap();
        assert!(f.remote.take_calls().is_empty());
        let after_second = f.orders.find_order(order.id).await.unwrap().unwrap();

        assert_eq!(after_first.remote_order_id, after_second.remote_order_id);
        assert_eq!(after_first.updated_at, after_second.updated_at);
    }

    #[tokio::test]
    async fn remote_failures_classify_through_the_handler_error() {
        let f = fixture(false);
        let order = f
            .orders
            .create_order(&sample_new_order("SO-1", "webshop"))
            .await
            .unwrap();
        f.queue
            .enqueue(JobPayload::SyncOrder { order_id: order.id })
            .await
            .unwrap();
        let job = f.store.claim_due(1, "w1").await.unwrap().remove(0);

        f.remote
            .fail_op("place_order", RemoteError::status(503, "upstream busy"));
        let err = f.handler.execute(&job).await.unwrap_err();
        assert!(matches!(err, HandlerError::Transient(_)));

        f.remote
            .fail_op("place_order", RemoteError::status(400, "Invalid address data"));
        let err = f.handler.execute(&job).await.unwrap_err();
        assert!(matches!(err, HandlerError::Permanent(_)));
    }

    #[tokio::test]
    async fn comment_failure_is_not_fatal() {
        let f = fixture(false);
        let order = f
            .orders
            .create_order(&sample_new_order("SO-1", "webshop"))
            .await
            .unwrap();
        f.queue
            .enqueue(JobPayload::SyncOrder { order_id: order.id })
            .await
            .unwrap();
        let job = f.store.claim_due(1, "w1").await.unwrap().remove(0);

        f.remote
            .fail_op("add_order_comment", RemoteError::status(500, "comment api down"));
        f.handler.execute(&job).await.unwrap();

        let order = f.orders.find_order(order.id).await.unwrap().unwrap();
        assert!(order.remote_order_id.is_some());
    }
}
