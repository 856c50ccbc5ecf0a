//! Import job handler — validates staged rows and materializes orders.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use orderbridge_entity::import::row::{ImportRow, OrderRowInput};
use orderbridge_entity::job::model::Job;
use orderbridge_entity::job::payload::JobPayload;
use orderbridge_entity::job::status::JobKind;
use orderbridge_remote::api::RemoteOrderApi;

use crate::classifier::is_transient;
use crate::executor::{HandlerError, JobHandler};
use crate::jobs::{ImportStore, OrderStore};
use crate::queue::JobQueue;

/// Outcome of processing one staged row.
enum RowError {
    /// The row itself is bad; record it and continue with the batch.
    Invalid(String),
    /// The environment failed; abort and let the job retry.
    Abort(HandlerError),
}

impl From<orderbridge_core::error::AppError> for RowError {
    fn from(err: orderbridge_core::error::AppError) -> Self {
        Self::Abort(HandlerError::Internal(err))
    }
}

/// Materializes a staged batch into orders and sync jobs.
///
/// Safe under at-least-once execution: processed rows leave the staged
/// state, and a re-run picks up only what is left. Row-level validation
/// failures never fail the batch; they are recorded per row.
#[derive(Debug)]
pub struct ImportOrdersHandler {
    /// Import staging persistence.
    imports: Arc<dyn ImportStore>,
    /// Order persistence.
    orders: Arc<dyn OrderStore>,
    /// Remote inventory for stock validation.
    remote: Arc<dyn RemoteOrderApi>,
    /// Queue for enqueuing per-order sync jobs.
    queue: Arc<JobQueue>,
    /// Whether rows are validated against remote stock.
    validate_stock: bool,
}

impl ImportOrdersHandler {
    /// Create a new import handler.
    pub fn new(
        imports: Arc<dyn ImportStore>,
        orders: Arc<dyn OrderStore>,
        remote: Arc<dyn RemoteOrderApi>,
        queue: Arc<JobQueue>,
        validate_stock: bool,
    ) -> Self {
        Self {
            imports,
            orders,
            remote,
            queue,
            validate_stock,
        }
    }

    /// Validate one row and create its order. Returns the order id.
    async fn import_row(&self, row: &ImportRow) -> Result<i64, RowError> {
        let input: OrderRowInput = serde_json::from_value(row.payload.clone())
            .map_err(|e| RowError::Invalid(format!("malformed row: {e}")))?;
        input.validate().map_err(RowError::Invalid)?;

        // Crash between order insert and row update leaves the row
        // staged with its order already created; reuse it.
        if let Some(existing) = self
            .orders
            .find_order_by_external_ref(&input.external_ref)
            .await?
        {
            return Ok(existing.id);
        }

        if self.validate_stock {
            self.check_stock(&input).await?;
        }

        let order = self.orders.create_order(&input.into_new_order()).await?;
        Ok(order.id)
    }

    /// Validate every line against the remote inventory.
    async fn check_stock(&self, input: &OrderRowInput) -> Result<(), RowError> {
        for item in &input.items {
            match self.remote.get_stock(&item.sku).await {
                Ok(stock) if !stock.in_stock => {
                    return Err(RowError::Invalid(format!(
                        "SKU '{}' is not sellable",
                        item.sku
                    )));
                }
                Ok(stock) if stock.quantity < item.quantity as i64 => {
                    return Err(RowError::Invalid(format!(
                        "insufficient stock for SKU '{}': requested {}, available {}",
                        item.sku, item.quantity, stock.quantity
                    )));
                }
                Ok(_) => {}
                // A transient inventory failure aborts the batch run so
                // the whole job retries; a permanent one condemns only
                // this row.
                Err(e) if is_transient(&e) => {
                    return Err(RowError::Abort(HandlerError::from_remote(e)));
                }
                Err(e) => {
                    return Err(RowError::Invalid(format!(
                        "stock lookup for SKU '{}' rejected: {e}",
                        item.sku
                    )));
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl JobHandler for ImportOrdersHandler {
    fn kind(&self) -> JobKind {
        JobKind::ImportOrders
    }

    async fn execute(&self, job: &Job) -> Result<(), HandlerError> {
        let batch_id = match job.decode_payload() {
            Ok(JobPayload::ImportOrders { batch_id }) => batch_id,
            Ok(other) => {
                return Err(HandlerError::Permanent(format!(
                    "import handler received '{}' payload",
                    other.kind()
                )));
            }
            Err(e) => return Err(HandlerError::Permanent(format!("invalid payload: {e}"))),
        };

        let batch = self
            .imports
            .find_batch(batch_id)
            .await?
            .ok_or_else(|| HandlerError::Permanent(format!("import batch {batch_id} not found")))?;

        self.imports.set_batch_processing(batch.id).await?;

        let rows = self.imports.staged_rows(batch.id).await?;
        for row in &rows {
            match self.import_row(row).await {
                Ok(order_id) => {
                    self.imports.mark_row_imported(row.id).await?;
                    self.queue.enqueue(JobPayload::SyncOrder { order_id }).await?;
                }
                Err(RowError::Invalid(message)) => {
                    warn!(
                        batch_id,
                        line = row.line_number,
                        error = %message,
                        "Import row rejected"
                    );
                    self.imports.mark_row_invalid(row.id, &message).await?;
                }
                Err(RowError::Abort(err)) => return Err(err),
            }
        }

        let batch = self.imports.finalize_batch(batch.id).await?;
        info!(
            batch_id,
            imported = batch.imported_rows,
            failed = batch.failed_rows,
            status = %batch.status,
            "Import batch finished"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::store::JobStore;
    use crate::testing::{
        InMemoryImports, InMemoryJobStore, InMemoryOrders, MockRemote, sample_new_order,
    };
    use orderbridge_entity::import::batch::ImportBatchStatus;
    use orderbridge_entity::import::row::ImportRowStatus;
    use orderbridge_entity::job::model::NewJob;
    use orderbridge_entity::job::status::{JobKind, JobStatus};
    use orderbridge_remote::error::RemoteError;

    struct Fixture {
        store: Arc<InMemoryJobStore>,
        orders: Arc<InMemoryOrders>,
        imports: Arc<InMemoryImports>,
        remote: Arc<MockRemote>,
        handler: ImportOrdersHandler,
    }

    fn fixture(validate_stock: bool) -> Fixture {
        let store = Arc::new(InMemoryJobStore::new());
        let orders = Arc::new(InMemoryOrders::new());
        let imports = Arc::new(InMemoryImports::new());
        let remote = Arc::new(MockRemote::new());
        let queue = Arc::new(JobQueue::new(Arc::clone(&store) as Arc<dyn JobStore>, 3));
        let handler = ImportOrdersHandler::new(
            Arc::clone(&imports) as Arc<dyn ImportStore>,
            Arc::clone(&orders) as Arc<dyn OrderStore>,
            Arc::clone(&remote) as Arc<dyn RemoteOrderApi>,
            Arc::clone(&queue),
            validate_stock,
        );
        Fixture {
            store,
            orders,
            imports,
            remote,
            handler,
        }
    }

    fn row_payload(external_ref: &str, quantity: i32) -> serde_json::Value {
        let mut order = sample_new_order(external_ref, "webshop");
        order.items[0].quantity = quantity;
        serde_json::json!({
            "external_ref": order.external_ref,
            "channel": order.channel,
            "customer_email": order.customer_email,
            "customer_firstname": order.customer_firstname,
            "customer_lastname": order.customer_lastname,
            "street": order.street,
            "city": order.city,
            "postcode": order.postcode,
            "country_code": order.country_code,
            "payment_method": order.payment_method,
            "currency": order.currency,
            "grand_total_cents": order.grand_total_cents,
            "ordered_at": null,
            "items": [{
                "sku": order.items[0].sku,
                "name": order.items[0].name,
                "quantity": order.items[0].quantity,
                "unit_price_cents": order.items[0].unit_price_cents,
            }],
        })
    }

    async fn claimed_import_job(store: &InMemoryJobStore, batch_id: i64) -> Job {
        store
            .enqueue(&NewJob::from_payload(
                &JobPayload::ImportOrders { batch_id },
                3,
            ))
            .await
            .unwrap();
        store.claim_due(1, "w1").await.unwrap().remove(0)
    }

    #[tokio::test]
    async fn import_materializes_valid_rows_and_rejects_bad_ones() {
        let f = fixture(true);
        f.remote.set_stock("SKU-1", 100, true);
        let batch = f.imports.stage(
            "orders.csv",
            vec![
                row_payload("SO-1", 2),
                row_payload("SO-2", 1),
                row_payload("SO-3", 0),
            ],
        );

        let job = claimed_import_job(&f.store, batch.id).await;
        f.handler.execute(&job).await.unwrap();

        let batch = f.imports.find_batch(batch.id).await.unwrap().unwrap();
        assert_eq!(batch.status, ImportBatchStatus::CompletedWithErrors);
        assert_eq!(batch.imported_rows, 2);
        assert_eq!(batch.failed_rows, 1);

        let rows = f.imports.rows(batch.id);
        assert_eq!(rows[0].status, ImportRowStatus::Imported);
        assert_eq!(rows[1].status, ImportRowStatus::Imported);
        assert_eq!(rows[2].status, ImportRowStatus::Invalid);
        assert!(rows[2].error.as_deref().unwrap().contains("quantity"));

        assert!(f
            .orders
            .find_order_by_external_ref("SO-1")
            .await
            .unwrap()
            .is_some());
        assert!(f
            .orders
            .find_order_by_external_ref("SO-3")
            .await
            .unwrap()
            .is_none());

        let sync_jobs: Vec<_> = f
            .store
            .snapshot()
            .into_iter()
            .filter(|j| j.kind == JobKind::SyncOrder && j.status == JobStatus::Pending)
            .collect();
        assert_eq!(sync_jobs.len(), 2);
    }

    #[tokio::test]
    async fn insufficient_stock_rejects_the_row() {
        let f = fixture(true);
        f.remote.set_stock("SKU-1", 1, true);
        let batch = f.imports.stage("orders.csv", vec![row_payload("SO-1", 5)]);

        let job = claimed_import_job(&f.store, batch.id).await;
        f.handler.execute(&job).await.unwrap();

        let rows = f.imports.rows(batch.id);
        assert_eq!(rows[0].status, ImportRowStatus::Invalid);
        assert!(rows[0].error.as_deref().unwrap().contains("insufficient stock"));
    }

    #[tokio::test]
    async fn transient_inventory_failure_aborts_the_batch() {
        let f = fixture(true);
        f.remote
            .fail_op("get_stock", RemoteError::status(503, "inventory down"));
        let batch = f.imports.stage("orders.csv", vec![row_payload("SO-1", 1)]);

        let job = claimed_import_job(&f.store, batch.id).await;
        let err = f.handler.execute(&job).await.unwrap_err();
        assert!(matches!(err, HandlerError::Transient(_)));

        // The row stays staged for the retry.
        let rows = f.imports.rows(batch.id);
        assert_eq!(rows[0].status, ImportRowStatus::Staged);
    }

    #[tokio::test]
    async fn reexecution_reuses_an_already_created_order() {
        let f = fixture(false);
        let existing = f
            .orders
            .create_order(&sample_new_order("SO-1", "webshop"))
            .await
            .unwrap();
        let batch = f.imports.stage("orders.csv", vec![row_payload("SO-1", 2)]);

        let job = claimed_import_job(&f.store, batch.id).await;
        f.handler.execute(&job).await.unwrap();

        let rows = f.imports.rows(batch.id);
        assert_eq!(rows[0].status, ImportRowStatus::Imported);

        // The sync job targets the pre-existing order, no duplicate row.
        let sync_job = f
            .store
            .snapshot()
            .into_iter()
            .find(|j| j.kind == JobKind::SyncOrder)
            .unwrap();
        assert_eq!(sync_job.target_id, existing.id);
    }
}
