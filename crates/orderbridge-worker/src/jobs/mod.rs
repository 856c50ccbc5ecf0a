//! Workflow job handlers and the store seams they run against.
//!
//! Handlers depend on narrow traits instead of the concrete sqlx
//! repositories so the workflow logic is exercisable against in-memory
//! fakes; the production impls below just delegate.

use async_trait::async_trait;

use orderbridge_core::result::AppResult;
use orderbridge_database::repositories::import::ImportRepository;
use orderbridge_database::repositories::order::OrderRepository;
use orderbridge_entity::channel::rule::ChannelPolicy;
use orderbridge_entity::import::batch::ImportBatch;
use orderbridge_entity::import::row::ImportRow;
use orderbridge_entity::order::item::OrderItem;
use orderbridge_entity::order::model::{NewOrder, Order};
use orderbridge_service::channel::ChannelPolicyService;

pub mod import;
pub mod invoice;
pub mod ship;
pub mod sync;

pub use import::ImportOrdersHandler;
pub use invoice::InvoiceOrderHandler;
pub use ship::ShipOrderHandler;
pub use sync::SyncOrderHandler;

/// Order reads and milestone writes used by the workflow handlers.
#[async_trait]
pub trait OrderStore: Send + Sync + std::fmt::Debug {
    /// Find an order by id.
    async fn find_order(&self, order_id: i64) -> AppResult<Option<Order>>;

    /// Find an order by its source order number.
    async fn find_order_by_external_ref(&self, external_ref: &str) -> AppResult<Option<Order>>;

    /// Load the line items of an order.
    async fn order_items(&self, order_id: i64) -> AppResult<Vec<OrderItem>>;

    /// Create an order with its line items.
    async fn create_order(&self, new: &NewOrder) -> AppResult<Order>;

    /// Record the remote placement of an order.
    async fn set_placed(
        &self,
        order_id: i64,
        remote_cart_id: &str,
        remote_order_id: &str,
    ) -> AppResult<()>;

    /// Record the remote invoice of an order.
    async fn set_invoiced(&self, order_id: i64, remote_invoice_id: &str) -> AppResult<()>;

    /// Record the remote shipment of an order.
    async fn set_shipped(&self, order_id: i64, remote_shipment_id: &str) -> AppResult<()>;
}

#[async_trait]
impl OrderStore for OrderRepository {
    async fn find_order(&self, order_id: i64) -> AppResult<Option<Order>> {
        self.find_by_id(order_id).await
    }

    async fn find_order_by_external_ref(&self, external_ref: &str) -> AppResult<Option<Order>> {
        self.find_by_external_ref(external_ref).await
    }

    async fn order_items(&self, order_id: i64) -> AppResult<Vec<OrderItem>> {
        self.items(order_id).await
    }

    async fn create_order(&self, new: &NewOrder) -> AppResult<Order> {
        self.create(new).await
    }

    async fn set_placed(
        &self,
        order_id: i64,
        remote_cart_id: &str,
        remote_order_id: &str,
    ) -> AppResult<()> {
        OrderRepository::set_placed(self, order_id, remote_cart_id, remote_order_id).await
    }

    async fn set_invoiced(&self, order_id: i64, remote_invoice_id: &str) -> AppResult<()> {
        OrderRepository::set_invoiced(self, order_id, remote_invoice_id).await
    }

    async fn set_shipped(&self, order_id: i64, remote_shipment_id: &str) -> AppResult<()> {
        OrderRepository::set_shipped(self, order_id, remote_shipment_id).await
    }
}

/// Channel policy lookup used by the sync and invoice handlers.
#[async_trait]
pub trait PolicyResolver: Send + Sync + std::fmt::Debug {
    /// Resolve the automation policy for a channel.
    async fn resolve(&self, channel: &str) -> AppResult<ChannelPolicy>;
}

#[async_trait]
impl PolicyResolver for ChannelPolicyService {
    async fn resolve(&self, channel: &str) -> AppResult<ChannelPolicy> {
        ChannelPolicyService::resolve(self, channel).await
    }
}

/// Import staging reads and writes used by the import handler.
#[async_trait]
pub trait ImportStore: Send + Sync + std::fmt::Debug {
    /// Find a batch by id.
    async fn find_batch(&self, batch_id: i64) -> AppResult<Option<ImportBatch>>;

    /// Load the rows of a batch still awaiting processing.
    async fn staged_rows(&self, batch_id: i64) -> AppResult<Vec<ImportRow>>;

    /// Mark a row as materialized into an order.
    async fn mark_row_imported(&self, row_id: i64) -> AppResult<()>;

    /// Mark a row as invalid with a row-level error.
    async fn mark_row_invalid(&self, row_id: i64, error: &str) -> AppResult<()>;

    /// Transition a batch to processing.
    async fn set_batch_processing(&self, batch_id: i64) -> AppResult<()>;

    /// Finalize a batch with counters derived from its row statuses.
    async fn finalize_batch(&self, batch_id: i64) -> AppResult<ImportBatch>;
}

#[async_trait]
impl ImportStore for ImportRepository {
    async fn find_batch(&self, batch_id: i64) -> AppResult<Option<ImportBatch>> {
        ImportRepository::find_batch(self, batch_id).await
    }

    async fn staged_rows(&self, batch_id: i64) -> AppResult<Vec<ImportRow>> {
        ImportRepository::staged_rows(self, batch_id).await
    }

    async fn mark_row_imported(&self, row_id: i64) -> AppResult<()> {
        ImportRepository::mark_row_imported(self, row_id).await
    }

    async fn mark_row_invalid(&self, row_id: i64, error: &str) -> AppResult<()> {
        ImportRepository::mark_row_invalid(self, row_id, error).await
    }

    async fn set_batch_processing(&self, batch_id: i64) -> AppResult<()> {
        ImportRepository::set_batch_processing(self, batch_id).await
    }

    async fn finalize_batch(&self, batch_id: i64) -> AppResult<ImportBatch> {
        ImportRepository::finalize_batch(self, batch_id).await
    }
}
