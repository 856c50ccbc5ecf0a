//! In-memory fakes shared by the worker tests.
//!
//! The in-memory job store mirrors the claim semantics of the sqlx
//! repository: due-job selection in ascending id order, atomic attempt
//! increment with the transition to running, and idempotent enqueue per
//! `(kind, target_id)`.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use orderbridge_core::result::AppResult;
use orderbridge_entity::channel::rule::ChannelPolicy;
use orderbridge_entity::import::batch::{ImportBatch, ImportBatchStatus};
use orderbridge_entity::import::row::{ImportRow, ImportRowStatus};
use orderbridge_entity::job::model::{Job, NewJob};
use orderbridge_entity::job::status::JobStatus;
use orderbridge_entity::order::item::OrderItem;
use orderbridge_entity::order::model::{NewOrder, Order, OrderStatus};
use orderbridge_remote::api::{RemoteAddress, RemoteCartItem, RemoteOrderApi, RemoteStock};
use orderbridge_remote::error::RemoteError;

use crate::jobs::{ImportStore, OrderStore, PolicyResolver};
use crate::store::JobStore;

// ── Job store ────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct JobTable {
    jobs: BTreeMap<i64, Job>,
    next_id: i64,
}

/// In-memory job store with the production claim semantics.
#[derive(Debug, Default)]
pub struct InMemoryJobStore {
    inner: Mutex<JobTable>,
}

impl InMemoryJobStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot every job, for assertions.
    pub fn snapshot(&self) -> Vec<Job> {
        self.inner.lock().unwrap().jobs.values().cloned().collect()
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn enqueue(&self, new: &NewJob) -> AppResult<Job> {
        let mut table = self.inner.lock().unwrap();
        let existing_id = table
            .jobs
            .values()
            .find(|j| j.kind == new.kind && j.target_id == new.target_id)
            .map(|j| j.id);

        if let Some(id) = existing_id {
            let job = table.jobs.get_mut(&id).unwrap();
            if job.status.is_terminal() {
                job.status = JobStatus::Pending;
                job.attempts = 0;
                job.last_error = None;
                job.next_run_at = None;
                job.worker_id = None;
                job.payload = new.payload.clone();
                job.max_attempts = new.max_attempts;
                job.updated_at = Utc::now();
            }
            return Ok(job.clone());
        }

        table.next_id += 1;
        let id = table.next_id;
        let now = Utc::now();
        let job = Job {
            id,
            kind: new.kind,
            target_id: new.target_id,
            payload: new.payload.clone(),
            status: JobStatus::Pending,
            attempts: 0,
            max_attempts: new.max_attempts,
            next_run_at: None,
            last_error: None,
            worker_id: None,
            created_at: now,
            updated_at: now,
        };
        table.jobs.insert(id, job.clone());
        Ok(job)
    }

    async fn claim_due(&self, limit: i64, worker_id: &str) -> AppResult<Vec<Job>> {
        let mut table = self.inner.lock().unwrap();
        let now = Utc::now();
        let due: Vec<i64> = table
            .jobs
            .values()
            .filter(|j| j.status.is_claimable())
            .filter(|j| j.next_run_at.map_or(true, |at| at <= now))
            .map(|j| j.id)
            .take(limit as usize)
            .collect();

        let mut claimed = Vec::with_capacity(due.len());
        for id in due {
            let job = table.jobs.get_mut(&id).unwrap();
            job.status = JobStatus::Running;
            job.attempts += 1;
            job.worker_id = Some(worker_id.to_string());
            job.updated_at = now;
            claimed.push(job.clone());
        }
        Ok(claimed)
    }

    async fn mark_done(&self, job_id: i64) -> AppResult<()> {
        let mut table = self.inner.lock().unwrap();
        if let Some(job) = table.jobs.get_mut(&job_id) {
            job.status = JobStatus::Done;
            job.last_error = None;
            job.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn mark_failed(&self, job_id: i64, message: &str) -> AppResult<()> {
        let mut table = self.inner.lock().unwrap();
        if let Some(job) = table.jobs.get_mut(&job_id) {
            job.status = JobStatus::Failed;
            job.last_error = Some(message.to_string());
            job.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn schedule_retry(&self, job_id: i64, message: &str, delay: Duration) -> AppResult<()> {
        let mut table = self.inner.lock().unwrap();
        if let Some(job) = table.jobs.get_mut(&job_id) {
            job.status = JobStatus::Retry;
            job.last_error = Some(message.to_string());
            job.next_run_at = Some(Utc::now() + chrono::Duration::seconds(delay.as_secs() as i64));
            job.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn reenable(&self, job_id: i64) -> AppResult<bool> {
        let mut table = self.inner.lock().unwrap();
        match table.jobs.get_mut(&job_id) {
            Some(job) if job.status.is_terminal() => {
                job.status = JobStatus::Pending;
                job.attempts = 0;
                job.last_error = None;
                job.next_run_at = None;
                job.worker_id = None;
                job.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn find_by_id(&self, job_id: i64) -> AppResult<Option<Job>> {
        Ok(self.inner.lock().unwrap().jobs.get(&job_id).cloned())
    }
}

// ── Order store ──────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct OrderTable {
    orders: BTreeMap<i64, Order>,
    items: HashMap<i64, Vec<OrderItem>>,
    next_order_id: i64,
    next_item_id: i64,
}

/// In-memory order store.
#[derive(Debug, Default)]
pub struct InMemoryOrders {
    inner: Mutex<OrderTable>,
}

impl InMemoryOrders {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrders {
    async fn find_order(&self, order_id: i64) -> AppResult<Option<Order>> {
        Ok(self.inner.lock().unwrap().orders.get(&order_id).cloned())
    }

    async fn find_order_by_external_ref(&self, external_ref: &str) -> AppResult<Option<Order>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .orders
            .values()
            .find(|o| o.external_ref == external_ref)
            .cloned())
    }

    async fn order_items(&self, order_id: i64) -> AppResult<Vec<OrderItem>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .items
            .get(&order_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn create_order(&self, new: &NewOrder) -> AppResult<Order> {
        let mut table = self.inner.lock().unwrap();
        table.next_order_id += 1;
        let id = table.next_order_id;
        let now = Utc::now();
        let order = Order {
            id,
            external_ref: new.external_ref.clone(),
            channel: new.channel.clone(),
            customer_email: new.customer_email.clone(),
            customer_firstname: new.customer_firstname.clone(),
            customer_lastname: new.customer_lastname.clone(),
            street: new.street.clone(),
            city: new.city.clone(),
            postcode: new.postcode.clone(),
            country_code: new.country_code.clone(),
            payment_method: new.payment_method.clone(),
            currency: new.currency.clone(),
            grand_total_cents: new.grand_total_cents,
            status: OrderStatus::Imported,
            remote_cart_id: None,
            remote_order_id: None,
            remote_invoice_id: None,
            remote_shipment_id: None,
            synced_at: None,
            invoiced_at: None,
            shipped_at: None,
            ordered_at: new.ordered_at,
            created_at: now,
            updated_at: now,
        };
        table.orders.insert(id, order.clone());
        let items = new
            .items
            .iter()
            .map(|item| {
                table.next_item_id += 1;
                OrderItem {
                    id: table.next_item_id,
                    order_id: id,
                    sku: item.sku.clone(),
                    name: item.name.clone(),
                    quantity: item.quantity,
                    unit_price_cents: item.unit_price_cents,
                }
            })
            .collect();
        table.items.insert(id, items);
        Ok(order)
    }

    async fn set_placed(
        &self,
        order_id: i64,
        remote_cart_id: &str,
        remote_order_id: &str,
    ) -> AppResult<()> {
        let mut table = self.inner.lock().unwrap();
        if let Some(order) = table.orders.get_mut(&order_id) {
            order.status = OrderStatus::Placed;
            order.remote_cart_id = Some(remote_cart_id.to_string());
            order.remote_order_id = Some(remote_order_id.to_string());
            order.synced_at = Some(Utc::now());
            order.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn set_invoiced(&self, order_id: i64, remote_invoice_id: &str) -> AppResult<()> {
        let mut table = self.inner.lock().unwrap();
        if let Some(order) = table.orders.get_mut(&order_id) {
            order.status = OrderStatus::Invoiced;
            order.remote_invoice_id = Some(remote_invoice_id.to_string());
            order.invoiced_at = Some(Utc::now());
            order.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn set_shipped(&self, order_id: i64, remote_shipment_id: &str) -> AppResult<()> {
        let mut table = self.inner.lock().unwrap();
        if let Some(order) = table.orders.get_mut(&order_id) {
            order.status = OrderStatus::Shipped;
            order.remote_shipment_id = Some(remote_shipment_id.to_string());
            order.shipped_at = Some(Utc::now());
            order.updated_at = Utc::now();
        }
        Ok(())
    }
}

// ── Import store ─────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct ImportTable {
    batches: BTreeMap<i64, ImportBatch>,
    rows: BTreeMap<i64, ImportRow>,
    next_batch_id: i64,
    next_row_id: i64,
}

/// In-memory import staging store.
#[derive(Debug, Default)]
pub struct InMemoryImports {
    inner: Mutex<ImportTable>,
}

impl InMemoryImports {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage a batch with the given row payloads, for test setup.
    pub fn stage(&self, source_name: &str, payloads: Vec<serde_json::Value>) -> ImportBatch {
        let mut table = self.inner.lock().unwrap();
        table.next_batch_id += 1;
        let batch_id = table.next_batch_id;
        let now = Utc::now();
        let batch = ImportBatch {
            id: batch_id,
            source_name: source_name.to_string(),
            total_rows: payloads.len() as i32,
            imported_rows: 0,
            failed_rows: 0,
            status: ImportBatchStatus::Staged,
            created_at: now,
            updated_at: now,
        };
        table.batches.insert(batch_id, batch.clone());
        for (index, payload) in payloads.into_iter().enumerate() {
            table.next_row_id += 1;
            let row_id = table.next_row_id;
            table.rows.insert(
                row_id,
                ImportRow {
                    id: row_id,
                    batch_id,
                    line_number: (index + 1) as i32,
                    payload,
                    status: ImportRowStatus::Staged,
                    error: None,
                    created_at: now,
                    updated_at: now,
                },
            );
        }
        batch
    }

    /// Snapshot the rows of a batch, for assertions.
    pub fn rows(&self, batch_id: i64) -> Vec<ImportRow> {
        self.inner
            .lock()
            .unwrap()
            .rows
            .values()
            .filter(|r| r.batch_id == batch_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl ImportStore for InMemoryImports {
    async fn find_batch(&self, batch_id: i64) -> AppResult<Option<ImportBatch>> {
        Ok(self.inner.lock().unwrap().batches.get(&batch_id).cloned())
    }

    async fn staged_rows(&self, batch_id: i64) -> AppResult<Vec<ImportRow>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .rows
            .values()
            .filter(|r| r.batch_id == batch_id && r.status == ImportRowStatus::Staged)
            .cloned()
            .collect())
    }

    async fn mark_row_imported(&self, row_id: i64) -> AppResult<()> {
        let mut table = self.inner.lock().unwrap();
        if let Some(row) = table.rows.get_mut(&row_id) {
            row.status = ImportRowStatus::Imported;
            row.error = None;
            row.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn mark_row_invalid(&self, row_id: i64, error: &str) -> AppResult<()> {
        let mut table = self.inner.lock().unwrap();
        if let Some(row) = table.rows.get_mut(&row_id) {
            row.status = ImportRowStatus::Invalid;
            row.error = Some(error.to_string());
            row.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn set_batch_processing(&self, batch_id: i64) -> AppResult<()> {
        let mut table = self.inner.lock().unwrap();
        if let Some(batch) = table.batches.get_mut(&batch_id) {
            batch.status = ImportBatchStatus::Processing;
            batch.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn finalize_batch(&self, batch_id: i64) -> AppResult<ImportBatch> {
        let mut table = self.inner.lock().unwrap();
        let imported = table
            .rows
            .values()
            .filter(|r| r.batch_id == batch_id && r.status == ImportRowStatus::Imported)
            .count() as i32;
        let failed = table
            .rows
            .values()
            .filter(|r| r.batch_id == batch_id && r.status == ImportRowStatus::Invalid)
            .count() as i32;
        let batch = table.batches.get_mut(&batch_id).unwrap();
        batch.imported_rows = imported;
        batch.failed_rows = failed;
        batch.status = if failed > 0 {
            ImportBatchStatus::CompletedWithErrors
        } else {
            ImportBatchStatus::Completed
        };
        batch.updated_at = Utc::now();
        Ok(batch.clone())
    }
}

// ── Policy resolver ──────────────────────────────────────────────────

/// Policy resolver returning a fixed policy for every channel.
#[derive(Debug, Default)]
pub struct StaticPolicy {
    /// The policy returned for every channel.
    pub policy: ChannelPolicy,
}

impl StaticPolicy {
    /// Create a resolver with the given flags.
    pub fn new(auto_invoice: bool, auto_ship: bool) -> Self {
        Self {
            policy: ChannelPolicy {
                auto_invoice,
                auto_ship,
            },
        }
    }
}

#[async_trait]
impl PolicyResolver for StaticPolicy {
    async fn resolve(&self, _channel: &str) -> AppResult<ChannelPolicy> {
        Ok(self.policy)
    }
}

// ── Remote API mock ──────────────────────────────────────────────────

/// Scriptable remote order system.
///
/// Records every call by operation name; operations listed in
/// `failures` fail with the scripted error instead.
#[derive(Debug, Default)]
pub struct MockRemote {
    calls: Mutex<Vec<String>>,
    failures: Mutex<HashMap<&'static str, RemoteError>>,
    stock: Mutex<HashMap<String, RemoteStock>>,
    counter: AtomicU64,
}

impl MockRemote {
    /// Create a mock with no scripted failures.
    pub fn new() -> Self {
        Self::default()
    }

    /// Script `op` to fail with `error` on every call.
    pub fn fail_op(&self, op: &'static str, error: RemoteError) {
        self.failures.lock().unwrap().insert(op, error);
    }

    /// Configure the stock answer for a SKU.
    pub fn set_stock(&self, sku: &str, quantity: i64, in_stock: bool) {
        self.stock.lock().unwrap().insert(
            sku.to_string(),
            RemoteStock {
                sku: sku.to_string(),
                quantity,
                in_stock,
            },
        );
    }

    /// Take and clear the recorded calls.
    pub fn take_calls(&self) -> Vec<String> {
        std::mem::take(&mut *self.calls.lock().unwrap())
    }

    fn record(&self, op: &'static str) -> Result<(), RemoteError> {
        self.calls.lock().unwrap().push(op.to_string());
        match self.failures.lock().unwrap().get(op) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    fn next_id(&self, prefix: &str) -> String {
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        format!("{prefix}-{n}")
    }
}

#[async_trait]
impl RemoteOrderApi for MockRemote {
    async fn create_cart(&self) -> Result<String, RemoteError> {
        self.record("create_cart")?;
        Ok(self.next_id("cart"))
    }

    async fn add_item(&self, _cart_id: &str, _item: &RemoteCartItem) -> Result<(), RemoteError> {
        self.record("add_item")
    }

    async fn set_addresses(
        &self,
        _cart_id: &str,
        _address: &RemoteAddress,
    ) -> Result<(), RemoteError> {
        self.record("set_addresses")
    }

    async fn set_payment(&self, _cart_id: &str, _method: &str) -> Result<(), RemoteError> {
        self.record("set_payment")
    }

    async fn place_order(&self, _cart_id: &str) -> Result<String, RemoteError> {
        self.record("place_order")?;
        Ok(self.next_id("order"))
    }

    async fn create_invoice(&self, _remote_order_id: &str) -> Result<String, RemoteError> {
        self.record("create_invoice")?;
        Ok(self.next_id("invoice"))
    }

    async fn create_shipment(&self, _remote_order_id: &str) -> Result<String, RemoteError> {
        self.record("create_shipment")?;
        Ok(self.next_id("shipment"))
    }

    async fn add_order_comment(
        &self,
        _remote_order_id: &str,
        _comment: &str,
    ) -> Result<(), RemoteError> {
        self.record("add_order_comment")
    }

    async fn get_stock(&self, sku: &str) -> Result<RemoteStock, RemoteError> {
        self.record("get_stock")?;
        self.stock
            .lock()
            .unwrap()
            .get(sku)
            .cloned()
            .ok_or_else(|| RemoteError::status(404, format!("SKU '{sku}' not found")))
    }
}

/// A representative order row for test setup.
pub fn sample_new_order(external_ref: &str, channel: &str) -> NewOrder {
    NewOrder {
        external_ref: external_ref.to_string(),
        channel: channel.to_string(),
        customer_email: "jane@example.com".to_string(),
        customer_firstname: "Jane".to_string(),
        customer_lastname: "Doe".to_string(),
        street: "1 Main St".to_string(),
        city: "Springfield".to_string(),
        postcode: "12345".to_string(),
        country_code: "US".to_string(),
        payment_method: "banktransfer".to_string(),
        currency: "USD".to_string(),
        grand_total_cents: 4998,
        ordered_at: None,
        items: vec![orderbridge_entity::order::item::NewOrderItem {
            sku: "SKU-1".to_string(),
            name: "Widget".to_string(),
            quantity: 2,
            unit_price_cents: 2499,
        }],
    }
}
