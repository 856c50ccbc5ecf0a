//! Order repository implementation.

use sqlx::PgPool;

use orderbridge_core::error::{AppError, ErrorKind};
use orderbridge_core::result::AppResult;
use orderbridge_core::types::pagination::{PageRequest, PageResponse};
use orderbridge_entity::order::item::OrderItem;
use orderbridge_entity::order::model::{NewOrder, Order, OrderStatus};

/// Repository for orders and their line items.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: PgPool,
}

impl OrderRepository {
    /// Create a new order repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create an order together with its line items.
    pub async fn create(&self, new: &NewOrder) -> AppResult<Order> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin order insert", e)
        })?;

        let order = sqlx::query_as::<_, Order>(
            "INSERT INTO orders (external_ref, channel, customer_email, customer_firstname, \
             customer_lastname, street, city, postcode, country_code, payment_method, \
             currency, grand_total_cents, ordered_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) RETURNING *",
        )
        .bind(&new.external_ref)
        .bind(&new.channel)
        .bind(&new.customer_email)
        .bind(&new.customer_firstname)
        .bind(&new.customer_lastname)
        .bind(&new.street)
        .bind(&new.city)
        .bind(&new.postcode)
        .bind(&new.country_code)
        .bind(&new.payment_method)
        .bind(&new.currency)
        .bind(new.grand_total_cents)
        .bind(new.ordered_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to insert order", e))?;

        for item in &new.items {
            sqlx::query(
                "INSERT INTO order_items (order_id, sku, name, quantity, unit_price_cents) \
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(order.id)
            .bind(&item.sku)
            .bind(&item.name)
            .bind(item.quantity)
            .bind(item.unit_price_cents)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to insert order item", e)
            })?;
        }

        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit order insert", e)
        })?;

        Ok(order)
    }

    /// Find an order by id.
    pub async fn find_by_id(&self, order_id: i64) -> AppResult<Option<Order>> {
        sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1")
            .bind(order_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find order", e))
    }

    /// Find an order by its source order number.
    pub async fn find_by_external_ref(&self, external_ref: &str) -> AppResult<Option<Order>> {
        sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE external_ref = $1")
            .bind(external_ref)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find order", e))
    }

    /// Load the line items of an order.
    pub async fn items(&self, order_id: i64) -> AppResult<Vec<OrderItem>> {
        sqlx::query_as::<_, OrderItem>(
            "SELECT * FROM order_items WHERE order_id = $1 ORDER BY id ASC",
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to load order items", e))
    }

    /// List orders, newest first, optionally filtered by status.
    pub async fn find_all(
        &self,
        status: Option<OrderStatus>,
        page: &PageRequest,
    ) -> AppResult<PageResponse<Order>> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM orders WHERE ($1::order_status IS NULL OR status = $1)",
        )
        .bind(status)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to count orders", e))?;

        let orders = sqlx::query_as::<_, Order>(
            "SELECT * FROM orders WHERE ($1::order_status IS NULL OR status = $1) \
             ORDER BY id DESC LIMIT $2 OFFSET $3",
        )
        .bind(status)
        .bind(page.limit() as i64)
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list orders", e))?;

        Ok(PageResponse::new(
            orders,
            page.page,
            page.page_size,
            total as u64,
        ))
    }

    /// Record the remote placement of an order.
    pub async fn set_placed(
        &self,
        order_id: i64,
        remote_cart_id: &str,
        remote_order_id: &str,
    ) -> AppResult<()> {
        sqlx::query(
            "UPDATE orders SET status = 'placed', remote_cart_id = $2, remote_order_id = $3, \
             synced_at = NOW(), updated_at = NOW() WHERE id = $1",
        )
        .bind(order_id)
        .bind(remote_cart_id)
        .bind(remote_order_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to mark order placed", e))?;
        Ok(())
    }

    /// Record the remote invoice of an order.
    pub async fn set_invoiced(&self, order_id: i64, remote_invoice_id: &str) -> AppResult<()> {
        sqlx::query(
            "UPDATE orders SET status = 'invoiced', remote_invoice_id = $2, \
             invoiced_at = NOW(), updated_at = NOW() WHERE id = $1",
        )
        .bind(order_id)
        .bind(remote_invoice_id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to mark order invoiced", e)
        })?;
        Ok(())
    }

    /// Record the remote shipment of an order.
    pub async fn set_shipped(&self, order_id: i64, remote_shipment_id: &str) -> AppResult<()> {
        sqlx::query(
            "UPDATE orders SET status = 'shipped', remote_shipment_id = $2, \
             shipped_at = NOW(), updated_at = NOW() WHERE id = $1",
        )
        .bind(order_id)
        .bind(remote_shipment_id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to mark order shipped", e)
        })?;
        Ok(())
    }
}
