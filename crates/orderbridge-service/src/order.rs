//! Order queries for the API layer.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use orderbridge_core::error::AppError;
use orderbridge_core::types::pagination::{PageRequest, PageResponse};
use orderbridge_database::repositories::order::OrderRepository;
use orderbridge_entity::order::item::OrderItem;
use orderbridge_entity::order::model::{Order, OrderStatus};

/// An order together with its line items.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderDetails {
    /// The order row.
    pub order: Order,
    /// Its line items.
    pub items: Vec<OrderItem>,
}

/// Read-side order service.
#[derive(Debug, Clone)]
pub struct OrderService {
    /// Order repository.
    order_repo: Arc<OrderRepository>,
}

impl OrderService {
    /// Create a new order service.
    pub fn new(order_repo: Arc<OrderRepository>) -> Self {
        Self { order_repo }
    }

    /// List orders, optionally filtered by workflow status.
    pub async fn list(
        &self,
        status: Option<OrderStatus>,
        page: &PageRequest,
    ) -> Result<PageResponse<Order>, AppError> {
        self.order_repo.find_all(status, page).await
    }

    /// Fetch one order with its line items.
    pub async fn get(&self, order_id: i64) -> Result<OrderDetails, AppError> {
        let order = self
            .order_repo
            .find_by_id(order_id)
            .await?
            .ok_or_else(|| AppError::not_found("Order not found"))?;
        let items = self.order_repo.items(order.id).await?;
        Ok(OrderDetails { order, items })
    }
}
