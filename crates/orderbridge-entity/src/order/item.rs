//! Order line item entity model.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A line item of an imported order.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct OrderItem {
    /// Unique item identifier.
    pub id: i64,
    /// Owning order id.
    pub order_id: i64,
    /// Stock keeping unit.
    pub sku: String,
    /// Product display name.
    pub name: String,
    /// Ordered quantity.
    pub quantity: i32,
    /// Unit price in minor currency units.
    pub unit_price_cents: i64,
}

/// Data required to create a new order line item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrderItem {
    /// Stock keeping unit.
    pub sku: String,
    /// Product display name.
    pub name: String,
    /// Ordered quantity.
    pub quantity: i32,
    /// Unit price in minor currency units.
    pub unit_price_cents: i64,
}
