//! Order entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

use super::item::NewOrderItem;

/// Workflow position of an imported order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "order_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Persisted locally, not yet placed remotely.
    Imported,
    /// Placed in the remote system.
    Placed,
    /// Remote invoice created.
    Invoiced,
    /// Remote shipment created.
    Shipped,
}

impl OrderStatus {
    /// Return the status as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Imported => "imported",
            Self::Placed => "placed",
            Self::Invoiced => "invoiced",
            Self::Shipped => "shipped",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An imported e-commerce order.
///
/// Remote identifiers and milestone timestamps are the idempotence guards
/// for the workflow handlers: a populated field means the corresponding
/// remote step already happened.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Order {
    /// Unique order identifier.
    pub id: i64,
    /// Order number from the source file (unique).
    pub external_ref: String,
    /// Sales channel this order came in through.
    pub channel: String,
    /// Customer e-mail address.
    pub customer_email: String,
    /// Customer first name.
    pub customer_firstname: String,
    /// Customer last name.
    pub customer_lastname: String,
    /// Shipping street line.
    pub street: String,
    /// Shipping city.
    pub city: String,
    /// Shipping postcode.
    pub postcode: String,
    /// ISO country code.
    pub country_code: String,
    /// Payment method code.
    pub payment_method: String,
    /// ISO currency code.
    pub currency: String,
    /// Grand total in minor currency units.
    pub grand_total_cents: i64,
    /// Workflow position.
    pub status: OrderStatus,
    /// Remote cart id, set during sync.
    pub remote_cart_id: Option<String>,
    /// Remote order id; set once the order is placed remotely.
    pub remote_order_id: Option<String>,
    /// Remote invoice id.
    pub remote_invoice_id: Option<String>,
    /// Remote shipment id.
    pub remote_shipment_id: Option<String>,
    /// When the order was placed remotely.
    pub synced_at: Option<DateTime<Utc>>,
    /// When the remote invoice was created.
    pub invoiced_at: Option<DateTime<Utc>>,
    /// When the remote shipment was created.
    pub shipped_at: Option<DateTime<Utc>>,
    /// Original order date from the source file, used for backdating.
    pub ordered_at: Option<DateTime<Utc>>,
    /// When the order row was created.
    pub created_at: DateTime<Utc>,
    /// When the order row was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Data required to create a new order with its line items.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrder {
    /// Order number from the source file.
    pub external_ref: String,
    /// Sales channel.
    pub channel: String,
    /// Customer e-mail address.
    pub customer_email: String,
    /// Customer first name.
    pub customer_firstname: String,
    /// Customer last name.
    pub customer_lastname: String,
    /// Shipping street line.
    pub street: String,
    /// Shipping city.
    pub city: String,
    /// Shipping postcode.
    pub postcode: String,
    /// ISO country code.
    pub country_code: String,
    /// Payment method code.
    pub payment_method: String,
    /// ISO currency code.
    pub currency: String,
    /// Grand total in minor currency units.
    pub grand_total_cents: i64,
    /// Original order date from the source file.
    pub ordered_at: Option<DateTime<Utc>>,
    /// Line items.
    pub items: Vec<NewOrderItem>,
}
