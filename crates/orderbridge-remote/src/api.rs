//! Remote order system interface contract.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::RemoteError;

/// A line item sent to the remote cart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteCartItem {
    /// Stock keeping unit.
    pub sku: String,
    /// Ordered quantity.
    pub quantity: i32,
    /// Unit price in minor currency units.
    pub unit_price_cents: i64,
}

/// Billing/shipping address sent to the remote cart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteAddress {
    /// Customer e-mail address.
    pub email: String,
    /// Customer first name.
    pub firstname: String,
    /// Customer last name.
    pub lastname: String,
    /// Street line.
    pub street: String,
    /// City.
    pub city: String,
    /// Postcode.
    pub postcode: String,
    /// ISO country code.
    pub country_code: String,
}

/// Stock level reported by the remote inventory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteStock {
    /// Stock keeping unit.
    pub sku: String,
    /// Available quantity.
    pub quantity: i64,
    /// Whether the item is sellable at all.
    pub in_stock: bool,
}

/// Operations of the remote order system.
///
/// Each operation either succeeds with its payload or fails with a
/// [`RemoteError`] carrying the HTTP status and remote message — the
/// signal the transient-error classifier works from. Implementations are
/// not required to be idempotent; the workflow handlers guard against
/// re-execution themselves.
#[async_trait]
pub trait RemoteOrderApi: Send + Sync + std::fmt::Debug {
    /// Create an empty cart; returns the remote cart id.
    async fn create_cart(&self) -> Result<String, RemoteError>;

    /// Add a line item to a cart.
    async fn add_item(&self, cart_id: &str, item: &RemoteCartItem) -> Result<(), RemoteError>;

    /// Set billing/shipping address and shipping method on a cart.
    async fn set_addresses(&self, cart_id: &str, address: &RemoteAddress)
        -> Result<(), RemoteError>;

    /// Set the payment method on a cart.
    async fn set_payment(&self, cart_id: &str, method: &str) -> Result<(), RemoteError>;

    /// Place the order for a prepared cart; returns the remote order id.
    async fn place_order(&self, cart_id: &str) -> Result<String, RemoteError>;

    /// Create an invoice for a placed order; returns the remote invoice id.
    async fn create_invoice(&self, remote_order_id: &str) -> Result<String, RemoteError>;

    /// Create a shipment for an invoiced order; returns the remote shipment id.
    async fn create_shipment(&self, remote_order_id: &str) -> Result<String, RemoteError>;

    /// Attach a comment to a remote order. Callers treat failures here as
    /// non-fatal.
    async fn add_order_comment(
        &self,
        remote_order_id: &str,
        comment: &str,
    ) -> Result<(), RemoteError>;

    /// Look up the stock level for a SKU.
    async fn get_stock(&self, sku: &str) -> Result<RemoteStock, RemoteError>;
}
