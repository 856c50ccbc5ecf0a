//! Import row entity model and the parsed row schema.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

use crate::order::{NewOrder, NewOrderItem};

/// Lifecycle of a single staged row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "import_row_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ImportRowStatus {
    /// Staged, not yet processed.
    Staged,
    /// Materialized into an order.
    Imported,
    /// Rejected with a row-level error.
    Invalid,
}

impl ImportRowStatus {
    /// Return the status as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Staged => "staged",
            Self::Imported => "imported",
            Self::Invalid => "invalid",
        }
    }
}

impl fmt::Display for ImportRowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One staged row of an import batch.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ImportRow {
    /// Unique row identifier.
    pub id: i64,
    /// Owning batch id.
    pub batch_id: i64,
    /// 1-based line number in the source file.
    pub line_number: i32,
    /// The parsed source row (JSON), decoded as [`OrderRowInput`].
    pub payload: serde_json::Value,
    /// Row lifecycle status.
    pub status: ImportRowStatus,
    /// Row-level error message, set when invalid.
    pub error: Option<String>,
    /// When the row was staged.
    pub created_at: DateTime<Utc>,
    /// When the row was last updated.
    pub updated_at: DateTime<Utc>,
}

/// A parsed order row as delivered by the upstream file parser.
///
/// Delimited-file parsing and header normalization happen outside this
/// system; the import API receives rows already in this shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRowInput {
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
    /// Original order date.
    pub ordered_at: Option<DateTime<Utc>>,
    /// Line items.
    pub items: Vec<OrderRowItemInput>,
}

/// A parsed line item within an order row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRowItemInput {
    /// Stock keeping unit.
    pub sku: String,
    /// Product display name.
    pub name: String,
    /// Ordered quantity.
    pub quantity: i32,
    /// Unit price in minor currency units.
    pub unit_price_cents: i64,
}

impl OrderRowInput {
    /// Check the semantic constraints the parser cannot enforce.
    pub fn validate(&self) -> Result<(), String> {
        if self.external_ref.is_empty() {
            return Err("missing order reference".to_string());
        }
        if self.items.is_empty() {
            return Err(format!("order '{}' has no line items", self.external_ref));
        }
        for item in &self.items {
            if item.sku.is_empty() {
                return Err(format!("order '{}' has an item without a SKU", self.external_ref));
            }
            if item.quantity <= 0 {
                return Err(format!(
                    "order '{}' item '{}' has non-positive quantity {}",
                    self.external_ref, item.sku, item.quantity
                ));
            }
        }
        Ok(())
    }

    /// Convert into the persistence shape.
    pub fn into_new_order(self) -> NewOrder {
        NewOrder {
            external_ref: self.external_ref,
            channel: self.channel,
            customer_email: self.customer_email,
            customer_firstname: self.customer_firstname,
            customer_lastname: self.customer_lastname,
            street: self.street,
            city: self.city,
            postcode: self.postcode,
            country_code: self.country_code,
            payment_method: self.payment_method,
            currency: self.currency,
            grand_total_cents: self.grand_total_cents,
            ordered_at: self.ordered_at,
            items: self
                .items
                .into_iter()
                .map(|item| NewOrderItem {
                    sku: item.sku,
                    name: item.name,
                    quantity: item.quantity,
                    unit_price_cents: item.unit_price_cents,
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_row() -> OrderRowInput {
        OrderRowInput {
            external_ref: "SO-1001".to_string(),
            channel: "webshop".to_string(),
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
            items: vec![OrderRowItemInput {
                sku: "SKU-1".to_string(),
                name: "Widget".to_string(),
                quantity: 2,
                unit_price_cents: 2499,
            }],
        }
    }

    #[test]
    fn valid_row_passes() {
        assert!(sample_row().validate().is_ok());
    }

    #[test]
    fn empty_items_rejected() {
        let mut row = sample_row();
        row.items.clear();
        assert!(row.validate().is_err());
    }

    #[test]
    fn non_positive_quantity_rejected() {
        let mut row = sample_row();
        row.items[0].quantity = 0;
        assert!(row.validate().is_err());
    }
}
