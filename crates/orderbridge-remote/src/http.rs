//! HTTP implementation of the remote order system client.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use orderbridge_core::config::remote::RemoteConfig;
use orderbridge_core::error::AppError;

use crate::api::{RemoteAddress, RemoteCartItem, RemoteOrderApi, RemoteStock};
use crate::error::RemoteError;

/// `reqwest`-based client for the remote order API.
#[derive(Debug, Clone)]
pub struct HttpRemoteOrderApi {
    client: reqwest::Client,
    base_url: String,
    api_token: String,
}

/// Remote id envelope used by cart/order/invoice/shipment creation.
#[derive(Debug, Deserialize)]
struct IdResponse {
    id: String,
}

/// Remote error envelope; falls back to the raw body when absent.
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    message: String,
}

/// Remote stock envelope.
#[derive(Debug, Deserialize)]
struct StockResponse {
    sku: String,
    qty: i64,
    is_in_stock: bool,
}

impl HttpRemoteOrderApi {
    /// Build a client from configuration.
    pub fn new(config: &RemoteConfig) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_token: config.api_token.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Execute a request and map the response into the remote error shape.
    async fn execute<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, RemoteError> {
        let response = request
            .bearer_auth(&self.api_token)
            .send()
            .await
            .map_err(|e| RemoteError::network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.message)
                .unwrap_or(body);
            return Err(RemoteError::status(status.as_u16(), message));
        }

        // A malformed success body gives no usable signal either way;
        // classify like a dropped connection.
        response
            .json::<T>()
            .await
            .map_err(|e| RemoteError::network(format!("invalid response body: {e}")))
    }

    /// Execute a request whose response body is irrelevant.
    async fn execute_empty(&self, request: reqwest::RequestBuilder) -> Result<(), RemoteError> {
        let response = request
            .bearer_auth(&self.api_token)
            .send()
            .await
            .map_err(|e| RemoteError::network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.message)
                .unwrap_or(body);
            return Err(RemoteError::status(status.as_u16(), message));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteOrderApi for HttpRemoteOrderApi {
    async fn create_cart(&self) -> Result<String, RemoteError> {
        debug!("Creating remote cart");
        let response: IdResponse = self
            .execute(self.client.post(self.url("/carts")))
            .await?;
        Ok(response.id)
    }

    async fn add_item(&self, cart_id: &str, item: &RemoteCartItem) -> Result<(), RemoteError> {
        debug!(cart_id, sku = %item.sku, "Adding item to remote cart");
        self.execute_empty(
            self.client
                .post(self.url(&format!("/carts/{cart_id}/items")))
                .json(item),
        )
        .await
    }

    async fn set_addresses(
        &self,
        cart_id: &str,
        address: &RemoteAddress,
    ) -> Result<(), RemoteError> {
        debug!(cart_id, "Setting remote cart addresses");
        self.execute_empty(
            self.client
                .post(self.url(&format!("/carts/{cart_id}/addresses")))
                .json(address),
        )
        .await
    }

    async fn set_payment(&self, cart_id: &str, method: &str) -> Result<(), RemoteError> {
        debug!(cart_id, method, "Setting remote cart payment method");
        self.execute_empty(
            self.client
                .put(self.url(&format!("/carts/{cart_id}/payment")))
                .json(&serde_json::json!({ "method": method })),
        )
        .await
    }

    async fn place_order(&self, cart_id: &str) -> Result<String, RemoteError> {
        debug!(cart_id, "Placing remote order");
        let response: IdResponse = self
            .execute(self.client.post(self.url(&format!("/carts/{cart_id}/order"))))
            .await?;
        Ok(response.id)
    }

    async fn create_invoice(&self, remote_order_id: &str) -> Result<String, RemoteError> {
        debug!(remote_order_id, "Creating remote invoice");
        let response: IdResponse = self
            .execute(
                self.client
                    .post(self.url(&format!("/orders/{remote_order_id}/invoice"))),
            )
            .await?;
        Ok(response.id)
    }

    async fn create_shipment(&self, remote_order_id: &str) -> Result<String, RemoteError> {
        debug!(remote_order_id, "Creating remote shipment");
        let response: IdResponse = self
            .execute(
                self.client
                    .post(self.url(&format!("/orders/{remote_order_id}/ship"))),
            )
            .await?;
        Ok(response.id)
    }

    async fn add_order_comment(
        &self,
        remote_order_id: &str,
        comment: &str,
    ) -> Result<(), RemoteError> {
        debug!(remote_order_id, "Adding remote order comment");
        self.execute_empty(
            self.client
                .post(self.url(&format!("/orders/{remote_order_id}/comments")))
                .json(&serde_json::json!({ "comment": comment })),
        )
        .await
    }

    async fn get_stock(&self, sku: &str) -> Result<RemoteStock, RemoteError> {
        debug!(sku, "Fetching remote stock");
        let response: StockResponse = self
            .execute(self.client.get(self.url(&format!("/stock/{sku}"))))
            .await?;
        Ok(RemoteStock {
            sku: response.sku,
            quantity: response.qty,
            in_stock: response.is_in_stock,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> RemoteConfig {
        RemoteConfig {
            base_url: "http://remote.test/api/".to_string(),
            api_token: "token".to_string(),
            request_timeout_seconds: 5,
            validate_stock: true,
        }
    }

    #[test]
    fn base_url_trailing_slash_is_normalized() {
        let api = HttpRemoteOrderApi::new(&test_config()).unwrap();
        assert_eq!(api.url("/carts"), "http://remote.test/api/carts");
    }
}
