//! HTTP client for the payment gateway's REST API.

use crate::wire::{
    CreateSessionRequest, ErrorResponse, InvoiceRequest, InvoiceResponse, ListResponse,
    PriceRequest, PriceResponse, ProductRequest, ProductResponse, SessionResponse,
};
use async_trait::async_trait;
use hotdesk_core::gateway::{
    CatalogGateway, CatalogPrice, CatalogProduct, CheckoutGateway, CheckoutSession,
    CheckoutSessionSpec, GatewayError, Invoicer, ProductSpec, SideEffectError,
};
use hotdesk_core::types::{BookingId, Money};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, instrument};

/// Configuration for [`HttpGateway`].
#[derive(Clone, Debug)]
pub struct HttpGatewayConfig {
    /// API base URL, without a trailing slash
    pub base_url: String,
    /// Bearer token for API authentication
    pub api_key: String,
    /// Redirect target after successful payment
    pub success_url: String,
    /// Redirect target after abandonment
    pub cancel_url: String,
    /// Per-request timeout
    pub timeout: Duration,
}

/// Production gateway client over HTTPS.
pub struct HttpGateway {
    client: reqwest::Client,
    config: HttpGatewayConfig,
}

impl HttpGateway {
    /// Build a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Transport`] if the underlying HTTP client
    /// cannot be constructed.
    pub fn new(config: HttpGatewayConfig) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url)
    }

    async fn post<B: Serialize + Sync, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, GatewayError> {
        let response = self
            .client
            .post(self.url(path))
            .bearer_auth(&self.config.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        Self::decode(response).await
    }

    async fn get<R: DeserializeOwned>(&self, path: &str) -> Result<R, GatewayError> {
        let response = self
            .client
            .get(self.url(path))
            .bearer_auth(&self.config.api_key)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        Self::decode(response).await
    }

    async fn decode<R: DeserializeOwned>(response: reqwest::Response) -> Result<R, GatewayError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map_or(body, |e| e.error.message);
            return Err(GatewayError::Api {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&body).map_err(|e| GatewayError::Transport(e.to_string()))
    }
}

#[async_trait]
impl CheckoutGateway for HttpGateway {
    #[instrument(skip(self, spec), fields(booking_id = %spec.booking_id))]
    async fn create_checkout_session(
        &self,
        spec: &CheckoutSessionSpec,
    ) -> Result<CheckoutSession, GatewayError> {
        let mut metadata = HashMap::new();
        metadata.insert("booking_id".to_string(), spec.booking_id.to_string());
        metadata.insert("space_id".to_string(), spec.space_id.to_string());
        metadata.insert("user_id".to_string(), spec.user_id.to_string());

        let request = CreateSessionRequest {
            amount: spec.amount.minor(),
            currency: spec.currency.clone(),
            description: spec.description.clone(),
            metadata,
            success_url: self.config.success_url.clone(),
            cancel_url: self.config.cancel_url.clone(),
        };

        let session: SessionResponse = self.post("/v1/checkout/sessions", &request).await?;
        debug!(session_id = %session.id, "Checkout session opened");

        Ok(CheckoutSession {
            session_id: session.id,
            redirect_url: session.url,
        })
    }
}

fn product_request(spec: &ProductSpec) -> ProductRequest {
    let mut metadata = HashMap::new();
    metadata.insert("space_id".to_string(), spec.space_id.to_string());
    ProductRequest {
        name: spec.name.clone(),
        description: spec.description.clone(),
        metadata,
    }
}

#[async_trait]
impl CatalogGateway for HttpGateway {
    #[instrument(skip(self, spec), fields(space_id = %spec.space_id))]
    async fn create_product(&self, spec: &ProductSpec) -> Result<CatalogProduct, GatewayError> {
        let product: ProductResponse = self.post("/v1/products", &product_request(spec)).await?;
        Ok(product.into_domain())
    }

    #[instrument(skip(self, spec), fields(space_id = %spec.space_id))]
    async fn update_product(
        &self,
        product_id: &str,
        spec: &ProductSpec,
    ) -> Result<CatalogProduct, GatewayError> {
        let path = format!("/v1/products/{product_id}");
        let product: ProductResponse = self.post(&path, &product_request(spec)).await?;
        Ok(product.into_domain())
    }

    #[instrument(skip(self))]
    async fn list_active_products(&self) -> Result<Vec<CatalogProduct>, GatewayError> {
        let list: ListResponse<ProductResponse> =
            self.get("/v1/products?active=true&limit=100").await?;
        Ok(list.data.into_iter().map(ProductResponse::into_domain).collect())
    }

    #[instrument(skip(self))]
    async fn archive_product(&self, product_id: &str) -> Result<(), GatewayError> {
        let path = format!("/v1/products/{product_id}");
        let body = serde_json::json!({ "active": false });
        let _: ProductResponse = self.post(&path, &body).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn create_price(
        &self,
        product_id: &str,
        amount: Money,
        currency: &str,
    ) -> Result<CatalogPrice, GatewayError> {
        let request = PriceRequest {
            product: product_id.to_string(),
            unit_amount: amount.minor(),
            currency: currency.to_string(),
        };
        let price: PriceResponse = self.post("/v1/prices", &request).await?;
        Ok(price.into_domain())
    }

    #[instrument(skip(self))]
    async fn list_active_prices(
        &self,
        product_id: &str,
    ) -> Result<Vec<CatalogPrice>, GatewayError> {
        let path = format!("/v1/prices?product={product_id}&active=true&limit=100");
        let list: ListResponse<PriceResponse> = self.get(&path).await?;
        Ok(list.data.into_iter().map(PriceResponse::into_domain).collect())
    }
}

#[async_trait]
impl Invoicer for HttpGateway {
    async fn issue_invoice(
        &self,
        booking_id: BookingId,
        amount: Money,
        currency: &str,
    ) -> Result<String, SideEffectError> {
        let mut metadata = HashMap::new();
        metadata.insert("booking_id".to_string(), booking_id.to_string());

        let request = InvoiceRequest {
            amount: amount.minor(),
            currency: currency.to_string(),
            metadata,
        };
        let invoice: InvoiceResponse = self
            .post("/v1/invoices", &request)
            .await
            .map_err(|e| SideEffectError(e.to_string()))?;

        debug!(booking_id = %booking_id, invoice_id = %invoice.id, "Invoice issued");
        Ok(invoice.hosted_invoice_url)
    }
}
