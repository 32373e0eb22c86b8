//! Wire-format types for the gateway's JSON API and webhook deliveries.

use hotdesk_core::gateway::{CatalogPrice, CatalogProduct, GatewayError};
use hotdesk_core::types::{BookingId, Money, SpaceId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Request body for opening a checkout session.
#[derive(Debug, Serialize)]
pub struct CreateSessionRequest {
    /// Amount to collect, in minor units
    pub amount: i64,
    /// ISO currency code, lowercase
    pub currency: String,
    /// Line-item description shown on the hosted page
    pub description: String,
    /// Correlation metadata echoed back on webhook events
    pub metadata: HashMap<String, String>,
    /// Where the hosted page redirects after payment
    pub success_url: String,
    /// Where the hosted page redirects on abandonment
    pub cancel_url: String,
}

/// A checkout session as the gateway returns it.
#[derive(Debug, Deserialize)]
pub struct SessionResponse {
    /// Gateway session id
    pub id: String,
    /// Hosted checkout page URL
    pub url: String,
}

/// Request body for creating or updating a product.
#[derive(Debug, Serialize)]
pub struct ProductRequest {
    /// Product name
    pub name: String,
    /// Product description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Correlation metadata (carries the space id)
    pub metadata: HashMap<String, String>,
}

/// A product as the gateway returns it.
#[derive(Debug, Deserialize)]
pub struct ProductResponse {
    /// Gateway product id
    pub id: String,
    /// Product name
    pub name: String,
    /// Whether the product is active
    pub active: bool,
    /// Product metadata
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl ProductResponse {
    /// Convert into the domain representation, decoding the space id from
    /// metadata when present.
    #[must_use]
    pub fn into_domain(self) -> CatalogProduct {
        let space_id = self
            .metadata
            .get("space_id")
            .and_then(|raw| raw.parse().ok())
            .map(SpaceId::from_uuid);
        CatalogProduct {
            id: self.id,
            name: self.name,
            active: self.active,
            space_id,
        }
    }
}

/// Request body for creating a price.
#[derive(Debug, Serialize)]
pub struct PriceRequest {
    /// Owning product id
    pub product: String,
    /// Amount in minor units
    pub unit_amount: i64,
    /// ISO currency code, lowercase
    pub currency: String,
}

/// A price as the gateway returns it.
#[derive(Debug, Deserialize)]
pub struct PriceResponse {
    /// Gateway price id
    pub id: String,
    /// Owning product id
    pub product: String,
    /// Amount in minor units
    pub unit_amount: i64,
    /// ISO currency code, lowercase
    pub currency: String,
    /// Whether the price is active
    pub active: bool,
}

impl PriceResponse {
    /// Convert into the domain representation.
    #[must_use]
    pub fn into_domain(self) -> CatalogPrice {
        CatalogPrice {
            id: self.id,
            product_id: self.product,
            amount: Money::from_minor(self.unit_amount),
            currency: self.currency,
            active: self.active,
        }
    }
}

/// A paginated list envelope.
#[derive(Debug, Deserialize)]
pub struct ListResponse<T> {
    /// Items on this page
    pub data: Vec<T>,
}

/// Error envelope returned on non-2xx responses.
#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    /// Error detail
    pub error: ErrorDetail,
}

/// The inner error object.
#[derive(Debug, Deserialize)]
pub struct ErrorDetail {
    /// Human-readable message
    #[serde(default)]
    pub message: String,
}

/// Request body for issuing a hosted invoice.
#[derive(Debug, Serialize)]
pub struct InvoiceRequest {
    /// Amount in minor units
    pub amount: i64,
    /// ISO currency code, lowercase
    pub currency: String,
    /// Correlation metadata (carries the booking id)
    pub metadata: HashMap<String, String>,
}

/// An invoice as the gateway returns it.
#[derive(Debug, Deserialize)]
pub struct InvoiceResponse {
    /// Gateway invoice id
    pub id: String,
    /// Hosted invoice URL
    pub hosted_invoice_url: String,
}

/// A webhook event envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    /// Gateway event id
    pub id: String,
    /// Event type, e.g. `checkout.session.completed`
    #[serde(rename = "type")]
    pub event_type: String,
    /// Unix timestamp the gateway created the event
    pub created: i64,
    /// Event payload
    pub data: EventData,
}

/// The `data` member of an event envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct EventData {
    /// The object the event describes
    pub object: EventObject,
}

/// The object inside an event, with the fields the pipeline reads.
///
/// Session events carry the session id and the `amount_total`; charge events
/// carry the originating session id in `payment_intent`-style correlation
/// fields. Everything past `id` is optional because the shape varies by
/// event type.
#[derive(Debug, Clone, Deserialize)]
pub struct EventObject {
    /// Object id (session id for `checkout.session.*` events)
    pub id: String,
    /// Correlation metadata as set at session creation
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    /// Total collected, in minor units
    #[serde(default)]
    pub amount_total: Option<i64>,
    /// ISO currency code
    #[serde(default)]
    pub currency: Option<String>,
    /// Hosted invoice URL, when the gateway already issued one
    #[serde(default)]
    pub hosted_invoice_url: Option<String>,
}

impl EventObject {
    /// The booking id carried in the metadata, if present and well-formed.
    #[must_use]
    pub fn booking_id(&self) -> Option<BookingId> {
        self.metadata
            .get("booking_id")
            .and_then(|raw| BookingId::parse(raw).ok())
    }
}

impl WebhookEvent {
    /// Parse an event from a raw webhook body.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::MalformedEvent`] when the body is not a
    /// well-formed event envelope.
    pub fn from_body(raw_body: &str) -> Result<Self, GatewayError> {
        serde_json::from_str(raw_body).map_err(|e| GatewayError::MalformedEvent(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parses_session_completed_event() {
        let body = r#"{
            "id": "evt_100",
            "type": "checkout.session.completed",
            "created": 1756100000,
            "data": {
                "object": {
                    "id": "cs_test_abc",
                    "metadata": {"booking_id": "7b6a8a52-9f0e-4f10-a640-1db1ce3b2b70"},
                    "amount_total": 2400,
                    "currency": "eur"
                }
            }
        }"#;
        let event = WebhookEvent::from_body(body).unwrap();
        assert_eq!(event.event_type, "checkout.session.completed");
        assert_eq!(event.data.object.id, "cs_test_abc");
        assert_eq!(event.data.object.amount_total, Some(2400));
        assert!(event.data.object.booking_id().is_some());
    }

    #[test]
    fn missing_optional_fields_default() {
        let body = r#"{
            "id": "evt_101",
            "type": "payout.paid",
            "created": 1756100000,
            "data": {"object": {"id": "po_1"}}
        }"#;
        let event = WebhookEvent::from_body(body).unwrap();
        assert!(event.data.object.metadata.is_empty());
        assert!(event.data.object.amount_total.is_none());
        assert!(event.data.object.booking_id().is_none());
    }

    #[test]
    fn malformed_body_rejected() {
        let err = WebhookEvent::from_body("{not json").unwrap_err();
        assert!(matches!(err, GatewayError::MalformedEvent(_)));
    }

    #[test]
    fn product_metadata_decodes_space_id() {
        let body = r#"{
            "id": "prod_1",
            "name": "Desk 4",
            "active": true,
            "metadata": {"space_id": "7b6a8a52-9f0e-4f10-a640-1db1ce3b2b70"}
        }"#;
        let product: ProductResponse = serde_json::from_str(body).unwrap();
        let product = product.into_domain();
        assert!(product.space_id.is_some());
        assert_eq!(product.name, "Desk 4");
    }
}
