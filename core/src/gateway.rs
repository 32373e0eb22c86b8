//! Payment-gateway trait seams: checkout sessions, catalog products/prices,
//! and the downstream side-effect services.
//!
//! Abstraction over hosted payment processors with a Stripe-shaped API. The
//! production implementation lives in `hotdesk-gateway`; tests use the
//! recording mock in `hotdesk-testing`.

use crate::types::{BookingId, Money, SpaceId, UserId};
use async_trait::async_trait;
use thiserror::Error;

/// Errors from the payment gateway.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Network / transport failure before an API response was obtained.
    #[error("Gateway transport error: {0}")]
    Transport(String),

    /// The gateway rejected the request.
    #[error("Gateway API error ({status}): {message}")]
    Api {
        /// HTTP status
        status: u16,
        /// Gateway-provided message
        message: String,
    },

    /// Webhook signature header missing, malformed, or not matching.
    #[error("Invalid webhook signature")]
    InvalidSignature,

    /// Webhook timestamp outside the replay-defense window.
    #[error("Webhook timestamp outside tolerance: {age_secs}s")]
    StaleTimestamp {
        /// Absolute distance from now, in seconds
        age_secs: i64,
    },

    /// Webhook body is not a well-formed event.
    #[error("Malformed webhook event: {0}")]
    MalformedEvent(String),
}

/// What the orchestrator sends when opening a checkout session.
///
/// `booking_id` travels in the session metadata so the webhook processor can
/// correlate the asynchronous result back to the booking.
#[derive(Clone, Debug, PartialEq)]
pub struct CheckoutSessionSpec {
    /// Booking the session pays for
    pub booking_id: BookingId,
    /// Space context, for gateway-side reporting
    pub space_id: SpaceId,
    /// User context, for gateway-side reporting
    pub user_id: UserId,
    /// Tax-inclusive amount to collect
    pub amount: Money,
    /// ISO currency code, lowercase
    pub currency: String,
    /// Line-item description shown on the hosted page
    pub description: String,
}

/// An open checkout session.
#[derive(Clone, Debug, PartialEq)]
pub struct CheckoutSession {
    /// Gateway session id (becomes the payment dedup key)
    pub session_id: String,
    /// Where to redirect the customer
    pub redirect_url: String,
}

/// Gateway operations used by the reservation path.
#[async_trait]
pub trait CheckoutGateway: Send + Sync {
    /// Open a hosted checkout session.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError`] if the session cannot be created; the
    /// caller rolls the pending booking back to cancelled.
    async fn create_checkout_session(
        &self,
        spec: &CheckoutSessionSpec,
    ) -> Result<CheckoutSession, GatewayError>;
}

/// A catalog product mirrored from a space.
#[derive(Clone, Debug, PartialEq)]
pub struct CatalogProduct {
    /// Gateway product id
    pub id: String,
    /// Product name (the space name)
    pub name: String,
    /// Whether the product is active (archived products are inactive)
    pub active: bool,
    /// Space id carried in the product metadata, when set by us
    pub space_id: Option<SpaceId>,
}

/// A catalog price attached to a product. Immutable once created.
#[derive(Clone, Debug, PartialEq)]
pub struct CatalogPrice {
    /// Gateway price id
    pub id: String,
    /// Owning product id
    pub product_id: String,
    /// Amount in minor units
    pub amount: Money,
    /// ISO currency code, lowercase
    pub currency: String,
    /// Whether the price is active
    pub active: bool,
}

/// Fields written when creating or updating a catalog product.
#[derive(Clone, Debug, PartialEq)]
pub struct ProductSpec {
    /// Product name (the space name)
    pub name: String,
    /// Product description
    pub description: Option<String>,
    /// Space id to tag in the product metadata
    pub space_id: SpaceId,
}

/// Gateway operations used by the catalog sync worker.
#[async_trait]
pub trait CatalogGateway: Send + Sync {
    /// Create a product tagged with the space id in its metadata.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError`] if the API call fails.
    async fn create_product(&self, spec: &ProductSpec) -> Result<CatalogProduct, GatewayError>;

    /// Update an existing product's name, description, and metadata.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError`] if the API call fails.
    async fn update_product(
        &self,
        product_id: &str,
        spec: &ProductSpec,
    ) -> Result<CatalogProduct, GatewayError>;

    /// List all active products, for duplicate-name detection.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError`] if the API call fails.
    async fn list_active_products(&self) -> Result<Vec<CatalogProduct>, GatewayError>;

    /// Deactivate a product, preserving historical references.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError`] if the API call fails.
    async fn archive_product(&self, product_id: &str) -> Result<(), GatewayError>;

    /// Create a price for a product.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError`] if the API call fails.
    async fn create_price(
        &self,
        product_id: &str,
        amount: Money,
        currency: &str,
    ) -> Result<CatalogPrice, GatewayError>;

    /// List the active prices of a product, for exact-match reuse.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError`] if the API call fails.
    async fn list_active_prices(&self, product_id: &str) -> Result<Vec<CatalogPrice>, GatewayError>;
}

/// Failure of a downstream side effect (invoice, notification).
///
/// These never block webhook acknowledgment; callers log and move on.
#[derive(Error, Debug)]
#[error("Side effect failed: {0}")]
pub struct SideEffectError(pub String);

/// Invoice issuing, decoupled from webhook acknowledgment.
#[async_trait]
pub trait Invoicer: Send + Sync {
    /// Issue an invoice for a settled payment; returns the hosted URL.
    ///
    /// # Errors
    ///
    /// Returns [`SideEffectError`] if issuing fails; the caller logs the
    /// failure without blocking the ack.
    async fn issue_invoice(
        &self,
        booking_id: BookingId,
        amount: Money,
        currency: &str,
    ) -> Result<String, SideEffectError>;
}

/// User-facing notification kinds produced by the webhook processor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notification {
    /// Payment captured; booking confirmed
    BookingConfirmed {
        /// Confirmed booking
        booking_id: BookingId,
    },
    /// Payment failed or session expired; booking cancelled
    BookingCancelled {
        /// Cancelled booking
        booking_id: BookingId,
    },
    /// Payment refunded; booking cancelled with a refund record
    BookingRefunded {
        /// Refunded booking
        booking_id: BookingId,
    },
}

/// Notification scheduling, decoupled from webhook acknowledgment.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Schedule a notification for later delivery.
    ///
    /// # Errors
    ///
    /// Returns [`SideEffectError`] if scheduling fails; the caller logs the
    /// failure without blocking the ack.
    async fn notify(&self, notification: Notification) -> Result<(), SideEffectError>;
}
