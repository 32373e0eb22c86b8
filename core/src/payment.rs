//! Payment record keyed by the gateway checkout-session id.

use crate::types::{BookingId, Money, PaymentId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Settlement status of a payment record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Funds captured
    Succeeded,
    /// Funds returned; the payment row is kept for history
    Refunded,
}

impl PaymentStatus {
    /// Database string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::Refunded => "refunded",
        }
    }

    /// Parse a status from its database string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "succeeded" => Some(Self::Succeeded),
            "refunded" => Some(Self::Refunded),
            _ => None,
        }
    }
}

/// One settled gateway payment for a booking.
///
/// `gateway_session_id` carries a UNIQUE constraint in the store; it is the
/// natural deduplication key for at-least-once webhook delivery. Exactly one
/// payment row exists per checkout session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    /// Payment identifier
    pub id: PaymentId,
    /// Booking this payment settles
    pub booking_id: BookingId,
    /// Gateway checkout session / intent id (unique)
    pub gateway_session_id: String,
    /// Amount captured, in minor units
    pub amount: Money,
    /// ISO currency code, lowercase
    pub currency: String,
    /// Settlement status
    pub status: PaymentStatus,
    /// Hosted invoice URL, once issued
    pub invoice_url: Option<String>,
    /// When the payment was first recorded
    pub created_at: DateTime<Utc>,
}
