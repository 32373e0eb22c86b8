//! Booking entity and its status state machine.

use crate::types::{BookingId, Money, SpaceId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a booking.
///
/// Created as `Pending` by the reservation orchestrator; moved to
/// `Confirmed` or `Cancelled` by the webhook processor, by the orchestrator's
/// session-failure rollback, or by the stale-pending reaper. Never mutated
/// directly by user action while pending.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    /// Awaiting payment; does not block availability
    Pending,
    /// Paid; occupies its time range
    Confirmed,
    /// Abandoned, failed, or refunded; does not block availability
    Cancelled,
}

impl BookingStatus {
    /// Database string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Parse a status from its database string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "confirmed" => Some(Self::Confirmed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

/// A reservation of a space over a half-open `[start, end)` time range.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    /// Booking identifier
    pub id: BookingId,
    /// Who booked
    pub user_id: UserId,
    /// Which space
    pub space_id: SpaceId,
    /// Inclusive start of the occupied range
    pub start: DateTime<Utc>,
    /// Exclusive end of the occupied range
    pub end: DateTime<Utc>,
    /// Lifecycle status
    pub status: BookingStatus,
    /// Pre-tax total in minor units
    pub amount_net: Money,
    /// Tax-inclusive total in minor units
    pub amount_gross: Money,
    /// Creation timestamp (basis for the stale-pending reaper)
    pub created_at: DateTime<Utc>,
}

impl Booking {
    /// Half-open interval overlap test against another range.
    ///
    /// Back-to-back ranges (one ends exactly when the other starts) do not
    /// overlap.
    #[must_use]
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start < end && self.end > start
    }
}
