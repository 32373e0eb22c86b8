//! Availability checking against confirmed bookings.

use crate::reservation::ReserveError;
use chrono::{DateTime, Utc};
use hotdesk_core::store::BookingStore;
use hotdesk_core::types::SpaceId;
use std::sync::Arc;

/// Read-only overlap check over the confirmed bookings of a space.
///
/// Only `Confirmed` rows block a slot; `Pending` ones do not, so a user's
/// own in-flight checkout never blocks them, at the cost of a short window
/// where two checkouts can race. The webhook side resolves that race (the
/// loser can be refunded), and the stale-pending reaper bounds it.
///
/// A store failure propagates; this never answers "available" on error.
pub struct AvailabilityGuard {
    bookings: Arc<dyn BookingStore>,
}

impl AvailabilityGuard {
    /// Create a guard over a booking store.
    #[must_use]
    pub fn new(bookings: Arc<dyn BookingStore>) -> Self {
        Self { bookings }
    }

    /// Check that `[start, end)` is free on the space.
    ///
    /// # Errors
    ///
    /// Returns [`ReserveError::Validation`] for an empty or inverted range,
    /// [`ReserveError::Conflict`] when a confirmed booking overlaps, and
    /// [`ReserveError::Store`] when the lookup fails.
    pub async fn ensure_available(
        &self,
        space_id: SpaceId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<(), ReserveError> {
        if start >= end {
            return Err(ReserveError::Validation(
                "reservation start must be before end".to_string(),
            ));
        }

        let confirmed = self.bookings.confirmed_for_space(space_id).await?;
        if confirmed.iter().any(|b| b.overlaps(start, end)) {
            return Err(ReserveError::Conflict { space_id });
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use hotdesk_core::booking::{Booking, BookingStatus};
    use hotdesk_core::types::{BookingId, Money, UserId};
    use hotdesk_testing::InMemoryBookingStore;
    use proptest::prelude::*;

    fn at(hour: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, hour, min, 0).single().unwrap()
    }

    fn booking(
        space_id: SpaceId,
        status: BookingStatus,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Booking {
        Booking {
            id: BookingId::new(),
            user_id: UserId::new(),
            space_id,
            start,
            end,
            status,
            amount_net: Money::from_minor(2000),
            amount_gross: Money::from_minor(2400),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn confirmed_overlap_conflicts() {
        let store = InMemoryBookingStore::new();
        let space = SpaceId::new();
        store
            .seed(booking(space, BookingStatus::Confirmed, at(10, 0), at(12, 0)))
            .await;

        let guard = AvailabilityGuard::new(Arc::new(store));
        let err = guard
            .ensure_available(space, at(11, 0), at(13, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, ReserveError::Conflict { .. }));
    }

    #[tokio::test]
    async fn pending_does_not_block() {
        let store = InMemoryBookingStore::new();
        let space = SpaceId::new();
        store
            .seed(booking(space, BookingStatus::Pending, at(10, 0), at(12, 0)))
            .await;

        let guard = AvailabilityGuard::new(Arc::new(store));
        assert!(guard.ensure_available(space, at(10, 0), at(12, 0)).await.is_ok());
    }

    #[tokio::test]
    async fn back_to_back_is_available() {
        let store = InMemoryBookingStore::new();
        let space = SpaceId::new();
        store
            .seed(booking(space, BookingStatus::Confirmed, at(10, 0), at(11, 0)))
            .await;

        let guard = AvailabilityGuard::new(Arc::new(store));
        assert!(guard.ensure_available(space, at(11, 0), at(12, 0)).await.is_ok());
        assert!(guard.ensure_available(space, at(9, 0), at(10, 0)).await.is_ok());
    }

    #[tokio::test]
    async fn other_space_does_not_block() {
        let store = InMemoryBookingStore::new();
        store
            .seed(booking(SpaceId::new(), BookingStatus::Confirmed, at(10, 0), at(12, 0)))
            .await;

        let guard = AvailabilityGuard::new(Arc::new(store));
        assert!(
            guard
                .ensure_available(SpaceId::new(), at(10, 0), at(12, 0))
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn inverted_range_rejected() {
        let guard = AvailabilityGuard::new(Arc::new(InMemoryBookingStore::new()));
        let err = guard
            .ensure_available(SpaceId::new(), at(12, 0), at(10, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, ReserveError::Validation(_)));
    }

    proptest! {
        // The overlap predicate is symmetric, and touching endpoints never
        // conflict under half-open semantics.
        #[test]
        fn overlap_is_symmetric(a in 0i64..500, alen in 1i64..100, b in 0i64..500, blen in 1i64..100) {
            let base = at(0, 0);
            let mk = |s: i64, l: i64| {
                let start = base + chrono::Duration::minutes(s);
                let end = base + chrono::Duration::minutes(s + l);
                booking(SpaceId::new(), BookingStatus::Confirmed, start, end)
            };
            let x = mk(a, alen);
            let y = mk(b, blen);
            prop_assert_eq!(x.overlaps(y.start, y.end), y.overlaps(x.start, x.end));
            if a + alen == b {
                prop_assert!(!x.overlaps(y.start, y.end));
            }
        }
    }
}
