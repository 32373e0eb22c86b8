//! Reservation orchestration: quote, pending booking, checkout session.

use crate::availability::AvailabilityGuard;
use chrono::{DateTime, Duration, Utc};
use hotdesk_core::booking::{Booking, BookingStatus};
use hotdesk_core::gateway::{CheckoutGateway, CheckoutSessionSpec, GatewayError};
use hotdesk_core::pricing::{self, PricingError};
use hotdesk_core::store::{BookingStore, SpaceStore, StoreError};
use hotdesk_core::types::{BookingId, SpaceId, UserId};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Errors from the reservation path.
#[derive(Error, Debug)]
pub enum ReserveError {
    /// Request rejected before any write; never retried.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The requested space does not exist.
    #[error("Space not found: {0}")]
    SpaceNotFound(SpaceId),

    /// A confirmed booking overlaps the requested range.
    #[error("Space {space_id} is not available for the requested range")]
    Conflict {
        /// The contested space
        space_id: SpaceId,
    },

    /// The gateway refused to open a checkout session; the pending booking
    /// was rolled back to cancelled.
    #[error("Payment session could not be created: {0}")]
    PaymentSessionFailed(#[source] GatewayError),

    /// Store failure; retryable by the caller.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<PricingError> for ReserveError {
    fn from(e: PricingError) -> Self {
        Self::Validation(e.to_string())
    }
}

/// One requested slot.
#[derive(Clone, Debug)]
pub struct ReservationRequest {
    /// Space to book
    pub space_id: SpaceId,
    /// Requesting user
    pub user_id: UserId,
    /// Inclusive start
    pub start: DateTime<Utc>,
    /// Exclusive end
    pub end: DateTime<Utc>,
}

/// Successful reservation: a pending booking and where to send the customer.
#[derive(Clone, Debug)]
pub struct CheckoutRedirect {
    /// The pending booking
    pub booking_id: BookingId,
    /// Hosted checkout page to redirect to
    pub redirect_url: String,
}

/// Creates pending bookings and opens checkout sessions for them.
///
/// The booking is written before the session is requested, so the gateway
/// call can carry the booking id in its metadata; if the session cannot be
/// opened the booking is rolled back to `Cancelled` rather than deleted,
/// keeping an audit trail of the attempt.
pub struct ReservationOrchestrator {
    guard: AvailabilityGuard,
    bookings: Arc<dyn BookingStore>,
    spaces: Arc<dyn SpaceStore>,
    checkout: Arc<dyn CheckoutGateway>,
    currency: String,
    tax_rate_bps: i64,
    pending_ttl: Duration,
}

impl ReservationOrchestrator {
    /// Wire an orchestrator over its stores and gateway.
    #[must_use]
    pub fn new(
        bookings: Arc<dyn BookingStore>,
        spaces: Arc<dyn SpaceStore>,
        checkout: Arc<dyn CheckoutGateway>,
        currency: String,
        tax_rate_bps: i64,
        pending_ttl: Duration,
    ) -> Self {
        Self {
            guard: AvailabilityGuard::new(Arc::clone(&bookings)),
            bookings,
            spaces,
            checkout,
            currency,
            tax_rate_bps,
            pending_ttl,
        }
    }

    /// Reserve one slot: availability, quote, pending booking, checkout
    /// session.
    ///
    /// # Errors
    ///
    /// See [`ReserveError`]. On [`ReserveError::PaymentSessionFailed`] the
    /// pending booking has already been rolled back to cancelled.
    pub async fn reserve(
        &self,
        request: &ReservationRequest,
    ) -> Result<CheckoutRedirect, ReserveError> {
        self.guard
            .ensure_available(request.space_id, request.start, request.end)
            .await?;

        let space = self
            .spaces
            .find_by_id(request.space_id)
            .await?
            .ok_or(ReserveError::SpaceNotFound(request.space_id))?;

        let quote = pricing::quote(
            space.pricing_mode,
            space.active_price(),
            request.start,
            request.end,
            self.tax_rate_bps,
        )?;

        let booking = Booking {
            id: BookingId::new(),
            user_id: request.user_id,
            space_id: request.space_id,
            start: request.start,
            end: request.end,
            status: BookingStatus::Pending,
            amount_net: quote.net,
            amount_gross: quote.gross,
            created_at: Utc::now(),
        };
        self.bookings.insert(&booking).await?;

        let spec = CheckoutSessionSpec {
            booking_id: booking.id,
            space_id: request.space_id,
            user_id: request.user_id,
            amount: quote.gross,
            currency: self.currency.clone(),
            description: format!("{} ({} to {})", space.name, request.start, request.end),
        };

        match self.checkout.create_checkout_session(&spec).await {
            Ok(session) => {
                info!(
                    booking_id = %booking.id,
                    session_id = %session.session_id,
                    amount = %quote.gross,
                    "Reservation pending, checkout session opened"
                );
                metrics::counter!("reservations.created").increment(1);
                Ok(CheckoutRedirect {
                    booking_id: booking.id,
                    redirect_url: session.redirect_url,
                })
            }
            Err(e) => {
                warn!(booking_id = %booking.id, error = %e, "Checkout session failed, rolling back");
                self.bookings
                    .update_status(booking.id, BookingStatus::Cancelled)
                    .await?;
                metrics::counter!("reservations.session_failed").increment(1);
                Err(ReserveError::PaymentSessionFailed(e))
            }
        }
    }

    /// Reserve several slots, independently. One failing slot never aborts
    /// the others; the result vector is positionally aligned with the input.
    pub async fn reserve_batch(
        &self,
        requests: &[ReservationRequest],
    ) -> Vec<Result<CheckoutRedirect, ReserveError>> {
        let mut outcomes = Vec::with_capacity(requests.len());
        for request in requests {
            outcomes.push(self.reserve(request).await);
        }
        outcomes
    }

    /// Cancel pending bookings older than the configured TTL.
    ///
    /// Run periodically; bounds the window in which an abandoned checkout
    /// can shadow a slot.
    ///
    /// # Errors
    ///
    /// Returns [`ReserveError::Store`] if the sweep fails.
    pub async fn expire_stale_pending(&self) -> Result<u64, ReserveError> {
        let cutoff = Utc::now() - self.pending_ttl;
        let cancelled = self.bookings.cancel_stale_pending(cutoff).await?;
        Ok(cancelled)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use hotdesk_core::space::{PricingMode, Space};
    use hotdesk_core::types::Money;
    use hotdesk_testing::{InMemoryBookingStore, InMemorySpaceStore, MockGateway};

    fn at(hour: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, hour, min, 0).single().unwrap()
    }

    fn space(mode: PricingMode) -> Space {
        Space {
            id: SpaceId::new(),
            name: "Corner desk".to_string(),
            description: None,
            capacity: 1,
            pricing_mode: mode,
            hourly_price: Some(Money::from_minor(2000)),
            half_day_price: None,
            daily_price: None,
            monthly_price: None,
            quarterly_price: None,
            yearly_price: None,
            custom_price: None,
            catalog_product_id: None,
            catalog_price_id: None,
            last_synced_at: None,
        }
    }

    struct Fixture {
        bookings: InMemoryBookingStore,
        spaces: InMemorySpaceStore,
        gateway: MockGateway,
        orchestrator: ReservationOrchestrator,
    }

    fn fixture() -> Fixture {
        let bookings = InMemoryBookingStore::new();
        let spaces = InMemorySpaceStore::new();
        let gateway = MockGateway::new();
        let orchestrator = ReservationOrchestrator::new(
            Arc::new(bookings.clone()),
            Arc::new(spaces.clone()),
            Arc::new(gateway.clone()),
            "eur".to_string(),
            2000,
            Duration::minutes(30),
        );
        Fixture {
            bookings,
            spaces,
            gateway,
            orchestrator,
        }
    }

    fn request(space_id: SpaceId) -> ReservationRequest {
        ReservationRequest {
            space_id,
            user_id: UserId::new(),
            start: at(9, 0),
            end: at(11, 0),
        }
    }

    #[tokio::test]
    async fn reserve_creates_pending_booking_and_redirect() {
        let f = fixture();
        let s = space(PricingMode::Hourly);
        let space_id = s.id;
        f.spaces.seed(s).await;

        let redirect = f.orchestrator.reserve(&request(space_id)).await.unwrap();
        assert!(redirect.redirect_url.starts_with("https://checkout.test/"));

        let booking = f.bookings.get(redirect.booking_id).await.unwrap();
        assert_eq!(booking.status, BookingStatus::Pending);
        // 2h at 20.00 net, 20% tax
        assert_eq!(booking.amount_net, Money::from_minor(4000));
        assert_eq!(booking.amount_gross, Money::from_minor(4800));

        let sessions = f.gateway.sessions().await;
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].booking_id, redirect.booking_id);
        assert_eq!(sessions[0].amount, Money::from_minor(4800));
    }

    #[tokio::test]
    async fn gateway_failure_rolls_back_to_cancelled() {
        let f = fixture();
        let s = space(PricingMode::Hourly);
        let space_id = s.id;
        f.spaces.seed(s).await;
        f.gateway.fail_checkout(true);

        let err = f.orchestrator.reserve(&request(space_id)).await.unwrap_err();
        assert!(matches!(err, ReserveError::PaymentSessionFailed(_)));

        let bookings = f.bookings.confirmed_for_space(space_id).await.unwrap();
        assert!(bookings.is_empty());
        // The rolled-back row exists and is cancelled, not deleted.
        let all_cancelled = f
            .orchestrator
            .guard
            .ensure_available(space_id, at(9, 0), at(11, 0))
            .await;
        assert!(all_cancelled.is_ok());
    }

    #[tokio::test]
    async fn unknown_space_rejected() {
        let f = fixture();
        let err = f.orchestrator.reserve(&request(SpaceId::new())).await.unwrap_err();
        assert!(matches!(err, ReserveError::SpaceNotFound(_)));
    }

    #[tokio::test]
    async fn missing_price_is_validation_error() {
        let f = fixture();
        let mut s = space(PricingMode::Daily);
        let space_id = s.id;
        s.daily_price = None;
        f.spaces.seed(s).await;

        let err = f.orchestrator.reserve(&request(space_id)).await.unwrap_err();
        match err {
            ReserveError::Validation(message) => assert!(message.contains("daily_price")),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn batch_is_partial_success() {
        let f = fixture();
        let s = space(PricingMode::Hourly);
        let space_id = s.id;
        f.spaces.seed(s).await;

        let user = UserId::new();
        let requests = vec![
            ReservationRequest { space_id, user_id: user, start: at(9, 0), end: at(10, 0) },
            // Inverted range: rejected without touching the others.
            ReservationRequest { space_id, user_id: user, start: at(12, 0), end: at(11, 0) },
            ReservationRequest { space_id, user_id: user, start: at(10, 0), end: at(11, 0) },
        ];

        let outcomes = f.orchestrator.reserve_batch(&requests).await;
        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].is_ok());
        assert!(matches!(outcomes[1], Err(ReserveError::Validation(_))));
        assert!(outcomes[2].is_ok());
    }

    #[tokio::test]
    async fn stale_pending_reaper_cancels_only_old_pending() {
        let f = fixture();
        let s = space(PricingMode::Hourly);
        let space_id = s.id;
        f.spaces.seed(s).await;

        let old = Booking {
            id: BookingId::new(),
            user_id: UserId::new(),
            space_id,
            start: at(9, 0),
            end: at(10, 0),
            status: BookingStatus::Pending,
            amount_net: Money::from_minor(2000),
            amount_gross: Money::from_minor(2400),
            created_at: Utc::now() - Duration::hours(2),
        };
        let old_id = old.id;
        f.bookings.seed(old).await;

        let fresh = f.orchestrator.reserve(&request(space_id)).await.unwrap();

        let cancelled = f.orchestrator.expire_stale_pending().await.unwrap();
        assert_eq!(cancelled, 1);
        assert_eq!(
            f.bookings.get(old_id).await.unwrap().status,
            BookingStatus::Cancelled
        );
        assert_eq!(
            f.bookings.get(fresh.booking_id).await.unwrap().status,
            BookingStatus::Pending
        );
    }
}
