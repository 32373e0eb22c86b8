//! Idempotent processing of asynchronous gateway webhook events.

use chrono::{DateTime, Utc};
use hotdesk_core::booking::BookingStatus;
use hotdesk_core::gateway::{GatewayError, Invoicer, Notification, Notifier};
use hotdesk_core::payment::{Payment, PaymentStatus};
use hotdesk_core::store::{BookingStore, PaymentStore, StoreError};
use hotdesk_core::types::{BookingId, Money, PaymentId};
use hotdesk_gateway::signature;
use hotdesk_gateway::wire::WebhookEvent;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

/// Errors from webhook processing. Anything here maps to a non-2xx response
/// and a gateway redelivery; idempotent duplicates are NOT errors.
#[derive(Error, Debug)]
pub enum WebhookError {
    /// Signature missing, malformed, stale, or not matching.
    #[error(transparent)]
    Signature(GatewayError),

    /// Body parsed but is not a processable event.
    #[error("Malformed event: {0}")]
    Malformed(String),

    /// Store failure; the gateway will redeliver.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// How an event was settled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// First delivery; state transitions applied.
    Processed,
    /// Redelivery of an already-settled event; acknowledged without writes.
    AlreadyProcessed,
    /// Unknown event type or uncorrelatable payload; acknowledged as a no-op.
    Ignored,
}

/// Verifies, parses, and dispatches gateway webhook deliveries.
///
/// Delivery is at-least-once and unordered. Two mechanisms make processing
/// idempotent: an existence pre-check on the payment row, and the store's
/// unique constraint on `gateway_session_id`, which settles the race two
/// concurrent redeliveries can still reach after both pass the pre-check.
///
/// Invoice and notification side effects run after the state transitions and
/// never block acknowledgment; their failures are logged.
pub struct WebhookProcessor {
    secret: String,
    bookings: Arc<dyn BookingStore>,
    payments: Arc<dyn PaymentStore>,
    invoicer: Arc<dyn Invoicer>,
    notifier: Arc<dyn Notifier>,
}

impl WebhookProcessor {
    /// Wire a processor over its stores and side-effect services.
    #[must_use]
    pub fn new(
        secret: String,
        bookings: Arc<dyn BookingStore>,
        payments: Arc<dyn PaymentStore>,
        invoicer: Arc<dyn Invoicer>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            secret,
            bookings,
            payments,
            invoicer,
            notifier,
        }
    }

    /// Verify and process one delivery. `now` is injected so tests can pin
    /// the signature clock.
    ///
    /// # Errors
    ///
    /// Returns [`WebhookError::Signature`] before reading the body contents,
    /// [`WebhookError::Malformed`] for unparseable or uncorrelatable events,
    /// and [`WebhookError::Store`] when persistence fails (the gateway
    /// redelivers).
    pub async fn process(
        &self,
        signature_header: &str,
        raw_body: &str,
        now: DateTime<Utc>,
    ) -> Result<WebhookOutcome, WebhookError> {
        signature::verify(&self.secret, signature_header, raw_body, now)
            .map_err(WebhookError::Signature)?;

        let event = WebhookEvent::from_body(raw_body)
            .map_err(|e| WebhookError::Malformed(e.to_string()))?;

        let outcome = match event.event_type.as_str() {
            "checkout.session.completed" => self.handle_completed(&event).await?,
            "checkout.session.expired" | "checkout.session.async_payment_failed" => {
                self.handle_abandoned(&event).await?
            }
            "charge.refunded" => self.handle_refunded(&event).await?,
            other => {
                info!(event_id = %event.id, event_type = other, "Unknown event type acknowledged");
                WebhookOutcome::Ignored
            }
        };

        if outcome == WebhookOutcome::AlreadyProcessed {
            metrics::counter!("webhook.duplicate").increment(1);
        }
        Ok(outcome)
    }

    async fn handle_completed(&self, event: &WebhookEvent) -> Result<WebhookOutcome, WebhookError> {
        let session_id = event.data.object.id.clone();

        if self.payments.find_by_session(&session_id).await?.is_some() {
            info!(session_id = %session_id, "Duplicate completion delivery");
            return Ok(WebhookOutcome::AlreadyProcessed);
        }

        let Some(booking_id) = event.data.object.booking_id() else {
            warn!(event_id = %event.id, "Completion event without booking correlation");
            return Ok(WebhookOutcome::Ignored);
        };
        let Some(booking) = self.bookings.find_by_id(booking_id).await? else {
            warn!(event_id = %event.id, booking_id = %booking_id, "Completion for unknown booking");
            return Ok(WebhookOutcome::Ignored);
        };

        let amount = event
            .data
            .object
            .amount_total
            .map_or(booking.amount_gross, Money::from_minor);
        let currency = event
            .data
            .object
            .currency
            .clone()
            .unwrap_or_else(|| "eur".to_string());

        let payment = Payment {
            id: PaymentId::new(),
            booking_id,
            gateway_session_id: session_id.clone(),
            amount,
            currency: currency.clone(),
            status: PaymentStatus::Succeeded,
            invoice_url: None,
            created_at: Utc::now(),
        };

        // Confirm before the payment lands. If the insert then fails, the
        // pre-check still misses on redelivery and this path re-runs; the
        // reverse order would leave a paid booking stuck behind the
        // duplicate ack.
        self.bookings
            .update_status(booking_id, BookingStatus::Confirmed)
            .await?;

        match self.payments.insert(&payment).await {
            Ok(()) => {}
            // A concurrent redelivery won the insert race; its transitions
            // are authoritative and match ours.
            Err(StoreError::UniqueViolation { .. }) => {
                info!(session_id = %session_id, "Lost insert race to concurrent delivery");
                return Ok(WebhookOutcome::AlreadyProcessed);
            }
            Err(e) => return Err(e.into()),
        }
        info!(booking_id = %booking_id, session_id = %session_id, "Booking confirmed");
        metrics::counter!("webhook.confirmed").increment(1);

        self.run_side_effects(&payment, booking_id, &currency).await;
        Ok(WebhookOutcome::Processed)
    }

    async fn run_side_effects(&self, payment: &Payment, booking_id: BookingId, currency: &str) {
        match self
            .invoicer
            .issue_invoice(booking_id, payment.amount, currency)
            .await
        {
            Ok(url) => {
                if let Err(e) = self.payments.set_invoice_url(payment.id, &url).await {
                    error!(booking_id = %booking_id, error = %e, "Failed to record invoice URL");
                }
            }
            Err(e) => {
                error!(booking_id = %booking_id, error = %e, "Invoice issuing failed");
                metrics::counter!("webhook.side_effect_failures", "kind" => "invoice")
                    .increment(1);
            }
        }

        if let Err(e) = self
            .notifier
            .notify(Notification::BookingConfirmed { booking_id })
            .await
        {
            error!(booking_id = %booking_id, error = %e, "Confirmation notification failed");
            metrics::counter!("webhook.side_effect_failures", "kind" => "notify").increment(1);
        }
    }

    async fn handle_abandoned(&self, event: &WebhookEvent) -> Result<WebhookOutcome, WebhookError> {
        let Some(booking_id) = event.data.object.booking_id() else {
            warn!(event_id = %event.id, "Abandonment event without booking correlation");
            return Ok(WebhookOutcome::Ignored);
        };
        let Some(booking) = self.bookings.find_by_id(booking_id).await? else {
            warn!(event_id = %event.id, booking_id = %booking_id, "Abandonment for unknown booking");
            return Ok(WebhookOutcome::Ignored);
        };

        match booking.status {
            BookingStatus::Pending => {
                self.bookings
                    .update_status(booking_id, BookingStatus::Cancelled)
                    .await?;
                info!(booking_id = %booking_id, "Booking cancelled after abandoned checkout");
                metrics::counter!("webhook.cancelled").increment(1);

                if let Err(e) = self
                    .notifier
                    .notify(Notification::BookingCancelled { booking_id })
                    .await
                {
                    error!(booking_id = %booking_id, error = %e, "Cancellation notification failed");
                }
                Ok(WebhookOutcome::Processed)
            }
            BookingStatus::Cancelled => Ok(WebhookOutcome::AlreadyProcessed),
            // A completion already settled this booking; an expiry arriving
            // late (or out of order) must not undo it.
            BookingStatus::Confirmed => {
                warn!(booking_id = %booking_id, "Abandonment event for confirmed booking ignored");
                Ok(WebhookOutcome::Ignored)
            }
        }
    }

    async fn handle_refunded(&self, event: &WebhookEvent) -> Result<WebhookOutcome, WebhookError> {
        let Some(booking_id) = event.data.object.booking_id() else {
            warn!(event_id = %event.id, "Refund event without booking correlation");
            return Ok(WebhookOutcome::Ignored);
        };

        let Some(payment) = self.payments.find_by_booking(booking_id).await? else {
            warn!(event_id = %event.id, booking_id = %booking_id, "Refund with no payment on record");
            return Ok(WebhookOutcome::Ignored);
        };

        if payment.status == PaymentStatus::Refunded {
            return Ok(WebhookOutcome::AlreadyProcessed);
        }

        // The payment row is kept for history; only its status flips.
        self.payments
            .update_status(payment.id, PaymentStatus::Refunded)
            .await?;
        self.bookings
            .update_status(booking_id, BookingStatus::Cancelled)
            .await?;
        info!(booking_id = %booking_id, payment_id = %payment.id, "Payment refunded, booking cancelled");
        metrics::counter!("webhook.refunded").increment(1);

        if let Err(e) = self
            .notifier
            .notify(Notification::BookingRefunded { booking_id })
            .await
        {
            error!(booking_id = %booking_id, error = %e, "Refund notification failed");
        }
        Ok(WebhookOutcome::Processed)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use hotdesk_core::booking::Booking;
    use hotdesk_core::types::{SpaceId, UserId};
    use hotdesk_testing::{
        InMemoryBookingStore, InMemoryPaymentStore, MockInvoicer, MockNotifier,
    };

    const SECRET: &str = "whsec_test";

    struct Fixture {
        bookings: InMemoryBookingStore,
        payments: InMemoryPaymentStore,
        invoicer: MockInvoicer,
        notifier: MockNotifier,
        processor: WebhookProcessor,
    }

    fn fixture() -> Fixture {
        let bookings = InMemoryBookingStore::new();
        let payments = InMemoryPaymentStore::new();
        let invoicer = MockInvoicer::new();
        let notifier = MockNotifier::new();
        let processor = WebhookProcessor::new(
            SECRET.to_string(),
            Arc::new(bookings.clone()),
            Arc::new(payments.clone()),
            Arc::new(invoicer.clone()),
            Arc::new(notifier.clone()),
        );
        Fixture {
            bookings,
            payments,
            invoicer,
            notifier,
            processor,
        }
    }

    async fn seed_pending(f: &Fixture) -> BookingId {
        let booking = Booking {
            id: BookingId::new(),
            user_id: UserId::new(),
            space_id: SpaceId::new(),
            start: Utc::now(),
            end: Utc::now() + chrono::Duration::hours(2),
            status: BookingStatus::Pending,
            amount_net: Money::from_minor(4000),
            amount_gross: Money::from_minor(4800),
            created_at: Utc::now(),
        };
        let id = booking.id;
        f.bookings.seed(booking).await;
        id
    }

    fn event_body(event_type: &str, session_id: &str, booking_id: BookingId) -> String {
        format!(
            r#"{{
                "id": "evt_1",
                "type": "{event_type}",
                "created": 1756100000,
                "data": {{"object": {{
                    "id": "{session_id}",
                    "metadata": {{"booking_id": "{booking_id}"}},
                    "amount_total": 4800,
                    "currency": "eur"
                }}}}
            }}"#
        )
    }

    async fn deliver(f: &Fixture, body: &str) -> Result<WebhookOutcome, WebhookError> {
        let now = Utc::now();
        let header = hotdesk_gateway::sign(SECRET, body, now);
        f.processor.process(&header, body, now).await
    }

    #[tokio::test]
    async fn completion_confirms_and_records_payment() {
        let f = fixture();
        let booking_id = seed_pending(&f).await;
        let body = event_body("checkout.session.completed", "cs_1", booking_id);

        let outcome = deliver(&f, &body).await.unwrap();
        assert_eq!(outcome, WebhookOutcome::Processed);

        let booking = f.bookings.get(booking_id).await.unwrap();
        assert_eq!(booking.status, BookingStatus::Confirmed);

        let payments = f.payments.all().await;
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].gateway_session_id, "cs_1");
        assert_eq!(payments[0].amount, Money::from_minor(4800));
        assert!(payments[0].invoice_url.is_some());

        assert_eq!(f.invoicer.issued().await.len(), 1);
        assert_eq!(
            f.notifier.sent().await,
            vec![Notification::BookingConfirmed { booking_id }]
        );
    }

    #[tokio::test]
    async fn redelivery_is_acknowledged_without_second_payment() {
        let f = fixture();
        let booking_id = seed_pending(&f).await;
        let body = event_body("checkout.session.completed", "cs_1", booking_id);

        assert_eq!(deliver(&f, &body).await.unwrap(), WebhookOutcome::Processed);
        assert_eq!(
            deliver(&f, &body).await.unwrap(),
            WebhookOutcome::AlreadyProcessed
        );

        assert_eq!(f.payments.all().await.len(), 1);
        assert_eq!(f.invoicer.issued().await.len(), 1);
    }

    #[tokio::test]
    async fn redelivery_finishes_a_confirmation_that_lost_its_payment() {
        let f = fixture();
        let booking_id = seed_pending(&f).await;
        // A previous delivery confirmed the booking but crashed before the
        // payment row landed.
        f.bookings
            .update_status(booking_id, BookingStatus::Confirmed)
            .await
            .unwrap();

        let body = event_body("checkout.session.completed", "cs_1", booking_id);
        assert_eq!(deliver(&f, &body).await.unwrap(), WebhookOutcome::Processed);

        assert_eq!(f.payments.all().await.len(), 1);
        assert_eq!(
            f.bookings.get(booking_id).await.unwrap().status,
            BookingStatus::Confirmed
        );
    }

    #[tokio::test]
    async fn side_effect_failure_does_not_block_ack() {
        let f = fixture();
        let booking_id = seed_pending(&f).await;
        f.invoicer.fail(true);
        f.notifier.fail(true);

        let body = event_body("checkout.session.completed", "cs_1", booking_id);
        let outcome = deliver(&f, &body).await.unwrap();

        assert_eq!(outcome, WebhookOutcome::Processed);
        let booking = f.bookings.get(booking_id).await.unwrap();
        assert_eq!(booking.status, BookingStatus::Confirmed);
        let payments = f.payments.all().await;
        assert!(payments[0].invoice_url.is_none());
    }

    #[tokio::test]
    async fn expiry_cancels_pending_booking() {
        let f = fixture();
        let booking_id = seed_pending(&f).await;
        let body = event_body("checkout.session.expired", "cs_1", booking_id);

        assert_eq!(deliver(&f, &body).await.unwrap(), WebhookOutcome::Processed);
        assert_eq!(
            f.bookings.get(booking_id).await.unwrap().status,
            BookingStatus::Cancelled
        );
        assert_eq!(
            f.notifier.sent().await,
            vec![Notification::BookingCancelled { booking_id }]
        );

        // Redelivery: already cancelled.
        assert_eq!(
            deliver(&f, &body).await.unwrap(),
            WebhookOutcome::AlreadyProcessed
        );
    }

    #[tokio::test]
    async fn late_expiry_never_undoes_confirmation() {
        let f = fixture();
        let booking_id = seed_pending(&f).await;

        let completed = event_body("checkout.session.completed", "cs_1", booking_id);
        deliver(&f, &completed).await.unwrap();

        let expired = event_body("checkout.session.expired", "cs_1", booking_id);
        assert_eq!(deliver(&f, &expired).await.unwrap(), WebhookOutcome::Ignored);
        assert_eq!(
            f.bookings.get(booking_id).await.unwrap().status,
            BookingStatus::Confirmed
        );
    }

    #[tokio::test]
    async fn refund_flips_payment_and_cancels_booking() {
        let f = fixture();
        let booking_id = seed_pending(&f).await;

        let completed = event_body("checkout.session.completed", "cs_1", booking_id);
        deliver(&f, &completed).await.unwrap();

        let refunded = event_body("charge.refunded", "ch_1", booking_id);
        assert_eq!(deliver(&f, &refunded).await.unwrap(), WebhookOutcome::Processed);

        let payments = f.payments.all().await;
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].status, PaymentStatus::Refunded);
        assert_eq!(
            f.bookings.get(booking_id).await.unwrap().status,
            BookingStatus::Cancelled
        );

        assert_eq!(
            deliver(&f, &refunded).await.unwrap(),
            WebhookOutcome::AlreadyProcessed
        );
    }

    #[tokio::test]
    async fn unknown_event_type_is_acknowledged() {
        let f = fixture();
        let body = r#"{
            "id": "evt_9",
            "type": "payout.paid",
            "created": 1756100000,
            "data": {"object": {"id": "po_1"}}
        }"#;
        assert_eq!(deliver(&f, body).await.unwrap(), WebhookOutcome::Ignored);
    }

    #[tokio::test]
    async fn bad_signature_rejected_before_parsing() {
        let f = fixture();
        let body = "not even json";
        let now = Utc::now();
        let err = f
            .processor
            .process("t=0,v1=deadbeef", body, now)
            .await
            .unwrap_err();
        assert!(matches!(err, WebhookError::Signature(_)));
    }

    #[tokio::test]
    async fn malformed_body_with_valid_signature_rejected() {
        let f = fixture();
        let body = r#"{"id": "evt_1"}"#;
        let now = Utc::now();
        let header = hotdesk_gateway::sign(SECRET, body, now);
        let err = f.processor.process(&header, body, now).await.unwrap_err();
        assert!(matches!(err, WebhookError::Malformed(_)));
    }
}
