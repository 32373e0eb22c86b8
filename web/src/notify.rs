//! Notification scheduling backed by tracing.
//!
//! The booking site's mailer consumes scheduled notifications out of band;
//! this adapter records the intent as a structured event the mailer's
//! ingestion tails. Delivery is therefore decoupled from webhook
//! acknowledgment, which is all the pipeline requires of it.

use async_trait::async_trait;
use hotdesk_core::gateway::{Notification, Notifier, SideEffectError};
use tracing::info;

/// Notifier that emits structured scheduling events.
#[derive(Clone, Copy, Debug, Default)]
pub struct EventLogNotifier;

impl EventLogNotifier {
    /// Create the notifier.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Notifier for EventLogNotifier {
    async fn notify(&self, notification: Notification) -> Result<(), SideEffectError> {
        match notification {
            Notification::BookingConfirmed { booking_id } => {
                info!(booking_id = %booking_id, kind = "booking_confirmed", "Notification scheduled");
            }
            Notification::BookingCancelled { booking_id } => {
                info!(booking_id = %booking_id, kind = "booking_cancelled", "Notification scheduled");
            }
            Notification::BookingRefunded { booking_id } => {
                info!(booking_id = %booking_id, kind = "booking_refunded", "Notification scheduled");
            }
        }
        metrics::counter!("notifications.scheduled").increment(1);
        Ok(())
    }
}
