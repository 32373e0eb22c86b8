//! Shared application state for handlers.

use hotdesk_reconcile::{CatalogSyncWorker, ReservationOrchestrator, WebhookProcessor};
use std::sync::Arc;

/// Handler state: the three pipeline components behind `Arc`s.
#[derive(Clone)]
pub struct AppState {
    /// Reservation orchestration
    pub reservations: Arc<ReservationOrchestrator>,
    /// Webhook settlement
    pub webhooks: Arc<WebhookProcessor>,
    /// Catalog reconciliation
    pub catalog: Arc<CatalogSyncWorker>,
}

impl AppState {
    /// Bundle the pipeline components into handler state.
    #[must_use]
    pub fn new(
        reservations: Arc<ReservationOrchestrator>,
        webhooks: Arc<WebhookProcessor>,
        catalog: Arc<CatalogSyncWorker>,
    ) -> Self {
        Self {
            reservations,
            webhooks,
            catalog,
        }
    }
}
