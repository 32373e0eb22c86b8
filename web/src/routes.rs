//! Route table.

use crate::handlers::{catalog, health, reservations, webhooks};
use crate::state::AppState;
use axum::routing::{get, post};
use axum::Router;

/// Build the application router.
#[must_use]
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/api/reservations", post(reservations::create))
        .route("/api/reservations/batch", post(reservations::create_batch))
        .route("/webhooks/payment", post(webhooks::receive))
        .route("/api/catalog/sync", post(catalog::sync))
        .with_state(state)
}
