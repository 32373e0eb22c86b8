//! Reconciliation components for the booking site's payment and catalog
//! integration.
//!
//! Four cooperating pieces, all generic over the trait seams in
//! `hotdesk-core`:
//!
//! - [`AvailabilityGuard`]: half-open overlap check against confirmed
//!   bookings
//! - [`ReservationOrchestrator`]: quote, pending booking, checkout session,
//!   rollback on gateway failure
//! - [`WebhookProcessor`]: signature-verified, idempotent settlement of
//!   asynchronous gateway events
//! - [`CatalogSyncWorker`]: durable queue drain that mirrors spaces into
//!   the gateway's product/price catalog

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod availability;
pub mod catalog_sync;
pub mod reservation;
pub mod webhook;

pub use availability::AvailabilityGuard;
pub use catalog_sync::{BatchReport, CatalogSyncWorker, SyncAllReport, SyncError};
pub use reservation::{
    CheckoutRedirect, ReservationOrchestrator, ReservationRequest, ReserveError,
};
pub use webhook::{WebhookOutcome, WebhookProcessor};
