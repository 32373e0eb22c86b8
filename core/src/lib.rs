//! Core domain types and trait seams for the hotdesk reconciliation pipeline.
//!
//! This crate defines WHAT the pipeline talks about (spaces, bookings,
//! payments, sync jobs) and the abstractions it talks through: store traits
//! implemented by `hotdesk-postgres` (and by `hotdesk-testing` for tests),
//! and gateway traits implemented by `hotdesk-gateway`.
//!
//! The crate is deliberately free of I/O. Everything that touches the
//! database or the payment gateway lives behind a trait defined here.

pub mod booking;
pub mod gateway;
pub mod payment;
pub mod pricing;
pub mod space;
pub mod store;
pub mod sync_job;
pub mod types;

pub use booking::{Booking, BookingStatus};
pub use payment::{Payment, PaymentStatus};
pub use space::{CatalogLink, PricingMode, Space, SpaceSnapshot};
pub use store::StoreError;
pub use sync_job::{SyncEventType, SyncJob, SyncJobStatus};
pub use types::{BookingId, Money, PaymentId, SpaceId, UserId};
