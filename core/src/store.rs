//! Store traits for bookings, payments, spaces, and the sync-job queue.
//!
//! # Design
//!
//! Each trait is deliberately minimal: exactly the operations the pipeline
//! components need, nothing the CRUD front end uses. The queue trait follows
//! an `enqueue` / `lease_next` / `mark_done` / `mark_error` discipline so a
//! long queue is drained in bounded batches and concurrent workers never
//! double-process a job.
//!
//! # Implementations
//!
//! - `hotdesk-postgres` (production): sqlx over `PostgreSQL`
//! - `hotdesk-testing` (tests): in-memory, deterministic

use crate::booking::{Booking, BookingStatus};
use crate::payment::{Payment, PaymentStatus};
use crate::space::{CatalogLink, Space, SpaceSnapshot};
use crate::sync_job::{SyncEventType, SyncJob};
use crate::types::{BookingId, PaymentId, SpaceId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors from store operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database connection or query error. Retryable by the caller.
    #[error("Database error: {0}")]
    Database(String),

    /// Referenced row does not exist.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Entity kind
        entity: &'static str,
        /// Row identifier
        id: String,
    },

    /// A uniqueness constraint rejected the write.
    ///
    /// For payment inserts this is the canonical "already processed" signal:
    /// the constraint on the gateway session id, not the application-level
    /// existence pre-check, is what resolves concurrent webhook redeliveries.
    #[error("Unique constraint violated: {constraint}")]
    UniqueViolation {
        /// Constraint or index name
        constraint: String,
    },

    /// Row payload could not be decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Persistence for bookings.
#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Insert a new booking row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the insert fails.
    async fn insert(&self, booking: &Booking) -> Result<(), StoreError>;

    /// Fetch a booking by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the query fails.
    async fn find_by_id(&self, id: BookingId) -> Result<Option<Booking>, StoreError>;

    /// All confirmed bookings for a space, for overlap checking.
    ///
    /// Pending bookings are intentionally excluded so a reservation does not
    /// block itself during its own pending window.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the query fails.
    async fn confirmed_for_space(&self, space_id: SpaceId) -> Result<Vec<Booking>, StoreError>;

    /// Set a booking's status.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if no such booking exists, or
    /// [`StoreError::Database`] if the update fails.
    async fn update_status(&self, id: BookingId, status: BookingStatus) -> Result<(), StoreError>;

    /// Cancel all pending bookings created before `cutoff`; returns how many
    /// rows were flipped.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the update fails.
    async fn cancel_stale_pending(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError>;
}

/// Persistence for payment records.
///
/// Implementations must enforce a uniqueness constraint on
/// `gateway_session_id` and surface its violation as
/// [`StoreError::UniqueViolation`].
#[async_trait]
pub trait PaymentStore: Send + Sync {
    /// Insert a payment row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UniqueViolation`] when a row for the same
    /// gateway session id already exists, or [`StoreError::Database`] on
    /// other failures.
    async fn insert(&self, payment: &Payment) -> Result<(), StoreError>;

    /// Look up a payment by gateway session id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the query fails.
    async fn find_by_session(&self, session_id: &str) -> Result<Option<Payment>, StoreError>;

    /// Look up a payment by booking id (refund events correlate through the
    /// booking carried in the charge metadata).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the query fails.
    async fn find_by_booking(&self, booking_id: BookingId) -> Result<Option<Payment>, StoreError>;

    /// Set a payment's settlement status.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if no such payment exists, or
    /// [`StoreError::Database`] if the update fails.
    async fn update_status(&self, id: PaymentId, status: PaymentStatus) -> Result<(), StoreError>;

    /// Record the hosted invoice URL on a payment, best effort.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the update fails.
    async fn set_invoice_url(&self, id: PaymentId, url: &str) -> Result<(), StoreError>;
}

/// Persistence for spaces, restricted to what the pipeline needs.
#[async_trait]
pub trait SpaceStore: Send + Sync {
    /// Fetch a space by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the query fails.
    async fn find_by_id(&self, id: SpaceId) -> Result<Option<Space>, StoreError>;

    /// A page of spaces for bulk resync, least-recently-synced first.
    ///
    /// Never-synced spaces sort ahead of synced ones, so repeated bounded
    /// calls make progress: each pass pushes the spaces it touched to the
    /// back of the ordering.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the query fails.
    async fn list_page(&self, offset: u64, limit: usize) -> Result<Vec<Space>, StoreError>;

    /// Total number of spaces (for the bulk `remaining` count).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the query fails.
    async fn count(&self) -> Result<u64, StoreError>;

    /// Write the catalog pointer columns, and only those, onto a space.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if no such space exists, or
    /// [`StoreError::Database`] if the update fails.
    async fn update_catalog_link(&self, id: SpaceId, link: &CatalogLink) -> Result<(), StoreError>;
}

/// The durable sync-job queue.
#[async_trait]
pub trait SyncJobStore: Send + Sync {
    /// Append a pending job with a payload snapshot; returns the job id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the insert fails.
    async fn enqueue(
        &self,
        space_id: SpaceId,
        event_type: SyncEventType,
        payload: &SpaceSnapshot,
    ) -> Result<i64, StoreError>;

    /// Claim up to `batch_size` pending jobs, oldest first.
    ///
    /// Claimed jobs must not be handed to a concurrent caller; they stay
    /// `pending` on the row until their terminal mark.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the claim fails.
    async fn lease_next(&self, batch_size: usize) -> Result<Vec<SyncJob>, StoreError>;

    /// Terminal success transition.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the update fails.
    async fn mark_done(&self, id: i64) -> Result<(), StoreError>;

    /// Terminal failure transition with the recorded error text.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the update fails.
    async fn mark_error(&self, id: i64, message: &str) -> Result<(), StoreError>;

    /// Number of pending jobs, for monitoring.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the query fails.
    async fn count_pending(&self) -> Result<i64, StoreError>;
}
