//! In-memory implementations of the store traits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hotdesk_core::booking::{Booking, BookingStatus};
use hotdesk_core::payment::{Payment, PaymentStatus};
use hotdesk_core::space::{CatalogLink, Space, SpaceSnapshot};
use hotdesk_core::store::{
    BookingStore, PaymentStore, SpaceStore, StoreError, SyncJobStore,
};
use hotdesk_core::sync_job::{SyncEventType, SyncJob, SyncJobStatus};
use hotdesk_core::types::{BookingId, PaymentId, SpaceId};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;

/// In-memory [`BookingStore`].
#[derive(Clone, Default)]
pub struct InMemoryBookingStore {
    bookings: Arc<Mutex<HashMap<BookingId, Booking>>>,
}

impl InMemoryBookingStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state of a booking, for assertions.
    pub async fn get(&self, id: BookingId) -> Option<Booking> {
        self.bookings.lock().await.get(&id).cloned()
    }

    /// Seed a booking directly, bypassing the orchestrator.
    pub async fn seed(&self, booking: Booking) {
        self.bookings.lock().await.insert(booking.id, booking);
    }
}

#[async_trait]
impl BookingStore for InMemoryBookingStore {
    async fn insert(&self, booking: &Booking) -> Result<(), StoreError> {
        self.bookings
            .lock()
            .await
            .insert(booking.id, booking.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: BookingId) -> Result<Option<Booking>, StoreError> {
        Ok(self.bookings.lock().await.get(&id).cloned())
    }

    async fn confirmed_for_space(&self, space_id: SpaceId) -> Result<Vec<Booking>, StoreError> {
        let bookings = self.bookings.lock().await;
        let mut confirmed: Vec<Booking> = bookings
            .values()
            .filter(|b| b.space_id == space_id && b.status == BookingStatus::Confirmed)
            .cloned()
            .collect();
        confirmed.sort_by_key(|b| b.start);
        Ok(confirmed)
    }

    async fn update_status(&self, id: BookingId, status: BookingStatus) -> Result<(), StoreError> {
        let mut bookings = self.bookings.lock().await;
        let booking = bookings.get_mut(&id).ok_or(StoreError::NotFound {
            entity: "booking",
            id: id.to_string(),
        })?;
        booking.status = status;
        Ok(())
    }

    async fn cancel_stale_pending(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut bookings = self.bookings.lock().await;
        let mut cancelled = 0;
        for booking in bookings.values_mut() {
            if booking.status == BookingStatus::Pending && booking.created_at < cutoff {
                booking.status = BookingStatus::Cancelled;
                cancelled += 1;
            }
        }
        Ok(cancelled)
    }
}

/// In-memory [`PaymentStore`] with the session-id uniqueness constraint.
#[derive(Clone, Default)]
pub struct InMemoryPaymentStore {
    payments: Arc<Mutex<Vec<Payment>>>,
}

impl InMemoryPaymentStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded payments, for assertions.
    pub async fn all(&self) -> Vec<Payment> {
        self.payments.lock().await.clone()
    }
}

#[async_trait]
impl PaymentStore for InMemoryPaymentStore {
    async fn insert(&self, payment: &Payment) -> Result<(), StoreError> {
        let mut payments = self.payments.lock().await;
        if payments
            .iter()
            .any(|p| p.gateway_session_id == payment.gateway_session_id)
        {
            return Err(StoreError::UniqueViolation {
                constraint: "payments_gateway_session_id_key".to_string(),
            });
        }
        payments.push(payment.clone());
        Ok(())
    }

    async fn find_by_session(&self, session_id: &str) -> Result<Option<Payment>, StoreError> {
        Ok(self
            .payments
            .lock()
            .await
            .iter()
            .find(|p| p.gateway_session_id == session_id)
            .cloned())
    }

    async fn find_by_booking(&self, booking_id: BookingId) -> Result<Option<Payment>, StoreError> {
        Ok(self
            .payments
            .lock()
            .await
            .iter()
            .rev()
            .find(|p| p.booking_id == booking_id)
            .cloned())
    }

    async fn update_status(&self, id: PaymentId, status: PaymentStatus) -> Result<(), StoreError> {
        let mut payments = self.payments.lock().await;
        let payment = payments
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(StoreError::NotFound {
                entity: "payment",
                id: id.to_string(),
            })?;
        payment.status = status;
        Ok(())
    }

    async fn set_invoice_url(&self, id: PaymentId, url: &str) -> Result<(), StoreError> {
        let mut payments = self.payments.lock().await;
        if let Some(payment) = payments.iter_mut().find(|p| p.id == id) {
            payment.invoice_url = Some(url.to_string());
        }
        Ok(())
    }
}

/// In-memory [`SpaceStore`], paging least-recently-synced first.
#[derive(Clone, Default)]
pub struct InMemorySpaceStore {
    spaces: Arc<Mutex<BTreeMap<uuid::Uuid, Space>>>,
}

impl InMemorySpaceStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a space.
    pub async fn seed(&self, space: Space) {
        self.spaces.lock().await.insert(*space.id.as_uuid(), space);
    }

    /// Current state of a space, for assertions.
    pub async fn get(&self, id: SpaceId) -> Option<Space> {
        self.spaces.lock().await.get(id.as_uuid()).cloned()
    }

    /// Remove a space row, as the site's delete path would.
    pub async fn remove(&self, id: SpaceId) {
        self.spaces.lock().await.remove(id.as_uuid());
    }
}

#[async_trait]
impl SpaceStore for InMemorySpaceStore {
    async fn find_by_id(&self, id: SpaceId) -> Result<Option<Space>, StoreError> {
        Ok(self.spaces.lock().await.get(id.as_uuid()).cloned())
    }

    async fn list_page(&self, offset: u64, limit: usize) -> Result<Vec<Space>, StoreError> {
        let spaces = self.spaces.lock().await;
        let mut ordered: Vec<Space> = spaces.values().cloned().collect();
        // None sorts before Some, matching NULLS FIRST on an ascending index.
        ordered.sort_by_key(|s| (s.last_synced_at, *s.id.as_uuid()));
        let offset = usize::try_from(offset).unwrap_or(usize::MAX);
        Ok(ordered.into_iter().skip(offset).take(limit).collect())
    }

    async fn count(&self) -> Result<u64, StoreError> {
        Ok(self.spaces.lock().await.len() as u64)
    }

    async fn update_catalog_link(&self, id: SpaceId, link: &CatalogLink) -> Result<(), StoreError> {
        let mut spaces = self.spaces.lock().await;
        let space = spaces.get_mut(id.as_uuid()).ok_or(StoreError::NotFound {
            entity: "space",
            id: id.to_string(),
        })?;
        space.catalog_product_id = Some(link.product_id.clone());
        space.catalog_price_id = Some(link.price_id.clone());
        space.last_synced_at = Some(link.synced_at);
        Ok(())
    }
}

/// In-memory [`SyncJobStore`] with lease tracking.
#[derive(Clone, Default)]
pub struct InMemorySyncJobStore {
    inner: Arc<Mutex<SyncJobsInner>>,
}

#[derive(Default)]
struct SyncJobsInner {
    jobs: Vec<SyncJob>,
    leased: HashSet<i64>,
    next_id: i64,
}

impl InMemorySyncJobStore {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All queue rows, for assertions.
    pub async fn all(&self) -> Vec<SyncJob> {
        self.inner.lock().await.jobs.clone()
    }

    /// A specific row, for assertions.
    pub async fn get(&self, id: i64) -> Option<SyncJob> {
        self.inner
            .lock()
            .await
            .jobs
            .iter()
            .find(|j| j.id == id)
            .cloned()
    }
}

#[async_trait]
impl SyncJobStore for InMemorySyncJobStore {
    async fn enqueue(
        &self,
        space_id: SpaceId,
        event_type: SyncEventType,
        payload: &SpaceSnapshot,
    ) -> Result<i64, StoreError> {
        let mut inner = self.inner.lock().await;
        inner.next_id += 1;
        let id = inner.next_id;
        inner.jobs.push(SyncJob {
            id,
            space_id,
            event_type,
            payload: payload.clone(),
            status: SyncJobStatus::Pending,
            error_message: None,
            created_at: Utc::now(),
            processed_at: None,
        });
        Ok(id)
    }

    async fn lease_next(&self, batch_size: usize) -> Result<Vec<SyncJob>, StoreError> {
        let mut inner = self.inner.lock().await;
        let claimed: Vec<SyncJob> = inner
            .jobs
            .iter()
            .filter(|j| j.status == SyncJobStatus::Pending && !inner.leased.contains(&j.id))
            .take(batch_size)
            .cloned()
            .collect();
        for job in &claimed {
            inner.leased.insert(job.id);
        }
        Ok(claimed)
    }

    async fn mark_done(&self, id: i64) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        inner.leased.remove(&id);
        if let Some(job) = inner.jobs.iter_mut().find(|j| j.id == id) {
            job.status = SyncJobStatus::Done;
            job.processed_at = Some(Utc::now());
            job.error_message = None;
        }
        Ok(())
    }

    async fn mark_error(&self, id: i64, message: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        inner.leased.remove(&id);
        if let Some(job) = inner.jobs.iter_mut().find(|j| j.id == id) {
            job.status = SyncJobStatus::Error;
            job.processed_at = Some(Utc::now());
            job.error_message = Some(message.to_string());
        }
        Ok(())
    }

    async fn count_pending(&self) -> Result<i64, StoreError> {
        let inner = self.inner.lock().await;
        let pending = inner
            .jobs
            .iter()
            .filter(|j| j.status == SyncJobStatus::Pending)
            .count();
        Ok(i64::try_from(pending).unwrap_or(i64::MAX))
    }
}
