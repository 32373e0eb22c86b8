//! Catalog reconciliation: mirrors spaces into the gateway's product/price
//! catalog, driven by the durable sync-job queue.

use chrono::Utc;
use hotdesk_core::gateway::{CatalogGateway, CatalogProduct, GatewayError, ProductSpec};
use hotdesk_core::space::{CatalogLink, SpaceSnapshot};
use hotdesk_core::store::{SpaceStore, StoreError, SyncJobStore};
use hotdesk_core::sync_job::{SyncEventType, SyncJob};
use hotdesk_core::types::{Money, SpaceId};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Errors from syncing one space. Recorded on the job row (queue path) or in
/// the per-space report (bulk path); never aborts sibling work.
#[derive(Error, Debug)]
pub enum SyncError {
    /// A required field is missing or invalid; the message names it.
    #[error("Space {space_id} failed validation: field {field} {reason}")]
    Validation {
        /// The space being synced
        space_id: SpaceId,
        /// Offending field (e.g. `name`, `hourly_price`)
        field: &'static str,
        /// What is wrong with it
        reason: &'static str,
    },

    /// An active catalog product already carries this name for a different
    /// space; creating another would make checkout ambiguous.
    #[error("Catalog already has an active product named {name:?} for another space")]
    DuplicateCatalogEntry {
        /// The contested product name
        name: String,
    },

    /// The space row is gone and the payload cannot stand alone.
    #[error("Space not found: {0}")]
    SpaceNotFound(SpaceId),

    /// Catalog API failure; retry by fresh enqueue.
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// Store failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Outcome of draining one leased batch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Jobs marked done
    pub processed: usize,
    /// Jobs marked error
    pub failed: usize,
}

/// Outcome of a bounded bulk resync.
#[derive(Clone, Debug, Default)]
pub struct SyncAllReport {
    /// Spaces synced successfully
    pub success_count: usize,
    /// Spaces that failed
    pub error_count: usize,
    /// Error text per failed space
    pub per_space_errors: Vec<(SpaceId, String)>,
    /// Spaces beyond the batch bound, still unsynced
    pub remaining: u64,
}

/// Drains the sync-job queue and reconciles spaces against the catalog.
///
/// Products are created once and updated thereafter; prices are immutable on
/// the gateway side, so a price change creates a new price and relinks,
/// reusing an existing active price when its amount and currency already
/// match exactly. Deleting a space archives its product, preserving the
/// references historical payments hold.
pub struct CatalogSyncWorker {
    spaces: Arc<dyn SpaceStore>,
    queue: Arc<dyn SyncJobStore>,
    catalog: Arc<dyn CatalogGateway>,
    currency: String,
    batch_size: usize,
}

/// The validated inputs one sync needs.
struct EffectiveSpace {
    name: String,
    description: Option<String>,
    price: Money,
    product_id: Option<String>,
}

impl CatalogSyncWorker {
    /// Wire a worker over its stores and the catalog gateway.
    #[must_use]
    pub fn new(
        spaces: Arc<dyn SpaceStore>,
        queue: Arc<dyn SyncJobStore>,
        catalog: Arc<dyn CatalogGateway>,
        currency: String,
        batch_size: usize,
    ) -> Self {
        Self {
            spaces,
            queue,
            catalog,
            currency,
            batch_size,
        }
    }

    /// Lease and process one batch of queued jobs. Each job succeeds or
    /// fails independently and is marked on its own row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] only when the queue itself fails; per-job sync
    /// errors land on the job rows and in the report.
    pub async fn run_batch(&self) -> Result<BatchReport, StoreError> {
        let jobs = self.queue.lease_next(self.batch_size).await?;
        let mut report = BatchReport::default();

        for job in &jobs {
            match self.process_job(job).await {
                Ok(()) => {
                    self.queue.mark_done(job.id).await?;
                    report.processed += 1;
                }
                Err(e) => {
                    warn!(job_id = job.id, space_id = %job.space_id, error = %e, "Sync job failed");
                    self.queue.mark_error(job.id, &e.to_string()).await?;
                    report.failed += 1;
                }
            }
        }

        if report.processed > 0 || report.failed > 0 {
            info!(
                processed = report.processed,
                failed = report.failed,
                "Sync batch drained"
            );
        }
        Ok(report)
    }

    /// Resync up to `batch_size`-bounded page of all spaces directly,
    /// bypassing the queue.
    ///
    /// The page is least-recently-synced first, so each invocation picks up
    /// where the last one left off; repeated calls drain `remaining` to zero.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the space listing fails; per-space sync
    /// errors are collected into the report instead.
    pub async fn sync_all(&self) -> Result<SyncAllReport, StoreError> {
        let total = self.spaces.count().await?;
        let page = self.spaces.list_page(0, self.batch_size).await?;
        let scanned = page.len() as u64;

        let mut report = SyncAllReport {
            remaining: total.saturating_sub(scanned),
            ..SyncAllReport::default()
        };

        for space in &page {
            let snapshot = SpaceSnapshot::from(space);
            match self.sync_space(space.id, &snapshot).await {
                Ok(()) => report.success_count += 1,
                Err(e) => {
                    report.error_count += 1;
                    report.per_space_errors.push((space.id, e.to_string()));
                }
            }
        }

        info!(
            success = report.success_count,
            errors = report.error_count,
            remaining = report.remaining,
            "Bulk catalog resync finished"
        );
        Ok(report)
    }

    async fn process_job(&self, job: &SyncJob) -> Result<(), SyncError> {
        match job.event_type {
            SyncEventType::Delete => self.archive_space(job).await,
            SyncEventType::Insert | SyncEventType::Update => {
                self.sync_space(job.space_id, &job.payload).await
            }
        }
    }

    async fn archive_space(&self, job: &SyncJob) -> Result<(), SyncError> {
        // The space row is usually gone by now; the product pointer travels
        // in the payload.
        let product_id = match &job.payload.catalog_product_id {
            Some(id) => id.clone(),
            None => match self.spaces.find_by_id(job.space_id).await? {
                Some(space) => match space.catalog_product_id {
                    Some(id) => id,
                    None => {
                        info!(space_id = %job.space_id, "Nothing to archive, space never synced");
                        return Ok(());
                    }
                },
                None => {
                    info!(space_id = %job.space_id, "Nothing to archive, space never synced");
                    return Ok(());
                }
            },
        };

        self.catalog.archive_product(&product_id).await?;
        info!(space_id = %job.space_id, product_id = %product_id, "Catalog product archived");
        metrics::counter!("catalog_sync.archived").increment(1);
        Ok(())
    }

    /// Create-or-update the product, reuse-or-create the price, persist the
    /// link.
    async fn sync_space(&self, space_id: SpaceId, payload: &SpaceSnapshot) -> Result<(), SyncError> {
        let effective = self.resolve(space_id, payload).await?;

        let spec = ProductSpec {
            name: effective.name.clone(),
            description: effective.description.clone(),
            space_id,
        };

        let product = match &effective.product_id {
            Some(id) => self.catalog.update_product(id, &spec).await?,
            None => self.create_guarded(space_id, &spec).await?,
        };

        let price_id = self.ensure_price(&product.id, effective.price).await?;

        self.spaces
            .update_catalog_link(
                space_id,
                &CatalogLink {
                    product_id: product.id.clone(),
                    price_id,
                    synced_at: Utc::now(),
                },
            )
            .await?;

        info!(space_id = %space_id, product_id = %product.id, "Space synced to catalog");
        metrics::counter!("catalog_sync.synced").increment(1);
        Ok(())
    }

    /// Resolve the effective space fields: the payload when it carries
    /// pricing, the current row otherwise (older enqueue paths produced
    /// id-only payloads). The catalog pointer always prefers the current
    /// row, which a sibling job may have written after this one was
    /// enqueued.
    async fn resolve(
        &self,
        space_id: SpaceId,
        payload: &SpaceSnapshot,
    ) -> Result<EffectiveSpace, SyncError> {
        let current = self.spaces.find_by_id(space_id).await?;

        let (name, description, mode, price, product_id) = if payload.carries_pricing() {
            (
                payload.name.clone(),
                payload.description.clone(),
                payload.pricing_mode,
                payload.active_price,
                current
                    .as_ref()
                    .and_then(|s| s.catalog_product_id.clone())
                    .or_else(|| payload.catalog_product_id.clone()),
            )
        } else {
            let space = current.ok_or(SyncError::SpaceNotFound(space_id))?;
            (
                Some(space.name.clone()),
                space.description.clone(),
                Some(space.pricing_mode),
                space.active_price(),
                space.catalog_product_id.clone(),
            )
        };

        let name = match name {
            Some(n) if !n.trim().is_empty() => n,
            _ => {
                return Err(SyncError::Validation {
                    space_id,
                    field: "name",
                    reason: "must be non-empty",
                })
            }
        };
        let mode = mode.ok_or(SyncError::Validation {
            space_id,
            field: "pricing_mode",
            reason: "must be set",
        })?;
        let price = match price {
            Some(p) if p.is_positive() => p,
            _ => {
                return Err(SyncError::Validation {
                    space_id,
                    field: mode.price_field(),
                    reason: "must be set and greater than zero",
                })
            }
        };

        Ok(EffectiveSpace {
            name,
            description,
            price,
            product_id,
        })
    }

    /// Create the product unless an active one already claims the name.
    /// A match tagged with this very space is adopted (a lost link from an
    /// earlier partial sync); any other match is a conflict.
    async fn create_guarded(
        &self,
        space_id: SpaceId,
        spec: &ProductSpec,
    ) -> Result<CatalogProduct, SyncError> {
        let active = self.catalog.list_active_products().await?;
        if let Some(existing) = active.iter().find(|p| p.name == spec.name) {
            if existing.space_id == Some(space_id) {
                info!(space_id = %space_id, product_id = %existing.id, "Re-adopting linked product");
                return Ok(self.catalog.update_product(&existing.id, spec).await?);
            }
            return Err(SyncError::DuplicateCatalogEntry {
                name: spec.name.clone(),
            });
        }
        Ok(self.catalog.create_product(spec).await?)
    }

    /// Prices are immutable: reuse an active exact match, otherwise create.
    async fn ensure_price(&self, product_id: &str, amount: Money) -> Result<String, SyncError> {
        let prices = self.catalog.list_active_prices(product_id).await?;
        if let Some(existing) = prices
            .iter()
            .find(|p| p.amount == amount && p.currency == self.currency)
        {
            return Ok(existing.id.clone());
        }
        let created = self
            .catalog
            .create_price(product_id, amount, &self.currency)
            .await?;
        Ok(created.id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use hotdesk_core::gateway::CatalogPrice;
    use hotdesk_core::space::{PricingMode, Space};
    use hotdesk_core::sync_job::SyncJobStatus;
    use hotdesk_testing::{InMemorySpaceStore, InMemorySyncJobStore, MockGateway};

    fn space(name: &str, price: i64) -> Space {
        Space {
            id: SpaceId::new(),
            name: name.to_string(),
            description: Some("Quiet corner".to_string()),
            capacity: 1,
            pricing_mode: PricingMode::Hourly,
            hourly_price: Some(Money::from_minor(price)),
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
        spaces: InMemorySpaceStore,
        queue: InMemorySyncJobStore,
        gateway: MockGateway,
        worker: CatalogSyncWorker,
    }

    fn fixture_with_batch(batch_size: usize) -> Fixture {
        let spaces = InMemorySpaceStore::new();
        let queue = InMemorySyncJobStore::new();
        let gateway = MockGateway::new();
        let worker = CatalogSyncWorker::new(
            Arc::new(spaces.clone()),
            Arc::new(queue.clone()),
            Arc::new(gateway.clone()),
            "eur".to_string(),
            batch_size,
        );
        Fixture {
            spaces,
            queue,
            gateway,
            worker,
        }
    }

    fn fixture() -> Fixture {
        fixture_with_batch(10)
    }

    async fn enqueue(f: &Fixture, space: &Space, event: SyncEventType) -> i64 {
        f.queue
            .enqueue(space.id, event, &SpaceSnapshot::from(space))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn insert_job_creates_product_price_and_link() {
        let f = fixture();
        let s = space("Desk 4", 2000);
        let space_id = s.id;
        f.spaces.seed(s.clone()).await;
        let job_id = enqueue(&f, &s, SyncEventType::Insert).await;

        let report = f.worker.run_batch().await.unwrap();
        assert_eq!(report, BatchReport { processed: 1, failed: 0 });
        assert_eq!(f.queue.get(job_id).await.unwrap().status, SyncJobStatus::Done);

        let synced = f.spaces.get(space_id).await.unwrap();
        let product_id = synced.catalog_product_id.unwrap();
        let price_id = synced.catalog_price_id.unwrap();
        assert!(synced.last_synced_at.is_some());

        let products = f.gateway.products().await;
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].id, product_id);
        assert_eq!(products[0].name, "Desk 4");
        assert_eq!(products[0].space_id, Some(space_id));

        let prices = f.gateway.prices().await;
        assert_eq!(prices.len(), 1);
        assert_eq!(prices[0].id, price_id);
        assert_eq!(prices[0].amount, Money::from_minor(2000));
    }

    #[tokio::test]
    async fn unchanged_price_is_reused_on_resync() {
        let f = fixture();
        let s = space("Desk 4", 2000);
        let space_id = s.id;
        f.spaces.seed(s.clone()).await;
        enqueue(&f, &s, SyncEventType::Insert).await;
        f.worker.run_batch().await.unwrap();

        let synced = f.spaces.get(space_id).await.unwrap();
        enqueue(&f, &synced, SyncEventType::Update).await;
        f.worker.run_batch().await.unwrap();

        assert_eq!(f.gateway.products().await.len(), 1);
        assert_eq!(f.gateway.prices().await.len(), 1);
    }

    #[tokio::test]
    async fn price_change_creates_new_price_and_relinks() {
        let f = fixture();
        let s = space("Desk 4", 2000);
        let space_id = s.id;
        f.spaces.seed(s.clone()).await;
        enqueue(&f, &s, SyncEventType::Insert).await;
        f.worker.run_batch().await.unwrap();
        let first_price = f.spaces.get(space_id).await.unwrap().catalog_price_id.unwrap();

        let mut changed = f.spaces.get(space_id).await.unwrap();
        changed.hourly_price = Some(Money::from_minor(2500));
        f.spaces.seed(changed.clone()).await;
        enqueue(&f, &changed, SyncEventType::Update).await;
        f.worker.run_batch().await.unwrap();

        let second_price = f.spaces.get(space_id).await.unwrap().catalog_price_id.unwrap();
        assert_ne!(first_price, second_price);
        assert_eq!(f.gateway.products().await.len(), 1);
        assert_eq!(f.gateway.prices().await.len(), 2);
    }

    #[tokio::test]
    async fn invalid_price_marks_job_error_naming_field() {
        let f = fixture();
        let s = space("Desk 4", 0);
        f.spaces.seed(s.clone()).await;
        let job_id = enqueue(&f, &s, SyncEventType::Insert).await;

        let report = f.worker.run_batch().await.unwrap();
        assert_eq!(report, BatchReport { processed: 0, failed: 1 });

        let job = f.queue.get(job_id).await.unwrap();
        assert_eq!(job.status, SyncJobStatus::Error);
        assert!(job.error_message.unwrap().contains("hourly_price"));
        // Validation rejects the job before any catalog call is made.
        assert!(f.gateway.products().await.is_empty());
    }

    #[tokio::test]
    async fn duplicate_name_for_other_space_is_rejected() {
        let f = fixture();
        f.gateway
            .seed_product(CatalogProduct {
                id: "prod_other".to_string(),
                name: "Desk 4".to_string(),
                active: true,
                space_id: Some(SpaceId::new()),
            })
            .await;

        let s = space("Desk 4", 2000);
        f.spaces.seed(s.clone()).await;
        let job_id = enqueue(&f, &s, SyncEventType::Insert).await;

        let report = f.worker.run_batch().await.unwrap();
        assert_eq!(report.failed, 1);
        let job = f.queue.get(job_id).await.unwrap();
        assert!(job.error_message.unwrap().contains("Desk 4"));
        // No second product was created.
        assert_eq!(f.gateway.products().await.len(), 1);
    }

    #[tokio::test]
    async fn lost_link_to_own_product_is_readopted() {
        let f = fixture();
        let s = space("Desk 4", 2000);
        let space_id = s.id;
        f.gateway
            .seed_product(CatalogProduct {
                id: "prod_mine".to_string(),
                name: "Desk 4".to_string(),
                active: true,
                space_id: Some(space_id),
            })
            .await;
        f.gateway
            .seed_price(CatalogPrice {
                id: "price_mine".to_string(),
                product_id: "prod_mine".to_string(),
                amount: Money::from_minor(2000),
                currency: "eur".to_string(),
                active: true,
            })
            .await;
        f.spaces.seed(s.clone()).await;
        enqueue(&f, &s, SyncEventType::Insert).await;

        let report = f.worker.run_batch().await.unwrap();
        assert_eq!(report, BatchReport { processed: 1, failed: 0 });

        let synced = f.spaces.get(space_id).await.unwrap();
        assert_eq!(synced.catalog_product_id.as_deref(), Some("prod_mine"));
        assert_eq!(synced.catalog_price_id.as_deref(), Some("price_mine"));
        assert_eq!(f.gateway.products().await.len(), 1);
    }

    #[tokio::test]
    async fn delete_archives_product() {
        let f = fixture();
        let s = space("Desk 4", 2000);
        let space_id = s.id;
        f.spaces.seed(s.clone()).await;
        enqueue(&f, &s, SyncEventType::Insert).await;
        f.worker.run_batch().await.unwrap();

        // Space row removed; the delete payload still carries the link.
        let synced = f.spaces.get(space_id).await.unwrap();
        f.spaces.remove(space_id).await;
        enqueue(&f, &synced, SyncEventType::Delete).await;
        let report = f.worker.run_batch().await.unwrap();
        assert_eq!(report, BatchReport { processed: 1, failed: 0 });

        let products = f.gateway.products().await;
        assert_eq!(products.len(), 1);
        assert!(!products[0].active);
    }

    #[tokio::test]
    async fn legacy_payload_without_pricing_falls_back_to_row() {
        let f = fixture();
        let s = space("Desk 4", 2000);
        let space_id = s.id;
        f.spaces.seed(s).await;
        let bare = SpaceSnapshot {
            id: space_id,
            name: None,
            description: None,
            pricing_mode: None,
            active_price: None,
            catalog_product_id: None,
        };
        let job_id = f
            .queue
            .enqueue(space_id, SyncEventType::Update, &bare)
            .await
            .unwrap();

        let report = f.worker.run_batch().await.unwrap();
        assert_eq!(report, BatchReport { processed: 1, failed: 0 });
        assert_eq!(f.queue.get(job_id).await.unwrap().status, SyncJobStatus::Done);
        assert!(f.spaces.get(space_id).await.unwrap().catalog_product_id.is_some());
    }

    #[tokio::test]
    async fn one_failing_job_does_not_abort_siblings() {
        let f = fixture();
        let good = space("Desk 4", 2000);
        let bad = space("Desk 5", 0);
        f.spaces.seed(good.clone()).await;
        f.spaces.seed(bad.clone()).await;
        enqueue(&f, &bad, SyncEventType::Insert).await;
        enqueue(&f, &good, SyncEventType::Insert).await;

        let report = f.worker.run_batch().await.unwrap();
        assert_eq!(report, BatchReport { processed: 1, failed: 1 });
        assert!(f.spaces.get(good.id).await.unwrap().catalog_product_id.is_some());
    }

    #[tokio::test]
    async fn sync_all_is_bounded_and_reports_remaining() {
        let f = fixture_with_batch(2);
        for i in 0..3 {
            f.spaces.seed(space(&format!("Desk {i}"), 2000)).await;
        }

        let report = f.worker.sync_all().await.unwrap();
        assert_eq!(report.success_count, 2);
        assert_eq!(report.error_count, 0);
        assert_eq!(report.remaining, 1);
        assert_eq!(f.gateway.products().await.len(), 2);
    }

    #[tokio::test]
    async fn repeated_sync_all_drains_every_space() {
        let f = fixture_with_batch(2);
        let mut ids = Vec::new();
        for i in 0..3 {
            let s = space(&format!("Desk {i}"), 2000);
            ids.push(s.id);
            f.spaces.seed(s).await;
        }

        f.worker.sync_all().await.unwrap();
        let second = f.worker.sync_all().await.unwrap();
        assert_eq!(second.error_count, 0);

        // The second pass led with the space the first one could not reach.
        for id in ids {
            assert!(f.spaces.get(id).await.unwrap().catalog_product_id.is_some());
        }
        assert_eq!(f.gateway.products().await.len(), 3);
    }

    #[tokio::test]
    async fn sync_all_collects_per_space_errors() {
        let f = fixture();
        let good = space("Desk 4", 2000);
        let bad = space("Desk 5", 0);
        let bad_id = bad.id;
        f.spaces.seed(good).await;
        f.spaces.seed(bad).await;

        let report = f.worker.sync_all().await.unwrap();
        assert_eq!(report.success_count, 1);
        assert_eq!(report.error_count, 1);
        assert_eq!(report.per_space_errors.len(), 1);
        assert_eq!(report.per_space_errors[0].0, bad_id);
        assert!(report.per_space_errors[0].1.contains("hourly_price"));
    }
}

