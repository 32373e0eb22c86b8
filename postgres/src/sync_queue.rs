//! Durable catalog-sync queue over `PostgreSQL`.
//!
//! Claiming uses `FOR UPDATE SKIP LOCKED` inside a transaction and stamps
//! `leased_at`, so concurrent workers never receive the same row and a claim
//! held by a crashed worker expires after [`LEASE_WINDOW_SECS`] instead of
//! wedging the queue.

use crate::map_db_error;
use async_trait::async_trait;
use hotdesk_core::space::SpaceSnapshot;
use hotdesk_core::store::{StoreError, SyncJobStore};
use hotdesk_core::sync_job::{SyncEventType, SyncJob, SyncJobStatus};
use hotdesk_core::types::SpaceId;
use sqlx::{PgPool, Row};

/// How long a lease shields a pending row from re-claiming.
pub const LEASE_WINDOW_SECS: i64 = 300;

/// `PostgreSQL`-backed [`SyncJobStore`].
pub struct PgSyncJobStore {
    pool: PgPool,
}

impl PgSyncJobStore {
    /// Create a store over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_job(row: &sqlx::postgres::PgRow) -> Result<SyncJob, StoreError> {
        let event_str: String = row.get("event_type");
        let event_type = SyncEventType::parse(&event_str).ok_or_else(|| {
            StoreError::Serialization(format!("Invalid sync event type: {event_str}"))
        })?;

        let status_str: String = row.get("status");
        let status = SyncJobStatus::parse(&status_str).ok_or_else(|| {
            StoreError::Serialization(format!("Invalid sync job status: {status_str}"))
        })?;

        let payload_json: serde_json::Value = row.get("payload");
        let payload: SpaceSnapshot = serde_json::from_value(payload_json)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        Ok(SyncJob {
            id: row.get("id"),
            space_id: SpaceId::from_uuid(row.get("space_id")),
            event_type,
            payload,
            status,
            error_message: row.get("error_message"),
            created_at: row.get("created_at"),
            processed_at: row.get("processed_at"),
        })
    }
}

#[async_trait]
impl SyncJobStore for PgSyncJobStore {
    async fn enqueue(
        &self,
        space_id: SpaceId,
        event_type: SyncEventType,
        payload: &SpaceSnapshot,
    ) -> Result<i64, StoreError> {
        let payload_json =
            serde_json::to_value(payload).map_err(|e| StoreError::Serialization(e.to_string()))?;

        let (id,): (i64,) = sqlx::query_as(
            r"
            INSERT INTO sync_jobs (space_id, event_type, payload)
            VALUES ($1, $2, $3)
            RETURNING id
            ",
        )
        .bind(space_id.as_uuid())
        .bind(event_type.as_str())
        .bind(payload_json)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?;

        tracing::debug!(
            job_id = id,
            space_id = %space_id,
            event_type = event_type.as_str(),
            "Sync job enqueued"
        );
        metrics::counter!("sync_queue.enqueued", "event_type" => event_type.as_str())
            .increment(1);

        Ok(id)
    }

    async fn lease_next(&self, batch_size: usize) -> Result<Vec<SyncJob>, StoreError> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        #[allow(clippy::cast_possible_wrap, clippy::cast_precision_loss)]
        let rows = sqlx::query(
            r"
            UPDATE sync_jobs
            SET leased_at = NOW()
            WHERE id IN (
                SELECT id
                FROM sync_jobs
                WHERE status = 'pending'
                  AND (leased_at IS NULL OR leased_at < NOW() - make_interval(secs => $1))
                ORDER BY created_at ASC
                LIMIT $2
                FOR UPDATE SKIP LOCKED
            )
            RETURNING id, space_id, event_type, payload, status,
                      error_message, created_at, processed_at
            ",
        )
        .bind(LEASE_WINDOW_SECS as f64)
        .bind(batch_size as i64)
        .fetch_all(&mut *tx)
        .await
        .map_err(map_db_error)?;

        tx.commit().await.map_err(map_db_error)?;

        rows.iter().map(Self::row_to_job).collect()
    }

    async fn mark_done(&self, id: i64) -> Result<(), StoreError> {
        sqlx::query(
            r"
            UPDATE sync_jobs
            SET status = 'done', processed_at = NOW(), error_message = NULL
            WHERE id = $1
            ",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        metrics::counter!("sync_queue.done").increment(1);
        Ok(())
    }

    async fn mark_error(&self, id: i64, message: &str) -> Result<(), StoreError> {
        sqlx::query(
            r"
            UPDATE sync_jobs
            SET status = 'error', processed_at = NOW(), error_message = $1
            WHERE id = $2
            ",
        )
        .bind(message)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        tracing::warn!(job_id = id, error = message, "Sync job failed");
        metrics::counter!("sync_queue.errors").increment(1);
        Ok(())
    }

    async fn count_pending(&self) -> Result<i64, StoreError> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM sync_jobs WHERE status = 'pending'")
                .fetch_one(&self.pool)
                .await
                .map_err(map_db_error)?;

        Ok(count)
    }
}
