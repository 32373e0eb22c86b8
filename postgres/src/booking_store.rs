//! Booking persistence over `PostgreSQL`.

use crate::map_db_error;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hotdesk_core::booking::{Booking, BookingStatus};
use hotdesk_core::store::{BookingStore, StoreError};
use hotdesk_core::types::{BookingId, Money, SpaceId, UserId};
use sqlx::{PgPool, Row};

/// `PostgreSQL`-backed [`BookingStore`].
pub struct PgBookingStore {
    pool: PgPool,
}

impl PgBookingStore {
    /// Create a store over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_booking(row: &sqlx::postgres::PgRow) -> Result<Booking, StoreError> {
        let status_str: String = row.get("status");
        let status = BookingStatus::parse(&status_str).ok_or_else(|| {
            StoreError::Serialization(format!("Invalid booking status: {status_str}"))
        })?;

        Ok(Booking {
            id: BookingId::from_uuid(row.get("id")),
            user_id: UserId::from_uuid(row.get("user_id")),
            space_id: SpaceId::from_uuid(row.get("space_id")),
            start: row.get("start_time"),
            end: row.get("end_time"),
            status,
            amount_net: Money::from_minor(row.get("amount_net")),
            amount_gross: Money::from_minor(row.get("amount_gross")),
            created_at: row.get("created_at"),
        })
    }
}

const BOOKING_COLUMNS: &str =
    "id, user_id, space_id, start_time, end_time, status, amount_net, amount_gross, created_at";

#[async_trait]
impl BookingStore for PgBookingStore {
    async fn insert(&self, booking: &Booking) -> Result<(), StoreError> {
        sqlx::query(
            r"
            INSERT INTO bookings (
                id, user_id, space_id, start_time, end_time, status,
                amount_net, amount_gross, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ",
        )
        .bind(booking.id.as_uuid())
        .bind(booking.user_id.as_uuid())
        .bind(booking.space_id.as_uuid())
        .bind(booking.start)
        .bind(booking.end)
        .bind(booking.status.as_str())
        .bind(booking.amount_net.minor())
        .bind(booking.amount_gross.minor())
        .bind(booking.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }

    async fn find_by_id(&self, id: BookingId) -> Result<Option<Booking>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        row.as_ref().map(Self::row_to_booking).transpose()
    }

    async fn confirmed_for_space(&self, space_id: SpaceId) -> Result<Vec<Booking>, StoreError> {
        let rows = sqlx::query(&format!(
            r"
            SELECT {BOOKING_COLUMNS}
            FROM bookings
            WHERE space_id = $1 AND status = 'confirmed'
            ORDER BY start_time ASC
            "
        ))
        .bind(space_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        rows.iter().map(Self::row_to_booking).collect()
    }

    async fn update_status(&self, id: BookingId, status: BookingStatus) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE bookings SET status = $1 WHERE id = $2")
            .bind(status.as_str())
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: "booking",
                id: id.to_string(),
            });
        }

        tracing::debug!(booking_id = %id, status = status.as_str(), "Booking status updated");
        Ok(())
    }

    async fn cancel_stale_pending(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        let result = sqlx::query(
            r"
            UPDATE bookings
            SET status = 'cancelled'
            WHERE status = 'pending' AND created_at < $1
            ",
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        let cancelled = result.rows_affected();
        if cancelled > 0 {
            tracing::info!(cancelled, "Stale pending bookings cancelled");
            metrics::counter!("bookings.stale_pending_cancelled").increment(cancelled);
        }
        Ok(cancelled)
    }
}
