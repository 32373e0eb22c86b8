//! Payment persistence over `PostgreSQL`.
//!
//! The `payments_gateway_session_id_key` constraint is load-bearing: a
//! concurrent webhook redelivery loses the insert race here and the caller
//! sees [`StoreError::UniqueViolation`], its signal to acknowledge without
//! reprocessing.

use crate::map_db_error;
use async_trait::async_trait;
use hotdesk_core::payment::{Payment, PaymentStatus};
use hotdesk_core::store::{PaymentStore, StoreError};
use hotdesk_core::types::{BookingId, Money, PaymentId};
use sqlx::{PgPool, Row};

/// `PostgreSQL`-backed [`PaymentStore`].
pub struct PgPaymentStore {
    pool: PgPool,
}

impl PgPaymentStore {
    /// Create a store over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_payment(row: &sqlx::postgres::PgRow) -> Result<Payment, StoreError> {
        let status_str: String = row.get("status");
        let status = PaymentStatus::parse(&status_str).ok_or_else(|| {
            StoreError::Serialization(format!("Invalid payment status: {status_str}"))
        })?;

        Ok(Payment {
            id: PaymentId::from_uuid(row.get("id")),
            booking_id: BookingId::from_uuid(row.get("booking_id")),
            gateway_session_id: row.get("gateway_session_id"),
            amount: Money::from_minor(row.get("amount")),
            currency: row.get("currency"),
            status,
            invoice_url: row.get("invoice_url"),
            created_at: row.get("created_at"),
        })
    }
}

const PAYMENT_COLUMNS: &str =
    "id, booking_id, gateway_session_id, amount, currency, status, invoice_url, created_at";

#[async_trait]
impl PaymentStore for PgPaymentStore {
    async fn insert(&self, payment: &Payment) -> Result<(), StoreError> {
        sqlx::query(
            r"
            INSERT INTO payments (
                id, booking_id, gateway_session_id, amount, currency,
                status, invoice_url, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ",
        )
        .bind(payment.id.as_uuid())
        .bind(payment.booking_id.as_uuid())
        .bind(&payment.gateway_session_id)
        .bind(payment.amount.minor())
        .bind(&payment.currency)
        .bind(payment.status.as_str())
        .bind(&payment.invoice_url)
        .bind(payment.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }

    async fn find_by_session(&self, session_id: &str) -> Result<Option<Payment>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE gateway_session_id = $1"
        ))
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        row.as_ref().map(Self::row_to_payment).transpose()
    }

    async fn find_by_booking(&self, booking_id: BookingId) -> Result<Option<Payment>, StoreError> {
        let row = sqlx::query(&format!(
            r"
            SELECT {PAYMENT_COLUMNS}
            FROM payments
            WHERE booking_id = $1
            ORDER BY created_at DESC
            LIMIT 1
            "
        ))
        .bind(booking_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        row.as_ref().map(Self::row_to_payment).transpose()
    }

    async fn update_status(&self, id: PaymentId, status: PaymentStatus) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE payments SET status = $1 WHERE id = $2")
            .bind(status.as_str())
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: "payment",
                id: id.to_string(),
            });
        }
        Ok(())
    }

    async fn set_invoice_url(&self, id: PaymentId, url: &str) -> Result<(), StoreError> {
        sqlx::query("UPDATE payments SET invoice_url = $1 WHERE id = $2")
            .bind(url)
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;
        Ok(())
    }
}
