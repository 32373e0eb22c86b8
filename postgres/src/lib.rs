//! `PostgreSQL` implementations of the store traits in `hotdesk-core`.
//!
//! Uses sqlx with runtime-bound queries over a shared [`PgPool`]. Each store
//! wraps the pool and maps driver errors onto
//! [`StoreError`](hotdesk_core::store::StoreError); unique-constraint
//! violations (code 23505) become [`StoreError::UniqueViolation`] so callers
//! can treat them as idempotency signals rather than failures.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod booking_store;
pub mod payment_store;
pub mod space_store;
pub mod sync_queue;

pub use booking_store::PgBookingStore;
pub use payment_store::PgPaymentStore;
pub use space_store::PgSpaceStore;
pub use sync_queue::PgSyncJobStore;

use hotdesk_core::store::StoreError;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;

/// Embedded schema migrations, applied at startup.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Connect a pool and run pending migrations.
///
/// # Errors
///
/// Returns [`StoreError::Database`] if the connection or a migration fails.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<PgPool, StoreError> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

    MIGRATOR
        .run(&pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

    tracing::info!(max_connections, "Database pool ready");
    Ok(pool)
}

/// Map a sqlx error onto [`StoreError`], surfacing unique violations.
pub(crate) fn map_db_error(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &e {
        if db.code().as_deref() == Some("23505") {
            return StoreError::UniqueViolation {
                constraint: db.constraint().unwrap_or("unknown").to_string(),
            };
        }
    }
    StoreError::Database(e.to_string())
}
