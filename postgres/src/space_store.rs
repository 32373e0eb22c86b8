//! Space persistence over `PostgreSQL`.

use crate::map_db_error;
use async_trait::async_trait;
use hotdesk_core::space::{CatalogLink, PricingMode, Space};
use hotdesk_core::store::{SpaceStore, StoreError};
use hotdesk_core::types::{Money, SpaceId};
use sqlx::{PgPool, Row};

/// `PostgreSQL`-backed [`SpaceStore`].
pub struct PgSpaceStore {
    pool: PgPool,
}

impl PgSpaceStore {
    /// Create a store over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn price(row: &sqlx::postgres::PgRow, column: &str) -> Option<Money> {
        row.get::<Option<i64>, _>(column).map(Money::from_minor)
    }

    fn row_to_space(row: &sqlx::postgres::PgRow) -> Result<Space, StoreError> {
        let mode_str: String = row.get("pricing_mode");
        let pricing_mode = PricingMode::parse(&mode_str).ok_or_else(|| {
            StoreError::Serialization(format!("Invalid pricing mode: {mode_str}"))
        })?;

        Ok(Space {
            id: SpaceId::from_uuid(row.get("id")),
            name: row.get("name"),
            description: row.get("description"),
            capacity: row.get("capacity"),
            pricing_mode,
            hourly_price: Self::price(row, "hourly_price"),
            half_day_price: Self::price(row, "half_day_price"),
            daily_price: Self::price(row, "daily_price"),
            monthly_price: Self::price(row, "monthly_price"),
            quarterly_price: Self::price(row, "quarterly_price"),
            yearly_price: Self::price(row, "yearly_price"),
            custom_price: Self::price(row, "custom_price"),
            catalog_product_id: row.get("catalog_product_id"),
            catalog_price_id: row.get("catalog_price_id"),
            last_synced_at: row.get("last_synced_at"),
        })
    }
}

const SPACE_COLUMNS: &str = r"
    id, name, description, capacity, pricing_mode,
    hourly_price, half_day_price, daily_price, monthly_price,
    quarterly_price, yearly_price, custom_price,
    catalog_product_id, catalog_price_id, last_synced_at
";

#[async_trait]
impl SpaceStore for PgSpaceStore {
    async fn find_by_id(&self, id: SpaceId) -> Result<Option<Space>, StoreError> {
        let row = sqlx::query(&format!("SELECT {SPACE_COLUMNS} FROM spaces WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)?;

        row.as_ref().map(Self::row_to_space).transpose()
    }

    // Never-synced spaces lead, then the ones synced longest ago; each pass
    // stamps last_synced_at and so pushes its page to the back.
    async fn list_page(&self, offset: u64, limit: usize) -> Result<Vec<Space>, StoreError> {
        #[allow(clippy::cast_possible_wrap)] // Page sizes are small
        let rows = sqlx::query(&format!(
            "SELECT {SPACE_COLUMNS} FROM spaces
             ORDER BY last_synced_at ASC NULLS FIRST, id ASC
             OFFSET $1 LIMIT $2"
        ))
        .bind(offset as i64)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        rows.iter().map(Self::row_to_space).collect()
    }

    async fn count(&self) -> Result<u64, StoreError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM spaces")
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok(count.unsigned_abs())
    }

    // The statement names exactly the three columns the sync worker owns;
    // nothing else on the row can be touched from this path.
    async fn update_catalog_link(&self, id: SpaceId, link: &CatalogLink) -> Result<(), StoreError> {
        let result = sqlx::query(
            r"
            UPDATE spaces
            SET catalog_product_id = $1,
                catalog_price_id = $2,
                last_synced_at = $3
            WHERE id = $4
            ",
        )
        .bind(&link.product_id)
        .bind(&link.price_id)
        .bind(link.synced_at)
        .bind(id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: "space",
                id: id.to_string(),
            });
        }

        tracing::debug!(space_id = %id, product_id = %link.product_id, "Catalog link updated");
        Ok(())
    }
}
