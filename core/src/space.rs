//! Space entity, pricing modes, and the catalog linkage written by the sync
//! worker.

use crate::types::{Money, SpaceId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The pricing mode a space is sold under.
///
/// A space carries one price field per mode; only the field matching the
/// active mode participates in quoting and catalog sync.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PricingMode {
    /// Billed per hour
    Hourly,
    /// Billed per half day (4 hours)
    HalfDay,
    /// Billed per day
    Daily,
    /// Billed per 30-day month
    Monthly,
    /// Billed per 90-day quarter
    Quarterly,
    /// Billed per 365-day year
    Yearly,
    /// Flat price per booking, independent of duration
    Custom,
}

impl PricingMode {
    /// Database / payload string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Hourly => "hourly",
            Self::HalfDay => "half_day",
            Self::Daily => "daily",
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
            Self::Yearly => "yearly",
            Self::Custom => "custom",
        }
    }

    /// Parse a pricing mode from its string representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "hourly" => Some(Self::Hourly),
            "half_day" => Some(Self::HalfDay),
            "daily" => Some(Self::Daily),
            "monthly" => Some(Self::Monthly),
            "quarterly" => Some(Self::Quarterly),
            "yearly" => Some(Self::Yearly),
            "custom" => Some(Self::Custom),
            _ => None,
        }
    }

    /// Length of one billing unit in seconds, or `None` for flat pricing.
    #[must_use]
    pub const fn unit_seconds(&self) -> Option<i64> {
        match self {
            Self::Hourly => Some(3_600),
            Self::HalfDay => Some(4 * 3_600),
            Self::Daily => Some(24 * 3_600),
            Self::Monthly => Some(30 * 24 * 3_600),
            Self::Quarterly => Some(90 * 24 * 3_600),
            Self::Yearly => Some(365 * 24 * 3_600),
            Self::Custom => None,
        }
    }

    /// Name of the space column holding this mode's price, for diagnostics.
    #[must_use]
    pub const fn price_field(&self) -> &'static str {
        match self {
            Self::Hourly => "hourly_price",
            Self::HalfDay => "half_day_price",
            Self::Daily => "daily_price",
            Self::Monthly => "monthly_price",
            Self::Quarterly => "quarterly_price",
            Self::Yearly => "yearly_price",
            Self::Custom => "custom_price",
        }
    }
}

/// A bookable coworking space.
///
/// Catalog linkage (`catalog_product_id`, `catalog_price_id`,
/// `last_synced_at`) is owned by the catalog sync worker and written only
/// through [`CatalogLink`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Space {
    /// Space identifier
    pub id: SpaceId,
    /// Display name (also the catalog product name)
    pub name: String,
    /// Free-form description
    pub description: Option<String>,
    /// Seating capacity
    pub capacity: i32,
    /// Active pricing mode
    pub pricing_mode: PricingMode,
    /// Price per hour, if offered
    pub hourly_price: Option<Money>,
    /// Price per half day, if offered
    pub half_day_price: Option<Money>,
    /// Price per day, if offered
    pub daily_price: Option<Money>,
    /// Price per month, if offered
    pub monthly_price: Option<Money>,
    /// Price per quarter, if offered
    pub quarterly_price: Option<Money>,
    /// Price per year, if offered
    pub yearly_price: Option<Money>,
    /// Flat price per booking, if offered
    pub custom_price: Option<Money>,
    /// Gateway product mirroring this space, once synced
    pub catalog_product_id: Option<String>,
    /// Gateway price currently linked, once synced
    pub catalog_price_id: Option<String>,
    /// When the catalog linkage was last written
    pub last_synced_at: Option<DateTime<Utc>>,
}

impl Space {
    /// Price field for an arbitrary mode.
    #[must_use]
    pub const fn price_for(&self, mode: PricingMode) -> Option<Money> {
        match mode {
            PricingMode::Hourly => self.hourly_price,
            PricingMode::HalfDay => self.half_day_price,
            PricingMode::Daily => self.daily_price,
            PricingMode::Monthly => self.monthly_price,
            PricingMode::Quarterly => self.quarterly_price,
            PricingMode::Yearly => self.yearly_price,
            PricingMode::Custom => self.custom_price,
        }
    }

    /// Price for the active pricing mode.
    #[must_use]
    pub const fn active_price(&self) -> Option<Money> {
        self.price_for(self.pricing_mode)
    }
}

/// Snapshot of a space as captured at sync-job enqueue time.
///
/// Older enqueue paths produced payloads without pricing fields; every field
/// except the id is therefore optional, and consumers fall back to re-reading
/// the space row when [`SpaceSnapshot::carries_pricing`] is false.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpaceSnapshot {
    /// Space identifier
    pub id: SpaceId,
    /// Display name at enqueue time
    #[serde(default)]
    pub name: Option<String>,
    /// Description at enqueue time
    #[serde(default)]
    pub description: Option<String>,
    /// Active pricing mode at enqueue time
    #[serde(default)]
    pub pricing_mode: Option<PricingMode>,
    /// Price of the active mode at enqueue time, in minor units
    #[serde(default)]
    pub active_price: Option<Money>,
    /// Catalog product already linked at enqueue time
    #[serde(default)]
    pub catalog_product_id: Option<String>,
}

impl SpaceSnapshot {
    /// Whether the payload carries everything the sync worker needs without
    /// re-reading the space row.
    #[must_use]
    pub const fn carries_pricing(&self) -> bool {
        self.name.is_some() && self.pricing_mode.is_some() && self.active_price.is_some()
    }
}

impl From<&Space> for SpaceSnapshot {
    fn from(space: &Space) -> Self {
        Self {
            id: space.id,
            name: Some(space.name.clone()),
            description: space.description.clone(),
            pricing_mode: Some(space.pricing_mode),
            active_price: space.active_price(),
            catalog_product_id: space.catalog_product_id.clone(),
        }
    }
}

/// Typed partial update for the catalog pointer columns.
///
/// The space row has exactly three columns mutable by the sync worker; this
/// struct enumerates them so no other column can be written by accident.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CatalogLink {
    /// Gateway product id
    pub product_id: String,
    /// Gateway price id
    pub price_id: String,
    /// Sync timestamp
    pub synced_at: DateTime<Utc>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn space() -> Space {
        Space {
            id: SpaceId::new(),
            name: "Corner desk".to_string(),
            description: None,
            capacity: 1,
            pricing_mode: PricingMode::Hourly,
            hourly_price: Some(Money::from_minor(2000)),
            half_day_price: None,
            daily_price: Some(Money::from_minor(12_000)),
            monthly_price: None,
            quarterly_price: None,
            yearly_price: None,
            custom_price: None,
            catalog_product_id: None,
            catalog_price_id: None,
            last_synced_at: None,
        }
    }

    #[test]
    fn active_price_follows_mode() {
        let mut s = space();
        assert_eq!(s.active_price(), Some(Money::from_minor(2000)));
        s.pricing_mode = PricingMode::Daily;
        assert_eq!(s.active_price(), Some(Money::from_minor(12_000)));
        s.pricing_mode = PricingMode::Monthly;
        assert_eq!(s.active_price(), None);
    }

    #[test]
    fn pricing_mode_roundtrip() {
        for mode in [
            PricingMode::Hourly,
            PricingMode::HalfDay,
            PricingMode::Daily,
            PricingMode::Monthly,
            PricingMode::Quarterly,
            PricingMode::Yearly,
            PricingMode::Custom,
        ] {
            assert_eq!(PricingMode::parse(mode.as_str()), Some(mode));
        }
        assert_eq!(PricingMode::parse("weekly"), None);
    }

    #[test]
    fn snapshot_from_space_carries_pricing() {
        let s = space();
        let snap = SpaceSnapshot::from(&s);
        assert!(snap.carries_pricing());
        assert_eq!(snap.active_price, Some(Money::from_minor(2000)));
    }

    #[test]
    fn legacy_snapshot_without_pricing_deserializes() {
        let snap: SpaceSnapshot =
            serde_json::from_str(&format!(r#"{{"id":"{}"}}"#, SpaceId::new())).unwrap();
        assert!(!snap.carries_pricing());
    }
}
