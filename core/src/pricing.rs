//! Quote computation: pricing mode × duration → net and gross totals.

use crate::space::PricingMode;
use crate::types::Money;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors from quote computation. All map to synchronous validation
/// rejections; none are retryable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PricingError {
    /// The interval is empty or inverted.
    #[error("reservation interval is empty: start must be before end")]
    EmptyInterval,
    /// The active pricing-mode price is missing or not strictly positive.
    #[error("price field {field} must be set and greater than zero")]
    NonPositivePrice {
        /// Name of the offending space column
        field: &'static str,
    },
    /// The computed amount overflowed the minor-unit representation.
    #[error("quote amount overflow")]
    Overflow,
}

/// A computed reservation price.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Quote {
    /// Billing units charged (1 for flat pricing)
    pub units: i64,
    /// Pre-tax total
    pub net: Money,
    /// Tax-inclusive total
    pub gross: Money,
}

/// Compute a quote for `[start, end)` under the given mode and unit price.
///
/// Duration is rounded up to whole billing units (a 90-minute hourly booking
/// is charged two hours); flat (`custom`) pricing charges one unit regardless
/// of duration. Tax is added at `tax_rate_bps` basis points, rounded half-up
/// to the minor unit.
///
/// # Errors
///
/// Returns [`PricingError::EmptyInterval`] when `start >= end`,
/// [`PricingError::NonPositivePrice`] when `unit_price` is absent or not
/// strictly positive, and [`PricingError::Overflow`] on arithmetic overflow.
pub fn quote(
    mode: PricingMode,
    unit_price: Option<Money>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    tax_rate_bps: i64,
) -> Result<Quote, PricingError> {
    if start >= end {
        return Err(PricingError::EmptyInterval);
    }
    let unit_price = match unit_price {
        Some(p) if p.is_positive() => p,
        _ => {
            return Err(PricingError::NonPositivePrice {
                field: mode.price_field(),
            })
        }
    };

    let units = match mode.unit_seconds() {
        Some(unit_secs) => {
            // Round up to whole units; both operands are positive here.
            let duration_secs = (end - start).num_seconds();
            (duration_secs + unit_secs - 1) / unit_secs
        }
        None => 1,
    };

    let net = unit_price.checked_mul(units).ok_or(PricingError::Overflow)?;
    let tax = net
        .minor()
        .checked_mul(tax_rate_bps)
        .map(|t| (t + 5_000) / 10_000)
        .ok_or(PricingError::Overflow)?;
    let gross = net
        .checked_add(Money::from_minor(tax))
        .ok_or(PricingError::Overflow)?;

    Ok(Quote { units, net, gross })
}
