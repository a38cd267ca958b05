//! # Pricing
//!
//! Price-tier resolution at order time and tier synthesis at catalog import.
//!
//! ## Tier Synthesis
//! ERP terminals export a single opening rate per stock item. Until a real
//! price-list export is wired in, the other tiers are derived from that
//! rate by fixed multipliers:
//!
//! | Tier      | Multiplier |
//! |-----------|------------|
//! | Standard  | ×1.0       |
//! | Wholesale | ×0.8       |
//! | Retail    | ×1.2       |
//!
//! This is a placeholder algorithm, kept deliberately simple and explicit.

use crate::money::Money;
use crate::types::{NewOrderLine, TaxRate, TierPrice};
use crate::STANDARD_PRICE_LEVEL;

/// Tier name and multiplier in basis points (10000 = ×1.0).
pub const SYNTHESIZED_TIERS: [(&str, u32); 3] = [
    (STANDARD_PRICE_LEVEL, 10_000),
    ("Wholesale", 8_000),
    ("Retail", 12_000),
];

/// Derives the full tier set from a single base rate.
///
/// ```rust
/// use ledger_core::money::Money;
/// use ledger_core::pricing::synthesize_tier_prices;
///
/// let tiers = synthesize_tier_prices(Money::from_cents(120000));
/// let names: Vec<_> = tiers.iter().map(|t| t.level.as_str()).collect();
/// assert_eq!(names, ["Standard", "Wholesale", "Retail"]);
/// assert_eq!(tiers[1].price.cents(), 96000);
/// ```
pub fn synthesize_tier_prices(base: Money) -> Vec<TierPrice> {
    SYNTHESIZED_TIERS
        .iter()
        .map(|(level, bps)| TierPrice {
            level: (*level).to_string(),
            price: base.scale_bps(*bps),
        })
        .collect()
}

/// Tier label for an order, `Standard` when none was chosen.
pub fn effective_tier(tier: Option<&str>) -> &str {
    tier.map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(STANDARD_PRICE_LEVEL)
}

/// Unit rate for a product under `tier`: the tier's price if the product
/// has one, otherwise the base price.
pub fn resolve_unit_rate(base: Money, tier: &str, prices: &[TierPrice]) -> Money {
    prices
        .iter()
        .find(|p| p.level.eq_ignore_ascii_case(tier))
        .map(|p| p.price)
        .unwrap_or(base)
}

// =============================================================================
// Order Totals
// =============================================================================

/// A line with its rate already resolved, ready to be snapshotted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricedLine {
    pub quantity: i64,
    pub rate: Money,
    pub amount: Money,
    pub tax: Money,
    pub tax_rate: TaxRate,
}

impl PricedLine {
    pub fn new(line: &NewOrderLine, rate: Money) -> Self {
        let amount = rate.multiply_quantity(line.quantity);
        Self {
            quantity: line.quantity,
            rate,
            amount,
            tax: amount.calculate_tax(line.tax_rate),
            tax_rate: line.tax_rate,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OrderTotals {
    pub subtotal: Money,
    pub tax: Money,
    pub total: Money,
}

impl OrderTotals {
    pub fn compute(lines: &[PricedLine]) -> Self {
        let subtotal: Money = lines.iter().map(|l| l.amount).sum();
        let tax: Money = lines.iter().map(|l| l.tax).sum();
        Self {
            subtotal,
            tax,
            total: subtotal + tax,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthesized_tiers() {
        let tiers = synthesize_tier_prices(Money::from_cents(10000));
        assert_eq!(tiers.len(), 3);
        assert_eq!(tiers[0].price.cents(), 10000);
        assert_eq!(tiers[1].price.cents(), 8000);
        assert_eq!(tiers[2].price.cents(), 12000);
    }

    #[test]
    fn test_effective_tier() {
        assert_eq!(effective_tier(None), "Standard");
        assert_eq!(effective_tier(Some(" ")), "Standard");
        assert_eq!(effective_tier(Some("Wholesale")), "Wholesale");
    }

    #[test]
    fn test_resolve_unit_rate_falls_back_to_base() {
        let prices = vec![TierPrice {
            level: "Wholesale".into(),
            price: Money::from_cents(800),
        }];
        let base = Money::from_cents(1000);
        assert_eq!(resolve_unit_rate(base, "wholesale", &prices).cents(), 800);
        assert_eq!(resolve_unit_rate(base, "Retail", &prices).cents(), 1000);
    }

    #[test]
    fn test_order_totals() {
        let a = PricedLine::new(
            &NewOrderLine {
                product_id: "a".into(),
                quantity: 3,
                tax_rate: TaxRate::zero(),
            },
            Money::from_cents(10000),
        );
        let b = PricedLine::new(
            &NewOrderLine {
                product_id: "b".into(),
                quantity: 1,
                tax_rate: TaxRate::from_bps(1800),
            },
            Money::from_cents(5000),
        );
        assert_eq!(a.amount.cents(), 30000);

        let totals = OrderTotals::compute(&[a, b]);
        assert_eq!(totals.subtotal.cents(), 35000);
        assert_eq!(totals.tax.cents(), 900);
        assert_eq!(totals.total.cents(), 35900);
    }
}
