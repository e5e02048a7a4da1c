//! Cart pricing.
//!
//! [`CartTotals::compute`] is the single source of truth for subtotal,
//! shipping, tax and total. The checkout summary shown to the shopper and the
//! amounts written to the order row both come from it, so they cannot drift.
//!
//! ```
//! use bloom_core::{CartTotals, Money, PricingPolicy};
//!
//! let lines = [(Money::from_cents(3000), 2_u32)];
//! let totals = CartTotals::compute(&lines, &PricingPolicy::default());
//!
//! assert_eq!(totals.subtotal.to_string(), "60.00");
//! assert!(totals.shipping.is_zero());
//! assert_eq!(totals.tax.to_string(), "4.80");
//! assert_eq!(totals.total.to_string(), "64.80");
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::Money;

/// Anything that contributes `unit_price x quantity` to a cart subtotal.
pub trait PricedLine {
    /// Unit price captured when the line was loaded.
    fn unit_price(&self) -> Money;

    /// Number of units (at least one for a real cart line).
    fn quantity(&self) -> u32;

    /// `unit_price x quantity`.
    fn line_total(&self) -> Money {
        self.unit_price().times(self.quantity())
    }
}

impl PricedLine for (Money, u32) {
    fn unit_price(&self) -> Money {
        self.0
    }

    fn quantity(&self) -> u32 {
        self.1
    }
}

impl<T: PricedLine> PricedLine for &T {
    fn unit_price(&self) -> Money {
        (*self).unit_price()
    }

    fn quantity(&self) -> u32 {
        (*self).quantity()
    }
}

/// Shipping and tax rules applied to a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingPolicy {
    /// Subtotals strictly above this ship free.
    pub free_shipping_threshold: Money,
    /// Flat fee charged at or below the threshold.
    pub flat_shipping_fee: Money,
    /// Flat tax rate applied to the subtotal (`0.08` is 8%).
    pub tax_rate: Decimal,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            free_shipping_threshold: Money::from_cents(5000),
            flat_shipping_fee: Money::from_cents(599),
            tax_rate: Decimal::new(8, 2),
        }
    }
}

impl PricingPolicy {
    /// Shipping charged for a given subtotal.
    ///
    /// An empty cart (zero subtotal) is never charged shipping.
    #[must_use]
    pub fn shipping_for(&self, subtotal: Money) -> Money {
        if subtotal.is_zero() || subtotal > self.free_shipping_threshold {
            Money::ZERO
        } else {
            self.flat_shipping_fee
        }
    }

    /// Tax on a subtotal, rounded to cents.
    #[must_use]
    pub fn tax_for(&self, subtotal: Money) -> Money {
        subtotal.scale(self.tax_rate).round_cents()
    }
}

/// Monetary summary of a cart.
///
/// `total == subtotal + shipping + tax` holds exactly: every component is
/// already rounded to cents before the sum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CartTotals {
    pub subtotal: Money,
    pub shipping: Money,
    pub tax: Money,
    pub total: Money,
    /// Sum of quantities across lines.
    pub item_count: u32,
}

impl CartTotals {
    /// Compute totals for a sequence of lines.
    #[must_use]
    pub fn compute<L: PricedLine>(lines: &[L], policy: &PricingPolicy) -> Self {
        let subtotal: Money = lines
            .iter()
            .map(PricedLine::line_total)
            .sum::<Money>()
            .round_cents();
        let shipping = policy.shipping_for(subtotal);
        let tax = policy.tax_for(subtotal);
        let item_count = lines
            .iter()
            .map(PricedLine::quantity)
            .fold(0_u32, u32::saturating_add);

        Self {
            subtotal,
            shipping,
            tax,
            total: subtotal + shipping + tax,
            item_count,
        }
    }

    /// Totals of an empty cart: everything zero.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            subtotal: Money::ZERO,
            shipping: Money::ZERO,
            tax: Money::ZERO,
            total: Money::ZERO,
            item_count: 0,
        }
    }

    /// Whether the cart ships free (non-empty and over the threshold).
    #[must_use]
    pub fn qualifies_for_free_shipping(&self) -> bool {
        !self.subtotal.is_zero() && self.shipping.is_zero()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn money(s: &str) -> Money {
        s.parse().unwrap()
    }

    fn totals(lines: &[(Money, u32)]) -> CartTotals {
        CartTotals::compute(lines, &PricingPolicy::default())
    }

    #[test]
    fn test_free_shipping_over_threshold() {
        let t = totals(&[(money("30"), 2)]);
        assert_eq!(t.subtotal, money("60"));
        assert_eq!(t.shipping, Money::ZERO);
        assert_eq!(t.tax, money("4.80"));
        assert_eq!(t.total, money("64.80"));
        assert_eq!(t.item_count, 2);
        assert!(t.qualifies_for_free_shipping());
    }

    #[test]
    fn test_flat_shipping_under_threshold() {
        let t = totals(&[(money("10"), 1)]);
        assert_eq!(t.subtotal, money("10"));
        assert_eq!(t.shipping, money("5.99"));
        assert_eq!(t.tax, money("0.80"));
        assert_eq!(t.total, money("16.79"));
        assert!(!t.qualifies_for_free_shipping());
    }

    #[test]
    fn test_exactly_threshold_pays_shipping() {
        let t = totals(&[(money("25"), 2)]);
        assert_eq!(t.subtotal, money("50"));
        assert_eq!(t.shipping, money("5.99"));
    }

    #[test]
    fn test_empty_cart_is_all_zero() {
        let t = totals(&[]);
        assert_eq!(t, CartTotals::empty());
        assert!(!t.qualifies_for_free_shipping());
    }

    #[test]
    fn test_tax_rounds_to_cents() {
        // 19.99 * 0.08 = 1.5992
        let t = totals(&[(money("19.99"), 1)]);
        assert_eq!(t.tax, money("1.60"));
        assert_eq!(t.total, money("27.58"));
    }

    #[test]
    fn test_total_is_sum_of_parts() {
        let carts: [&[(Money, u32)]; 4] = [
            &[(money("0.01"), 1)],
            &[(money("12.49"), 3), (money("7.25"), 1)],
            &[(money("49.99"), 1), (money("0.02"), 1)],
            &[(money("120.00"), 5), (money("3.33"), 7)],
        ];
        for lines in carts {
            let t = totals(lines);
            assert_eq!(t.total, t.subtotal + t.shipping + t.tax);
            assert_eq!(t.shipping.is_zero(), t.subtotal > money("50"));
        }
    }

    #[test]
    fn test_custom_policy() {
        let policy = PricingPolicy {
            free_shipping_threshold: money("100"),
            flat_shipping_fee: money("9.50"),
            tax_rate: Decimal::new(5, 2),
        };
        let t = CartTotals::compute(&[(money("60"), 1)], &policy);
        assert_eq!(t.shipping, money("9.50"));
        assert_eq!(t.tax, money("3.00"));
        assert_eq!(t.total, money("72.50"));
    }
}
