//! Cart line model.

use serde::{Deserialize, Serialize};

use bloom_core::{CartLineId, Money, PricedLine, ProductId};

/// Largest quantity a single cart line may hold.
pub const MAX_LINE_QUANTITY: u32 = 99;

/// Quantity after adding `added` units to a line holding `existing`.
///
/// Capped at [`MAX_LINE_QUANTITY`] so repeated adds cannot grow a line past
/// what a single update would accept.
#[must_use]
pub fn merged_quantity(existing: u32, added: u32) -> u32 {
    existing.saturating_add(added).min(MAX_LINE_QUANTITY)
}

/// One product + quantity entry in a shopper's cart.
///
/// `unit_price` is the product's price at the moment the cart was loaded.
/// Checkout records exactly this value as the purchase price; it is never
/// re-fetched between the summary and the commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub id: CartLineId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: Money,
    pub product_name: String,
    pub image_url: Option<String>,
    pub brand: Option<String>,
}

impl PricedLine for CartLine {
    fn unit_price(&self) -> Money {
        self.unit_price
    }

    fn quantity(&self) -> u32 {
        self.quantity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merged_quantity_caps_at_line_maximum() {
        assert_eq!(merged_quantity(1, 2), 3);
        assert_eq!(merged_quantity(60, 60), MAX_LINE_QUANTITY);
        assert_eq!(merged_quantity(MAX_LINE_QUANTITY, 1), MAX_LINE_QUANTITY);
        assert_eq!(merged_quantity(u32::MAX, u32::MAX), MAX_LINE_QUANTITY);
    }
}
