//! Order and order item models.
//!
//! An [`Order`] exclusively owns its items: they are written once at checkout,
//! never mutated, and removed only when the order is rolled back. After
//! creation only `status` and `updated_at` change.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bloom_core::{
    AddressId, CartTotals, IdempotencyKey, Money, OrderId, OrderItemId, OrderNumber, OrderStatus,
    PricedLine, ProductId, UserId,
};

use super::CartLine;

/// A committed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub order_number: OrderNumber,
    pub subtotal: Money,
    pub shipping_amount: Money,
    pub tax_amount: Money,
    pub total_amount: Money,
    pub status: OrderStatus,
    pub shipping_address_id: Option<AddressId>,
    pub billing_address_id: Option<AddressId>,
    #[serde(skip_serializing)]
    pub idempotency_key: Option<IdempotencyKey>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Whether `total_amount == subtotal + shipping_amount + tax_amount`.
    #[must_use]
    pub fn totals_consistent(&self) -> bool {
        self.total_amount == self.subtotal + self.shipping_amount + self.tax_amount
    }
}

/// Order row written at checkout, before the database assigns an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub user_id: UserId,
    pub order_number: OrderNumber,
    pub subtotal: Money,
    pub shipping_amount: Money,
    pub tax_amount: Money,
    pub total_amount: Money,
    pub status: OrderStatus,
    pub shipping_address_id: AddressId,
    pub billing_address_id: AddressId,
    pub idempotency_key: Option<IdempotencyKey>,
}

impl NewOrder {
    /// Build a `pending` order from cart totals.
    ///
    /// Billing uses the shipping address; there is no separate billing flow.
    #[must_use]
    pub fn pending(
        user_id: UserId,
        order_number: OrderNumber,
        totals: &CartTotals,
        address_id: AddressId,
        idempotency_key: Option<IdempotencyKey>,
    ) -> Self {
        Self {
            user_id,
            order_number,
            subtotal: totals.subtotal,
            shipping_amount: totals.shipping,
            tax_amount: totals.tax,
            total_amount: totals.total,
            status: OrderStatus::Pending,
            shipping_address_id: address_id,
            billing_address_id: address_id,
            idempotency_key,
        }
    }
}

/// Order item written at checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrderItem {
    pub product_id: ProductId,
    pub quantity: u32,
    pub price_at_purchase: Money,
    pub total_price: Money,
}

impl From<&CartLine> for NewOrderItem {
    fn from(line: &CartLine) -> Self {
        Self {
            product_id: line.product_id,
            quantity: line.quantity,
            price_at_purchase: line.unit_price,
            total_price: line.line_total(),
        }
    }
}

/// Order item joined with the product fields shown on the confirmation page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItemDetail {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub price_at_purchase: Money,
    pub total_price: Money,
    pub product_name: Option<String>,
    pub image_url: Option<String>,
    pub brand: Option<String>,
}
