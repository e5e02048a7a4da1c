//! Checkout orchestration.
//!
//! Turns a loaded cart into a committed order:
//!
//! 1. The shopper must be signed in and have selected an address.
//! 2. A repeated idempotency key inside the replay window returns the
//!    earlier order without writing anything, even though the first commit
//!    already emptied the cart.
//! 3. The cart must not be empty. Without a key, steps 1 to 3 run before the
//!    store is touched at all.
//! 4. The selected address must exist and belong to the shopper.
//! 5. Totals come from [`CartTotals::compute`], the same function that
//!    renders the checkout summary. Item prices are the `unit_price`
//!    snapshots of the loaded cart lines.
//! 6. Order and items are written through [`CheckoutStore::place_order`].
//!    A duplicate order number is retried with a fresh number.
//! 7. The cart is cleared. A failure here is logged and reported in the
//!    outcome; the order stands.
//! 8. [`CartEvent::CheckoutCompleted`] is published for the shopper.

mod error;
mod order_number;
mod store;

pub use error::CheckoutError;
pub use order_number::{OrderNumberSource, TimestampOrderNumbers};
pub use store::{CheckoutStore, PlaceOrderError};

use std::sync::Arc;

use chrono::{TimeDelta, Utc};
use serde::Serialize;
use tracing::{info, instrument, warn};

use bloom_core::{
    AddressId, CartTotals, IdempotencyKey, OrderId, OrderNumber, PricingPolicy, UserId,
};

use super::events::{CartEvent, CartEventHub};
use crate::db::RepositoryError;
use crate::models::{CartLine, NewOrder, NewOrderItem, Order};

/// How many order numbers are tried before giving up on a conflict.
pub const MAX_ORDER_NUMBER_ATTEMPTS: u32 = 3;

/// Default hours in which a repeated idempotency key replays the first order.
pub const DEFAULT_IDEMPOTENCY_WINDOW_HOURS: i64 = 24;

/// Everything the orchestrator needs to commit one checkout.
#[derive(Debug, Clone, Default)]
pub struct CheckoutRequest {
    /// Signed-in shopper, if any.
    pub owner: Option<UserId>,
    /// Selected shipping address, if any. Also used for billing.
    pub shipping_address_id: Option<AddressId>,
    /// Cart lines as loaded for the summary, with their price snapshots.
    pub lines: Vec<CartLine>,
    /// Client token making resubmission safe.
    pub idempotency_key: Option<IdempotencyKey>,
}

/// Result of a successful commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutOutcome {
    pub order_id: OrderId,
    pub order_number: OrderNumber,
    pub totals: CartTotals,
    /// `false` if the order was placed but the cart could not be emptied,
    /// and always `false` for a replay (which writes nothing).
    pub cart_cleared: bool,
    /// The order already existed for this idempotency key.
    pub replayed: bool,
}

enum Placement {
    Placed { id: OrderId, number: OrderNumber },
    Replayed(Order),
}

/// Checkout orchestrator over a [`CheckoutStore`].
pub struct CheckoutService<S> {
    store: S,
    events: CartEventHub,
    policy: PricingPolicy,
    idempotency_window: TimeDelta,
    order_numbers: Arc<dyn OrderNumberSource>,
}

impl<S: CheckoutStore> CheckoutService<S> {
    /// Create a checkout service with the default pricing policy.
    #[must_use]
    pub fn new(store: S, events: CartEventHub) -> Self {
        Self {
            store,
            events,
            policy: PricingPolicy::default(),
            idempotency_window: TimeDelta::hours(DEFAULT_IDEMPOTENCY_WINDOW_HOURS),
            order_numbers: Arc::new(TimestampOrderNumbers),
        }
    }

    /// Use a different shipping and tax policy.
    #[must_use]
    pub fn with_policy(mut self, policy: PricingPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Use a different idempotency replay window.
    #[must_use]
    pub fn with_idempotency_window(mut self, window: TimeDelta) -> Self {
        self.idempotency_window = window;
        self
    }

    /// Use a different order number generator.
    #[must_use]
    pub fn with_order_numbers(mut self, source: impl OrderNumberSource + 'static) -> Self {
        self.order_numbers = Arc::new(source);
        self
    }

    /// The pricing policy applied to carts.
    #[must_use]
    pub const fn policy(&self) -> &PricingPolicy {
        &self.policy
    }

    /// The underlying store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Totals for the checkout summary page.
    #[must_use]
    pub fn summarize(&self, lines: &[CartLine]) -> CartTotals {
        CartTotals::compute(lines, &self.policy)
    }

    /// Commit a cart as a `pending` order.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::Unauthenticated`, `MissingAddress` or `EmptyCart`
    /// without writing anything. Only a request carrying an idempotency key
    /// reads the store before `EmptyCart`.
    /// Returns `CheckoutError::InvalidAddress` if the address is not the shopper's.
    /// Returns `CheckoutError::OrderCreateFailed` if no order was written.
    /// Returns `CheckoutError::OrderItemsFailed` if the items failed and the
    /// order was rolled back.
    #[instrument(
        skip(self, request),
        fields(owner = ?request.owner, lines = request.lines.len())
    )]
    pub async fn commit(&self, request: CheckoutRequest) -> Result<CheckoutOutcome, CheckoutError> {
        let CheckoutRequest {
            owner,
            shipping_address_id,
            lines,
            idempotency_key,
        } = request;

        let owner = owner.ok_or(CheckoutError::Unauthenticated)?;
        let address_id = shipping_address_id.ok_or(CheckoutError::MissingAddress)?;

        // A retry arrives after the first commit emptied the cart, so the
        // replay lookup precedes the empty-cart check.
        if let Some(key) = &idempotency_key
            && let Some(existing) = self.find_replay(owner, key).await?
        {
            return self.replay(existing).await;
        }

        if lines.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        match self.store.get_address(address_id).await? {
            Some(address) if address.user_id == owner => {}
            _ => return Err(CheckoutError::InvalidAddress),
        }

        let totals = self.summarize(&lines);
        let items: Vec<NewOrderItem> = lines.iter().map(NewOrderItem::from).collect();

        let (order_id, order_number) = match self
            .place(owner, address_id, &totals, &items, idempotency_key.as_ref())
            .await?
        {
            Placement::Placed { id, number } => (id, number),
            Placement::Replayed(existing) => return self.replay(existing).await,
        };

        info!(
            order_id = %order_id,
            order_number = %order_number,
            total = %totals.total,
            "Order placed"
        );

        let cart_cleared = match self.store.delete_cart_lines(owner).await {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    order_id = %order_id,
                    error = %e,
                    "Order placed but cart could not be cleared"
                );
                false
            }
        };

        self.events
            .publish(CartEvent::CheckoutCompleted { owner, order_id });

        Ok(CheckoutOutcome {
            order_id,
            order_number,
            totals,
            cart_cleared,
            replayed: false,
        })
    }

    async fn place(
        &self,
        owner: UserId,
        address_id: AddressId,
        totals: &CartTotals,
        items: &[NewOrderItem],
        idempotency_key: Option<&IdempotencyKey>,
    ) -> Result<Placement, CheckoutError> {
        let mut attempt = 1;
        loop {
            let number = self.order_numbers.next_number();
            let order = NewOrder::pending(
                owner,
                number.clone(),
                totals,
                address_id,
                idempotency_key.cloned(),
            );

            match self.store.place_order(&order, items).await {
                Ok(id) => return Ok(Placement::Placed { id, number }),
                Err(PlaceOrderError::OrderInsert(RepositoryError::Conflict(constraint))) => {
                    // A concurrent submission with the same key won the race.
                    if let Some(key) = idempotency_key
                        && let Some(existing) = self.find_replay(owner, key).await?
                    {
                        return Ok(Placement::Replayed(existing));
                    }
                    if attempt >= MAX_ORDER_NUMBER_ATTEMPTS {
                        return Err(CheckoutError::OrderCreateFailed(
                            RepositoryError::Conflict(constraint),
                        ));
                    }
                    warn!(
                        order_number = %number,
                        constraint = %constraint,
                        attempt,
                        "Order number conflict, retrying with a new number"
                    );
                    attempt += 1;
                }
                Err(PlaceOrderError::OrderInsert(e)) => {
                    return Err(CheckoutError::OrderCreateFailed(e));
                }
                Err(PlaceOrderError::ItemsInsert(e)) => {
                    return Err(CheckoutError::OrderItemsFailed(e));
                }
            }
        }
    }

    async fn find_replay(
        &self,
        owner: UserId,
        key: &IdempotencyKey,
    ) -> Result<Option<Order>, RepositoryError> {
        let since = Utc::now() - self.idempotency_window;
        self.store
            .find_order_by_idempotency_key(owner, key, since)
            .await
    }

    async fn replay(&self, order: Order) -> Result<CheckoutOutcome, CheckoutError> {
        let items = self.store.get_order_items(order.id).await?;
        let item_count = items
            .iter()
            .map(|item| item.quantity)
            .fold(0_u32, u32::saturating_add);

        info!(
            order_id = %order.id,
            order_number = %order.order_number,
            "Replaying checkout for repeated idempotency key"
        );

        Ok(CheckoutOutcome {
            order_id: order.id,
            order_number: order.order_number,
            totals: CartTotals {
                subtotal: order.subtotal,
                shipping: order.shipping_amount,
                tax: order.tax_amount,
                total: order.total_amount,
                item_count,
            },
            cart_cleared: false,
            replayed: true,
        })
    }
}
