//! Order confirmation and order history reads.
//!
//! Reads are scoped to the signed-in shopper: an order that does not exist
//! and an order that belongs to someone else both come back as `NotFound`.

use serde::Serialize;
use thiserror::Error;
use tracing::{instrument, warn};

use bloom_core::{OrderId, UserId};

use super::checkout::CheckoutStore;
use crate::db::RepositoryError;
use crate::models::{Address, Order, OrderItemDetail};

/// Errors that can occur while reading an order back.
#[derive(Debug, Error)]
pub enum ConfirmationError {
    /// No signed-in shopper.
    #[error("please sign in to view your orders")]
    Unauthenticated,

    /// The order does not exist or is not the shopper's.
    #[error("order not found")]
    NotFound,

    /// Database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Shipping address shown on a confirmation page.
///
/// Addresses are referenced by orders, not owned, so the shopper may have
/// deleted it since. That degrades the page instead of failing it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "address", rename_all = "snake_case")]
pub enum ShippingAddress {
    Available(Address),
    Unavailable,
}

impl ShippingAddress {
    /// The address, if it could be loaded.
    #[must_use]
    pub const fn as_address(&self) -> Option<&Address> {
        match self {
            Self::Available(address) => Some(address),
            Self::Unavailable => None,
        }
    }
}

/// Everything shown on the order confirmation page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderConfirmation {
    pub order: Order,
    pub items: Vec<OrderItemDetail>,
    pub shipping_address: ShippingAddress,
}

/// Read-only access to a shopper's orders.
pub struct ConfirmationReader<S> {
    store: S,
}

impl<S: CheckoutStore> ConfirmationReader<S> {
    /// Create a reader over `store`.
    #[must_use]
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// Load an order with its items and shipping address.
    ///
    /// # Errors
    ///
    /// Returns `ConfirmationError::Unauthenticated` if there is no owner.
    /// Returns `ConfirmationError::NotFound` if the order is missing or foreign.
    /// Returns `ConfirmationError::Repository` if the order or items cannot be read.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn read(
        &self,
        order_id: OrderId,
        owner: Option<UserId>,
    ) -> Result<OrderConfirmation, ConfirmationError> {
        let owner = owner.ok_or(ConfirmationError::Unauthenticated)?;

        let order = self
            .store
            .get_order(order_id, owner)
            .await?
            .ok_or(ConfirmationError::NotFound)?;

        let items = self.store.get_order_items(order.id).await?;

        let shipping_address = match order.shipping_address_id {
            None => ShippingAddress::Unavailable,
            Some(address_id) => match self.store.get_address(address_id).await {
                Ok(Some(address)) => ShippingAddress::Available(address),
                Ok(None) => ShippingAddress::Unavailable,
                Err(e) => {
                    warn!(
                        address_id = %address_id,
                        error = %e,
                        "Failed to load shipping address for confirmation"
                    );
                    ShippingAddress::Unavailable
                }
            },
        };

        Ok(OrderConfirmation {
            order,
            items,
            shipping_address,
        })
    }

    /// The shopper's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ConfirmationError::Unauthenticated` if there is no owner.
    /// Returns `ConfirmationError::Repository` if the query fails.
    pub async fn history(&self, owner: Option<UserId>) -> Result<Vec<Order>, ConfirmationError> {
        let owner = owner.ok_or(ConfirmationError::Unauthenticated)?;
        Ok(self.store.list_orders(owner).await?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use bloom_core::{AddressType, Money};

    use super::*;
    use crate::db::{FailPoint, MemoryStore};
    use crate::models::AddressInput;
    use crate::services::checkout::{CheckoutRequest, CheckoutService};
    use crate::services::events::CartEventHub;

    async fn place_order(store: &MemoryStore, owner: UserId) -> (OrderId, Address) {
        let address = store
            .add_address(
                owner,
                &AddressInput {
                    address_type: AddressType::Office,
                    label: "Work".to_owned(),
                    street: "5 Lily Rd".to_owned(),
                    city: "Denver".to_owned(),
                    state: "CO".to_owned(),
                    postal_code: "80202".to_owned(),
                    country: "US".to_owned(),
                    is_default: false,
                },
            )
            .await;
        let product = store
            .add_product("LIP-1", "Tinted Balm", Money::from_cents(1200))
            .await;
        store.add_cart_line(owner, product, 1).await;

        let service = CheckoutService::new(store.clone(), CartEventHub::default());
        let outcome = service
            .commit(CheckoutRequest {
                owner: Some(owner),
                shipping_address_id: Some(address.id),
                lines: store.cart_lines(owner).await,
                idempotency_key: None,
            })
            .await
            .unwrap();
        (outcome.order_id, address)
    }

    #[tokio::test]
    async fn test_read_requires_owner() {
        let reader = ConfirmationReader::new(MemoryStore::new());
        assert!(matches!(
            reader.read(OrderId::new(1), None).await,
            Err(ConfirmationError::Unauthenticated)
        ));
        assert!(matches!(
            reader.history(None).await,
            Err(ConfirmationError::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn test_read_returns_items_and_address() {
        let store = MemoryStore::new();
        let owner = UserId::new(1);
        let (order_id, address) = place_order(&store, owner).await;

        let confirmation = ConfirmationReader::new(store)
            .read(order_id, Some(owner))
            .await
            .unwrap();

        assert_eq!(confirmation.items.len(), 1);
        assert_eq!(confirmation.items[0].product_name.as_deref(), Some("Tinted Balm"));
        assert_eq!(confirmation.shipping_address.as_address(), Some(&address));
    }

    #[tokio::test]
    async fn test_address_failure_degrades() {
        let store = MemoryStore::new();
        let owner = UserId::new(1);
        let (order_id, _) = place_order(&store, owner).await;
        store.fail_on(FailPoint::GetAddress).await;

        let confirmation = ConfirmationReader::new(store)
            .read(order_id, Some(owner))
            .await
            .unwrap();

        assert_eq!(confirmation.shipping_address, ShippingAddress::Unavailable);
    }

    #[test]
    fn test_unavailable_address_serializes_with_status() {
        let json = serde_json::to_value(ShippingAddress::Unavailable).unwrap();
        assert_eq!(json["status"], "unavailable");
        assert!(json.get("address").is_none());
    }
}
