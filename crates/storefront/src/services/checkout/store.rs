//! Persistence boundary of the checkout and confirmation flows.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use bloom_core::{AddressId, IdempotencyKey, OrderId, UserId};

use crate::db::RepositoryError;
use crate::models::{Address, NewOrder, NewOrderItem, Order, OrderItemDetail};

/// Failure of [`CheckoutStore::place_order`], split by the step that failed.
#[derive(Debug, Error)]
pub enum PlaceOrderError {
    /// The order row was not written.
    #[error("failed to insert order: {0}")]
    OrderInsert(#[source] RepositoryError),

    /// The order row was written but its items were not; the order has been
    /// rolled back (or compensation was attempted and logged).
    #[error("failed to insert order items: {0}")]
    ItemsInsert(#[source] RepositoryError),
}

/// Store operations needed to commit and read back orders.
///
/// Every call may fail with a [`RepositoryError`]; none of them retries.
#[async_trait]
pub trait CheckoutStore: Send + Sync {
    /// Insert an order row and return the assigned id.
    ///
    /// A duplicate order number or idempotency key is reported as
    /// [`RepositoryError::Conflict`].
    async fn insert_order(&self, order: &NewOrder) -> Result<OrderId, RepositoryError>;

    /// Insert the items of an existing order.
    async fn insert_order_items(
        &self,
        order_id: OrderId,
        items: &[NewOrderItem],
    ) -> Result<(), RepositoryError>;

    /// Delete an order and its items. Only used to undo a half-written order.
    async fn delete_order(&self, order_id: OrderId) -> Result<(), RepositoryError>;

    /// Remove every cart line of `owner`.
    async fn delete_cart_lines(&self, owner: UserId) -> Result<(), RepositoryError>;

    /// Get an order by id, only if it belongs to `owner`.
    async fn get_order(&self, id: OrderId, owner: UserId) -> Result<Option<Order>, RepositoryError>;

    /// Items of an order joined with product display fields.
    async fn get_order_items(&self, order_id: OrderId)
    -> Result<Vec<OrderItemDetail>, RepositoryError>;

    /// Get an address by id.
    async fn get_address(&self, id: AddressId) -> Result<Option<Address>, RepositoryError>;

    /// Find an owner's order created with `key` at or after `since`.
    async fn find_order_by_idempotency_key(
        &self,
        owner: UserId,
        key: &IdempotencyKey,
        since: DateTime<Utc>,
    ) -> Result<Option<Order>, RepositoryError>;

    /// An owner's orders, newest first.
    async fn list_orders(&self, owner: UserId) -> Result<Vec<Order>, RepositoryError>;

    /// Write an order together with its items.
    ///
    /// The provided implementation inserts the order, then the items, and
    /// deletes the order again if the items fail. A failed delete is logged;
    /// the caller still sees [`PlaceOrderError::ItemsInsert`]. Stores that
    /// support transactions should override this.
    async fn place_order(
        &self,
        order: &NewOrder,
        items: &[NewOrderItem],
    ) -> Result<OrderId, PlaceOrderError> {
        let order_id = self
            .insert_order(order)
            .await
            .map_err(PlaceOrderError::OrderInsert)?;

        if let Err(items_err) = self.insert_order_items(order_id, items).await {
            if let Err(delete_err) = self.delete_order(order_id).await {
                tracing::error!(
                    order_id = %order_id,
                    order_number = %order.order_number,
                    error = %delete_err,
                    "Failed to roll back order after item insert failure; order left without items"
                );
            }
            return Err(PlaceOrderError::ItemsInsert(items_err));
        }

        Ok(order_id)
    }
}
