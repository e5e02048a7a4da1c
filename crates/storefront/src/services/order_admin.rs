//! Administrative order status changes.
//!
//! Shoppers only ever create `pending` orders. Everything after that is an
//! operator moving the order along [`OrderStatus`]'s lifecycle.

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, instrument};

use bloom_core::{OrderId, OrderStatus};

use crate::db::RepositoryError;
use crate::models::Order;

/// Default number of orders returned by [`OrderAdminService::list`].
pub const DEFAULT_LIST_LIMIT: i64 = 100;

/// Errors that can occur when changing an order's status.
#[derive(Debug, Error)]
pub enum OrderAdminError {
    /// No order with that id.
    #[error("order not found")]
    NotFound,

    /// The lifecycle does not allow this move.
    #[error("cannot move order from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// The order changed status between the read and the update.
    #[error("order status changed concurrently, reload and try again")]
    StaleStatus,

    /// Database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Store operations for order administration.
#[async_trait]
pub trait OrderAdminStore: Send + Sync {
    /// Get an order by id regardless of owner.
    async fn get_order_by_id(&self, id: OrderId) -> Result<Option<Order>, RepositoryError>;

    /// Set `to` if the order is still in `from`. Returns whether it was updated.
    async fn update_status(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<bool, RepositoryError>;

    /// Orders, newest first, optionally only those in `status`.
    async fn list_orders_by_status(
        &self,
        status: Option<OrderStatus>,
        limit: i64,
    ) -> Result<Vec<Order>, RepositoryError>;
}

/// Order administration over an [`OrderAdminStore`].
pub struct OrderAdminService<S> {
    store: S,
}

impl<S: OrderAdminStore> OrderAdminService<S> {
    /// Create a new admin service.
    #[must_use]
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// Move an order to `target`.
    ///
    /// Returns the order as it is after the update.
    ///
    /// # Errors
    ///
    /// Returns `OrderAdminError::NotFound` if the order does not exist.
    /// Returns `OrderAdminError::InvalidTransition` if the lifecycle forbids the move.
    /// Returns `OrderAdminError::StaleStatus` if another update won the race.
    #[instrument(skip(self), fields(order_id = %order_id, target = %target))]
    pub async fn transition(
        &self,
        order_id: OrderId,
        target: OrderStatus,
    ) -> Result<Order, OrderAdminError> {
        let order = self
            .store
            .get_order_by_id(order_id)
            .await?
            .ok_or(OrderAdminError::NotFound)?;

        let from = order.status;
        if !from.can_transition_to(target) {
            return Err(OrderAdminError::InvalidTransition { from, to: target });
        }

        if !self.store.update_status(order_id, from, target).await? {
            return Err(OrderAdminError::StaleStatus);
        }

        info!(from = %from, to = %target, "Order status updated");

        self.store
            .get_order_by_id(order_id)
            .await?
            .ok_or(OrderAdminError::NotFound)
    }

    /// List recent orders, optionally filtered by status.
    ///
    /// # Errors
    ///
    /// Returns `OrderAdminError::Repository` if the query fails.
    pub async fn list(&self, status: Option<OrderStatus>) -> Result<Vec<Order>, OrderAdminError> {
        Ok(self
            .store
            .list_orders_by_status(status, DEFAULT_LIST_LIMIT)
            .await?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;

    use bloom_core::{AddressId, CartTotals, Money, OrderNumber, PricingPolicy, UserId};

    use super::*;
    use crate::db::MemoryStore;
    use crate::models::NewOrder;
    use crate::services::checkout::CheckoutStore;

    async fn pending_order(store: &MemoryStore, suffix: u16) -> OrderId {
        let totals = CartTotals::compute(
            &[(Money::from_cents(2000), 1_u32)],
            &PricingPolicy::default(),
        );
        let order = NewOrder::pending(
            UserId::new(1),
            OrderNumber::generate(Utc::now(), suffix),
            &totals,
            AddressId::new(1),
            None,
        );
        store.insert_order(&order).await.unwrap()
    }

    #[tokio::test]
    async fn test_walks_fulfillment_path() {
        let store = MemoryStore::new();
        let id = pending_order(&store, 1).await;
        let admin = OrderAdminService::new(store);

        for target in [
            OrderStatus::Confirmed,
            OrderStatus::Processing,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
        ] {
            let order = admin.transition(id, target).await.unwrap();
            assert_eq!(order.status, target);
        }
    }

    #[tokio::test]
    async fn test_rejects_illegal_transition() {
        let store = MemoryStore::new();
        let id = pending_order(&store, 1).await;
        let admin = OrderAdminService::new(store);

        let result = admin.transition(id, OrderStatus::Shipped).await;

        assert!(matches!(
            result,
            Err(OrderAdminError::InvalidTransition {
                from: OrderStatus::Pending,
                to: OrderStatus::Shipped
            })
        ));
    }

    #[tokio::test]
    async fn test_terminal_orders_cannot_move() {
        let store = MemoryStore::new();
        let id = pending_order(&store, 1).await;
        let admin = OrderAdminService::new(store);

        admin.transition(id, OrderStatus::Cancelled).await.unwrap();
        let result = admin.transition(id, OrderStatus::Confirmed).await;

        assert!(matches!(
            result,
            Err(OrderAdminError::InvalidTransition { .. })
        ));
    }

    #[tokio::test]
    async fn test_missing_order() {
        let admin = OrderAdminService::new(MemoryStore::new());
        assert!(matches!(
            admin.transition(OrderId::new(99), OrderStatus::Confirmed).await,
            Err(OrderAdminError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_list_filters_by_status() {
        let store = MemoryStore::new();
        let first = pending_order(&store, 1).await;
        pending_order(&store, 2).await;
        let admin = OrderAdminService::new(store);
        admin.transition(first, OrderStatus::Confirmed).await.unwrap();

        let confirmed = admin.list(Some(OrderStatus::Confirmed)).await.unwrap();
        assert_eq!(confirmed.len(), 1);
        assert_eq!(confirmed[0].id, first);
        assert_eq!(admin.list(None).await.unwrap().len(), 2);
    }

    /// Lets another operator cancel the order between the read and the write.
    struct RacingStore(MemoryStore);

    #[async_trait]
    impl OrderAdminStore for RacingStore {
        async fn get_order_by_id(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
            self.0.get_order_by_id(id).await
        }

        async fn update_status(
            &self,
            id: OrderId,
            from: OrderStatus,
            to: OrderStatus,
        ) -> Result<bool, RepositoryError> {
            self.0
                .update_status(id, from, OrderStatus::Cancelled)
                .await?;
            self.0.update_status(id, from, to).await
        }

        async fn list_orders_by_status(
            &self,
            status: Option<OrderStatus>,
            limit: i64,
        ) -> Result<Vec<Order>, RepositoryError> {
            self.0.list_orders_by_status(status, limit).await
        }
    }

    #[tokio::test]
    async fn test_lost_race_is_stale() {
        let store = MemoryStore::new();
        let id = pending_order(&store, 1).await;
        let admin = OrderAdminService::new(RacingStore(store.clone()));

        let result = admin.transition(id, OrderStatus::Confirmed).await;

        assert!(matches!(result, Err(OrderAdminError::StaleStatus)));
        let order = store.get_order_by_id(id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Cancelled);
    }
}
