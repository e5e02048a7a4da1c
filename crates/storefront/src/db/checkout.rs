//! `PostgreSQL` implementation of the checkout and admin store traits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use bloom_core::{AddressId, IdempotencyKey, OrderId, OrderStatus, UserId};

use super::{AddressRepository, OrderRepository, RepositoryError, cart, orders};
use crate::models::{Address, NewOrder, NewOrderItem, Order, OrderItemDetail};
use crate::services::checkout::{CheckoutStore, PlaceOrderError};
use crate::services::order_admin::OrderAdminStore;

/// Checkout store backed by the storefront database.
#[derive(Debug, Clone)]
pub struct PgCheckoutStore {
    pool: PgPool,
}

impl PgCheckoutStore {
    /// Create a store over `pool`.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl CheckoutStore for PgCheckoutStore {
    async fn insert_order(&self, order: &NewOrder) -> Result<OrderId, RepositoryError> {
        orders::insert_order(&self.pool, order).await
    }

    async fn insert_order_items(
        &self,
        order_id: OrderId,
        items: &[NewOrderItem],
    ) -> Result<(), RepositoryError> {
        orders::insert_order_items(&self.pool, order_id, items).await
    }

    async fn delete_order(&self, order_id: OrderId) -> Result<(), RepositoryError> {
        if orders::delete_order(&self.pool, order_id).await? {
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    async fn delete_cart_lines(&self, owner: UserId) -> Result<(), RepositoryError> {
        cart::clear(&self.pool, owner).await.map(|_| ())
    }

    async fn get_order(&self, id: OrderId, owner: UserId) -> Result<Option<Order>, RepositoryError> {
        OrderRepository::new(&self.pool).get_for_owner(id, owner).await
    }

    async fn get_order_items(
        &self,
        order_id: OrderId,
    ) -> Result<Vec<OrderItemDetail>, RepositoryError> {
        OrderRepository::new(&self.pool).items(order_id).await
    }

    async fn get_address(&self, id: AddressId) -> Result<Option<Address>, RepositoryError> {
        AddressRepository::new(&self.pool).get_any(id).await
    }

    async fn find_order_by_idempotency_key(
        &self,
        owner: UserId,
        key: &IdempotencyKey,
        since: DateTime<Utc>,
    ) -> Result<Option<Order>, RepositoryError> {
        OrderRepository::new(&self.pool)
            .find_by_idempotency_key(owner, key, since)
            .await
    }

    async fn list_orders(&self, owner: UserId) -> Result<Vec<Order>, RepositoryError> {
        OrderRepository::new(&self.pool).list_for_owner(owner).await
    }

    /// Order and items are written in one transaction: either both exist
    /// afterwards or neither does.
    async fn place_order(
        &self,
        order: &NewOrder,
        items: &[NewOrderItem],
    ) -> Result<OrderId, PlaceOrderError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| PlaceOrderError::OrderInsert(e.into()))?;

        let order_id = orders::insert_order(&mut *tx, order)
            .await
            .map_err(PlaceOrderError::OrderInsert)?;

        orders::insert_order_items(&mut *tx, order_id, items)
            .await
            .map_err(PlaceOrderError::ItemsInsert)?;

        tx.commit()
            .await
            .map_err(|e| PlaceOrderError::ItemsInsert(e.into()))?;

        Ok(order_id)
    }
}

#[async_trait]
impl OrderAdminStore for PgCheckoutStore {
    async fn get_order_by_id(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        OrderRepository::new(&self.pool).get(id).await
    }

    async fn update_status(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<bool, RepositoryError> {
        OrderRepository::new(&self.pool)
            .update_status(id, from, to)
            .await
    }

    async fn list_orders_by_status(
        &self,
        status: Option<OrderStatus>,
        limit: i64,
    ) -> Result<Vec<Order>, RepositoryError> {
        OrderRepository::new(&self.pool).list(status, limit).await
    }
}
