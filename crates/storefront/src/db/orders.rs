//! Order repository.
//!
//! The write helpers take any `PgExecutor`, so the same statements run
//! directly on the pool or inside the checkout transaction.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgExecutor, PgPool};

use bloom_core::{IdempotencyKey, Money, OrderId, OrderItemId, OrderStatus, ProductId, UserId};

use super::RepositoryError;
use crate::models::{NewOrder, NewOrderItem, Order, OrderItemDetail};

/// Order item row joined with product display fields.
#[derive(Debug, sqlx::FromRow)]
struct OrderItemRow {
    id: OrderItemId,
    order_id: OrderId,
    product_id: ProductId,
    quantity: i32,
    price_at_purchase: Money,
    total_price: Money,
    product_name: Option<String>,
    image_url: Option<String>,
    brand: Option<String>,
}

impl TryFrom<OrderItemRow> for OrderItemDetail {
    type Error = RepositoryError;

    fn try_from(row: OrderItemRow) -> Result<Self, Self::Error> {
        let quantity = u32::try_from(row.quantity).map_err(|_| {
            RepositoryError::DataCorruption(format!(
                "order item {} has negative quantity {}",
                row.id, row.quantity
            ))
        })?;

        Ok(Self {
            id: row.id,
            order_id: row.order_id,
            product_id: row.product_id,
            quantity,
            price_at_purchase: row.price_at_purchase,
            total_price: row.total_price,
            product_name: row.product_name,
            image_url: row.image_url,
            brand: row.brand,
        })
    }
}

/// Insert an order row and return its id.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` on a duplicate order number or
/// idempotency key, `RepositoryError::Database` otherwise.
pub async fn insert_order<'e, E: PgExecutor<'e>>(
    executor: E,
    order: &NewOrder,
) -> Result<OrderId, RepositoryError> {
    let id: OrderId = sqlx::query_scalar(
        r"
        INSERT INTO storefront.orders (
            user_id, order_number, subtotal, shipping_amount, tax_amount,
            total_amount, status, shipping_address_id, billing_address_id,
            idempotency_key
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING id
        ",
    )
    .bind(order.user_id)
    .bind(&order.order_number)
    .bind(order.subtotal)
    .bind(order.shipping_amount)
    .bind(order.tax_amount)
    .bind(order.total_amount)
    .bind(order.status)
    .bind(order.shipping_address_id)
    .bind(order.billing_address_id)
    .bind(order.idempotency_key.as_ref())
    .fetch_one(executor)
    .await
    .map_err(|e| RepositoryError::from_unique_violation(e, "orders_order_number_uniq"))?;

    Ok(id)
}

/// Insert all items of an order in a single statement.
///
/// # Errors
///
/// Returns `RepositoryError::DataCorruption` if a quantity does not fit the
/// column, `RepositoryError::Database` if the insert fails.
pub async fn insert_order_items<'e, E: PgExecutor<'e>>(
    executor: E,
    order_id: OrderId,
    items: &[NewOrderItem],
) -> Result<(), RepositoryError> {
    let mut product_ids = Vec::with_capacity(items.len());
    let mut quantities = Vec::with_capacity(items.len());
    let mut prices = Vec::with_capacity(items.len());
    let mut totals = Vec::with_capacity(items.len());

    for item in items {
        let quantity = i32::try_from(item.quantity).map_err(|_| {
            RepositoryError::DataCorruption(format!("quantity {} out of range", item.quantity))
        })?;
        product_ids.push(item.product_id.as_i32());
        quantities.push(quantity);
        prices.push(Decimal::from(item.price_at_purchase));
        totals.push(Decimal::from(item.total_price));
    }

    sqlx::query(
        r"
        INSERT INTO storefront.order_items (
            order_id, product_id, quantity, price_at_purchase, total_price
        )
        SELECT $1, t.product_id, t.quantity, t.price_at_purchase, t.total_price
        FROM UNNEST($2::int4[], $3::int4[], $4::numeric[], $5::numeric[])
            AS t(product_id, quantity, price_at_purchase, total_price)
        ",
    )
    .bind(order_id)
    .bind(product_ids)
    .bind(quantities)
    .bind(prices)
    .bind(totals)
    .execute(executor)
    .await?;

    Ok(())
}

/// Delete an order (its items cascade).
///
/// Returns `true` if a row was deleted.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn delete_order<'e, E: PgExecutor<'e>>(
    executor: E,
    order_id: OrderId,
) -> Result<bool, RepositoryError> {
    let result = sqlx::query("DELETE FROM storefront.orders WHERE id = $1")
        .bind(order_id)
        .execute(executor)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Repository for order reads and admin status updates.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get an order by id, only if it belongs to `owner`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_for_owner(
        &self,
        id: OrderId,
        owner: UserId,
    ) -> Result<Option<Order>, RepositoryError> {
        let order = sqlx::query_as::<_, Order>(
            r"
            SELECT id, user_id, order_number, subtotal, shipping_amount, tax_amount,
                   total_amount, status, shipping_address_id, billing_address_id,
                   idempotency_key, created_at, updated_at
            FROM storefront.orders
            WHERE id = $1 AND user_id = $2
            ",
        )
        .bind(id)
        .bind(owner)
        .fetch_optional(self.pool)
        .await?;

        Ok(order)
    }

    /// Get an order by id regardless of owner (admin use).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let order = sqlx::query_as::<_, Order>(
            r"
            SELECT id, user_id, order_number, subtotal, shipping_amount, tax_amount,
                   total_amount, status, shipping_address_id, billing_address_id,
                   idempotency_key, created_at, updated_at
            FROM storefront.orders
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(order)
    }

    /// Get the items of an order with product display fields.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored quantity is negative.
    pub async fn items(&self, order_id: OrderId) -> Result<Vec<OrderItemDetail>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderItemRow>(
            r"
            SELECT oi.id, oi.order_id, oi.product_id, oi.quantity,
                   oi.price_at_purchase, oi.total_price,
                   p.name AS product_name, p.image_url, p.brand
            FROM storefront.order_items oi
            LEFT JOIN storefront.products p ON p.id = oi.product_id
            WHERE oi.order_id = $1
            ORDER BY oi.id ASC
            ",
        )
        .bind(order_id)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(OrderItemDetail::try_from).collect()
    }

    /// List an owner's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_owner(&self, owner: UserId) -> Result<Vec<Order>, RepositoryError> {
        let orders = sqlx::query_as::<_, Order>(
            r"
            SELECT id, user_id, order_number, subtotal, shipping_amount, tax_amount,
                   total_amount, status, shipping_address_id, billing_address_id,
                   idempotency_key, created_at, updated_at
            FROM storefront.orders
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            ",
        )
        .bind(owner)
        .fetch_all(self.pool)
        .await?;

        Ok(orders)
    }

    /// List all orders, optionally filtered by status, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        status: Option<OrderStatus>,
        limit: i64,
    ) -> Result<Vec<Order>, RepositoryError> {
        let orders = sqlx::query_as::<_, Order>(
            r"
            SELECT id, user_id, order_number, subtotal, shipping_amount, tax_amount,
                   total_amount, status, shipping_address_id, billing_address_id,
                   idempotency_key, created_at, updated_at
            FROM storefront.orders
            WHERE $1::storefront.order_status IS NULL OR status = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            ",
        )
        .bind(status)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        Ok(orders)
    }

    /// Find an owner's order placed with `key` at or after `since`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_by_idempotency_key(
        &self,
        owner: UserId,
        key: &IdempotencyKey,
        since: DateTime<Utc>,
    ) -> Result<Option<Order>, RepositoryError> {
        let order = sqlx::query_as::<_, Order>(
            r"
            SELECT id, user_id, order_number, subtotal, shipping_amount, tax_amount,
                   total_amount, status, shipping_address_id, billing_address_id,
                   idempotency_key, created_at, updated_at
            FROM storefront.orders
            WHERE user_id = $1 AND idempotency_key = $2 AND created_at >= $3
            ",
        )
        .bind(owner)
        .bind(key)
        .bind(since)
        .fetch_optional(self.pool)
        .await?;

        Ok(order)
    }

    /// Move an order from `from` to `to` if it is still in `from`.
    ///
    /// Returns `false` when the order is missing or its status changed
    /// concurrently.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn update_status(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE storefront.orders
            SET status = $3, updated_at = NOW()
            WHERE id = $1 AND status = $2
            ",
        )
        .bind(id)
        .bind(from)
        .bind(to)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
