//! Cart repository.
//!
//! Cart lines are loaded together with the product's current price. That
//! price becomes the line's `unit_price` snapshot used by checkout.

use sqlx::{PgExecutor, PgPool};

use bloom_core::{CartLineId, Money, ProductId, UserId};

use super::RepositoryError;
use crate::models::{CartLine, MAX_LINE_QUANTITY};

#[derive(Debug, sqlx::FromRow)]
struct CartLineRow {
    id: CartLineId,
    product_id: ProductId,
    quantity: i32,
    unit_price: Money,
    product_name: String,
    image_url: Option<String>,
    brand: Option<String>,
}

impl TryFrom<CartLineRow> for CartLine {
    type Error = RepositoryError;

    fn try_from(row: CartLineRow) -> Result<Self, Self::Error> {
        let quantity = u32::try_from(row.quantity)
            .ok()
            .filter(|q| *q >= 1)
            .ok_or_else(|| {
                RepositoryError::DataCorruption(format!(
                    "cart line {} has invalid quantity {}",
                    row.id, row.quantity
                ))
            })?;

        Ok(Self {
            id: row.id,
            product_id: row.product_id,
            quantity,
            unit_price: row.unit_price,
            product_name: row.product_name,
            image_url: row.image_url,
            brand: row.brand,
        })
    }
}

fn quantity_param(quantity: u32) -> Result<i32, RepositoryError> {
    i32::try_from(quantity)
        .map_err(|_| RepositoryError::DataCorruption(format!("quantity {quantity} out of range")))
}

/// Delete every cart line of `owner`.
///
/// Returns the number of lines removed.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn clear<'e, E: PgExecutor<'e>>(executor: E, owner: UserId) -> Result<u64, RepositoryError> {
    let result = sqlx::query("DELETE FROM storefront.cart_lines WHERE user_id = $1")
        .bind(owner)
        .execute(executor)
        .await?;

    Ok(result.rows_affected())
}

/// Repository for cart database operations.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Load an owner's cart, newest line first, with live product prices.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored quantity is invalid.
    pub async fn lines_for(&self, owner: UserId) -> Result<Vec<CartLine>, RepositoryError> {
        let rows = sqlx::query_as::<_, CartLineRow>(
            r"
            SELECT c.id, c.product_id, c.quantity,
                   p.price AS unit_price, p.name AS product_name, p.image_url,
                   NULLIF(p.brand, '') AS brand
            FROM storefront.cart_lines c
            JOIN storefront.products p ON p.id = c.product_id
            WHERE c.user_id = $1 AND p.is_active
            ORDER BY c.created_at DESC, c.id DESC
            ",
        )
        .bind(owner)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(CartLine::try_from).collect()
    }

    /// Add a product to the cart, or increase the quantity if already present.
    ///
    /// A merged line is capped at [`MAX_LINE_QUANTITY`].
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist or is inactive.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn add(
        &self,
        owner: UserId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<CartLineId, RepositoryError> {
        let quantity = quantity_param(quantity.clamp(1, MAX_LINE_QUANTITY))?;

        let id: Option<CartLineId> = sqlx::query_scalar(
            r"
            INSERT INTO storefront.cart_lines (user_id, product_id, quantity)
            SELECT $1, p.id, $3
            FROM storefront.products p
            WHERE p.id = $2 AND p.is_active
            ON CONFLICT (user_id, product_id)
            DO UPDATE SET quantity = LEAST(storefront.cart_lines.quantity + EXCLUDED.quantity, $4)
            RETURNING id
            ",
        )
        .bind(owner)
        .bind(product_id)
        .bind(quantity)
        .bind(quantity_param(MAX_LINE_QUANTITY)?)
        .fetch_optional(self.pool)
        .await?;

        id.ok_or(RepositoryError::NotFound)
    }

    /// Set a line's quantity. A quantity of zero removes the line.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the line does not belong to `owner`.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn set_quantity(
        &self,
        owner: UserId,
        line_id: CartLineId,
        quantity: u32,
    ) -> Result<(), RepositoryError> {
        if quantity == 0 {
            return self.remove(owner, line_id).await;
        }

        let result = sqlx::query(
            r"
            UPDATE storefront.cart_lines
            SET quantity = $3
            WHERE id = $1 AND user_id = $2
            ",
        )
        .bind(line_id)
        .bind(owner)
        .bind(quantity_param(quantity)?)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    /// Remove a line from the owner's cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the line does not belong to `owner`.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn remove(&self, owner: UserId, line_id: CartLineId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM storefront.cart_lines WHERE id = $1 AND user_id = $2")
            .bind(line_id)
            .bind(owner)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    /// Total units in the owner's cart (the header badge count).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&self, owner: UserId) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(quantity), 0)::int8 FROM storefront.cart_lines WHERE user_id = $1",
        )
        .bind(owner)
        .fetch_one(self.pool)
        .await?;

        Ok(count)
    }
}
