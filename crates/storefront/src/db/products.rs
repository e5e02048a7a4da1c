//! Product repository.
//!
//! The storefront only reads products; writes come from `bloom-cli seed`.

use sqlx::PgPool;

use bloom_core::ProductId;

use super::RepositoryError;
use crate::models::{NewProduct, Product};

/// Whether an upsert created a row or refreshed an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

/// Repository for catalog product operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a product by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(
            r"
            SELECT id, sku, name, brand, category, price, image_url, is_active
            FROM storefront.products
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(product)
    }

    /// List active products by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_active(&self) -> Result<Vec<Product>, RepositoryError> {
        let products = sqlx::query_as::<_, Product>(
            r"
            SELECT id, sku, name, brand, category, price, image_url, is_active
            FROM storefront.products
            WHERE is_active
            ORDER BY name ASC, id ASC
            ",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(products)
    }

    /// Insert a product, or refresh the existing row with the same SKU.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert(&self, product: &NewProduct) -> Result<UpsertOutcome, RepositoryError> {
        // `xmax = 0` only for rows created by this statement.
        let inserted: bool = sqlx::query_scalar(
            r"
            INSERT INTO storefront.products (sku, name, brand, category, price, image_url, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (sku) DO UPDATE SET
                name = EXCLUDED.name,
                brand = EXCLUDED.brand,
                category = EXCLUDED.category,
                price = EXCLUDED.price,
                image_url = EXCLUDED.image_url,
                is_active = EXCLUDED.is_active,
                updated_at = NOW()
            RETURNING (xmax = 0)
            ",
        )
        .bind(product.sku.trim())
        .bind(product.name.trim())
        .bind(product.brand.trim())
        .bind(product.category.trim())
        .bind(product.price)
        .bind(product.image_url.as_deref())
        .bind(product.is_active)
        .fetch_one(self.pool)
        .await?;

        Ok(if inserted {
            UpsertOutcome::Inserted
        } else {
            UpsertOutcome::Updated
        })
    }

    /// Deactivate every product.
    ///
    /// Rows are kept because order items reference them.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn deactivate_all(&self) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            "UPDATE storefront.products SET is_active = FALSE, updated_at = NOW() WHERE is_active",
        )
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
