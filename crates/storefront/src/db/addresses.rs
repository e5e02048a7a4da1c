//! Address repository.
//!
//! Changing which address is the default always runs in a transaction that
//! clears the previous default first, so the partial unique index
//! `addresses_one_default_per_user` never trips on a legitimate update.

use sqlx::{PgConnection, PgPool};

use bloom_core::{AddressId, UserId};

use super::RepositoryError;
use crate::models::{Address, AddressInput};

const ADDRESS_COLUMNS: &str = "id, user_id, address_type, label, street, city, state, \
                               postal_code, country, is_default, created_at";

async fn clear_default(conn: &mut PgConnection, owner: UserId) -> Result<(), RepositoryError> {
    sqlx::query(
        "UPDATE storefront.addresses SET is_default = FALSE WHERE user_id = $1 AND is_default",
    )
    .bind(owner)
    .execute(conn)
    .await?;

    Ok(())
}

/// Repository for saved address operations.
pub struct AddressRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AddressRepository<'a> {
    /// Create a new address repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List an owner's addresses, default first, then newest.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_owner(&self, owner: UserId) -> Result<Vec<Address>, RepositoryError> {
        let addresses = sqlx::query_as::<_, Address>(&format!(
            "SELECT {ADDRESS_COLUMNS} FROM storefront.addresses \
             WHERE user_id = $1 \
             ORDER BY is_default DESC, created_at DESC, id DESC"
        ))
        .bind(owner)
        .fetch_all(self.pool)
        .await?;

        Ok(addresses)
    }

    /// Get an address by id regardless of owner.
    ///
    /// Used by the confirmation page, where an order may point at an address
    /// its owner has since reassigned or deleted.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_any(&self, id: AddressId) -> Result<Option<Address>, RepositoryError> {
        let address = sqlx::query_as::<_, Address>(&format!(
            "SELECT {ADDRESS_COLUMNS} FROM storefront.addresses WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(address)
    }

    /// Save a new address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(
        &self,
        owner: UserId,
        input: &AddressInput,
    ) -> Result<Address, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        if input.is_default {
            clear_default(&mut tx, owner).await?;
        }

        let address = sqlx::query_as::<_, Address>(&format!(
            "INSERT INTO storefront.addresses \
                 (user_id, address_type, label, street, city, state, postal_code, country, is_default) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {ADDRESS_COLUMNS}"
        ))
        .bind(owner)
        .bind(input.address_type)
        .bind(input.label.trim())
        .bind(input.street.trim())
        .bind(input.city.trim())
        .bind(input.state.trim())
        .bind(input.postal_code.trim())
        .bind(input.country.trim())
        .bind(input.is_default)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| RepositoryError::from_unique_violation(e, "addresses_one_default_per_user"))?;

        tx.commit().await?;

        Ok(address)
    }

    /// Replace an address's fields.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the address does not belong to `owner`.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn update(
        &self,
        id: AddressId,
        owner: UserId,
        input: &AddressInput,
    ) -> Result<Address, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        if input.is_default {
            clear_default(&mut tx, owner).await?;
        }

        let address = sqlx::query_as::<_, Address>(&format!(
            "UPDATE storefront.addresses \
             SET address_type = $3, label = $4, street = $5, city = $6, state = $7, \
                 postal_code = $8, country = $9, is_default = $10 \
             WHERE id = $1 AND user_id = $2 \
             RETURNING {ADDRESS_COLUMNS}"
        ))
        .bind(id)
        .bind(owner)
        .bind(input.address_type)
        .bind(input.label.trim())
        .bind(input.street.trim())
        .bind(input.city.trim())
        .bind(input.state.trim())
        .bind(input.postal_code.trim())
        .bind(input.country.trim())
        .bind(input.is_default)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| RepositoryError::from_unique_violation(e, "addresses_one_default_per_user"))?
        .ok_or(RepositoryError::NotFound)?;

        tx.commit().await?;

        Ok(address)
    }

    /// Make `id` the owner's only default address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the address does not belong to `owner`.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn set_default(&self, id: AddressId, owner: UserId) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        clear_default(&mut tx, owner).await?;

        let result = sqlx::query(
            "UPDATE storefront.addresses SET is_default = TRUE WHERE id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(owner)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            // Dropping the transaction rolls back the cleared default.
            return Err(RepositoryError::NotFound);
        }

        tx.commit().await?;

        Ok(())
    }

    /// Delete an address. Orders that referenced it keep their row with a
    /// null address reference.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the address does not belong to `owner`.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn delete(&self, id: AddressId, owner: UserId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM storefront.addresses WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(owner)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }
}
