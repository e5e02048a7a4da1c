//! Catalog product model.

use serde::{Deserialize, Serialize};

use bloom_core::{Money, ProductId};

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Product {
    pub id: ProductId,
    pub sku: String,
    pub name: String,
    pub brand: String,
    pub category: String,
    pub price: Money,
    pub image_url: Option<String>,
    pub is_active: bool,
}

/// A product to insert or refresh in the catalog, keyed by SKU.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub sku: String,
    pub name: String,
    pub brand: String,
    pub category: String,
    pub price: Money,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

const fn default_active() -> bool {
    true
}

impl NewProduct {
    /// Check the fields a catalog entry must have.
    ///
    /// # Errors
    ///
    /// Returns a message naming the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.sku.trim().is_empty() {
            return Err("sku is required".to_owned());
        }
        if self.name.trim().is_empty() {
            return Err(format!("{}: name is required", self.sku));
        }
        if self.price.is_negative() {
            return Err(format!("{}: price cannot be negative", self.sku));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(sku: &str, name: &str, cents: i64) -> NewProduct {
        NewProduct {
            sku: sku.to_owned(),
            name: name.to_owned(),
            brand: "Bloom".to_owned(),
            category: "skincare".to_owned(),
            price: Money::from_cents(cents),
            image_url: None,
            is_active: true,
        }
    }

    #[test]
    fn test_validate_accepts_complete_product() {
        assert!(product("SER-001", "Vitamin C Serum", 2499).validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_missing_fields() {
        assert!(product(" ", "Serum", 100).validate().is_err());
        assert!(product("SER-002", "", 100).validate().is_err());
        assert!(product("SER-003", "Serum", -1).validate().is_err());
    }
}
