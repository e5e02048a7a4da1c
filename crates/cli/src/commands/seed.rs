//! Seed the product catalog from a YAML file.
//!
//! ```yaml
//! products:
//!   - sku: SER-001
//!     name: Vitamin C Brightening Serum
//!     brand: Bloom
//!     category: skincare
//!     price: "24.99"
//! ```
//!
//! Products are keyed by SKU, so seeding the same file twice refreshes rows
//! instead of duplicating them.

use std::path::Path;

use serde::Deserialize;
use tracing::{error, info};

use bloom_storefront::db::{ProductRepository, UpsertOutcome};
use bloom_storefront::models::NewProduct;

use super::{CliError, connect};

/// Top-level shape of a catalog file.
#[derive(Debug, Deserialize)]
pub struct CatalogFile {
    pub products: Vec<NewProduct>,
}

/// Validate every product, returning one message per problem.
#[must_use]
pub fn validate_catalog(catalog: &CatalogFile) -> Vec<String> {
    let mut errors: Vec<String> = catalog
        .products
        .iter()
        .filter_map(|p| p.validate().err())
        .collect();

    let mut seen = std::collections::HashSet::new();
    for product in &catalog.products {
        if !seen.insert(product.sku.trim()) {
            errors.push(format!("{}: duplicate sku", product.sku));
        }
    }

    errors
}

/// Seed products from a YAML file.
///
/// # Arguments
///
/// * `file_path` - Path to the catalog file
/// * `clear_existing` - If true, deactivate every current product first
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, fails validation,
/// or a database operation fails.
pub async fn products(file_path: &Path, clear_existing: bool) -> Result<(), CliError> {
    info!(path = %file_path.display(), "Loading catalog from file");

    // Read and validate before touching the database
    let content = tokio::fs::read_to_string(file_path)
        .await
        .map_err(|source| CliError::Io {
            path: file_path.display().to_string(),
            source,
        })?;
    let catalog: CatalogFile = serde_yaml::from_str(&content)?;

    info!(products = catalog.products.len(), "Parsed catalog");

    let errors = validate_catalog(&catalog);
    if !errors.is_empty() {
        error!("Catalog validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        return Err(CliError::InvalidCatalog(errors.len()));
    }

    let pool = connect().await?;
    let repo = ProductRepository::new(&pool);

    if clear_existing {
        let deactivated = repo.deactivate_all().await?;
        info!(deactivated, "Deactivated existing products");
    }

    let (mut inserted, mut updated) = (0_usize, 0_usize);
    for product in &catalog.products {
        match repo.upsert(product).await? {
            UpsertOutcome::Inserted => inserted += 1,
            UpsertOutcome::Updated => updated += 1,
        }
    }

    info!("Seeding complete!");
    info!("  Products inserted: {inserted}");
    info!("  Products updated: {updated}");

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_catalog_is_valid() {
        let content = include_str!("../../data/products.yaml");
        let catalog: CatalogFile = serde_yaml::from_str(content).unwrap();
        assert!(!catalog.products.is_empty());
        assert!(validate_catalog(&catalog).is_empty());
    }

    #[test]
    fn test_duplicate_and_invalid_entries_reported() {
        let catalog: CatalogFile = serde_yaml::from_str(
            r#"
products:
  - { sku: A-1, name: Toner, brand: Bloom, category: skincare, price: "12.00" }
  - { sku: A-1, name: Toner Refill, brand: Bloom, category: skincare, price: "9.00" }
  - { sku: B-1, name: "", brand: Bloom, category: makeup, price: "5.00" }
"#,
        )
        .unwrap();

        let errors = validate_catalog(&catalog);
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().any(|e| e.contains("duplicate sku")));
        assert!(errors.iter().any(|e| e.contains("name is required")));
    }
}
