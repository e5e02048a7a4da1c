//! Database operations for storefront `PostgreSQL`.
//!
//! # Database: `bloom_storefront`
//!
//! ## Tables (schema `storefront`)
//!
//! - `users` - Shopper identities (populated by the auth service)
//! - `products` - Catalog, seeded by `bloom-cli seed products`
//! - `cart_lines` - In-progress carts, one row per product per user
//! - `addresses` - Saved shipping addresses
//! - `orders` - Committed orders
//! - `order_items` - Line items owned by an order
//!
//! Sessions live in the `tower_sessions` schema managed by the session store.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p bloom-cli -- migrate
//! ```

pub mod addresses;
pub mod cart;
pub mod checkout;
pub mod memory;
pub mod orders;
pub mod products;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;
use tower_sessions_sqlx_store::PostgresStore;

pub use addresses::AddressRepository;
pub use cart::CartRepository;
pub use checkout::PgCheckoutStore;
pub use memory::{FailPoint, MemoryStore};
pub use orders::OrderRepository;
pub use products::{ProductRepository, UpsertOutcome};

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., duplicate order number).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// The backing store could not be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl RepositoryError {
    /// Map a unique violation to `Conflict`, anything else to `Database`.
    pub(crate) fn from_unique_violation(err: sqlx::Error, what: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = err
            && db_err.is_unique_violation()
        {
            let constraint = db_err.constraint().unwrap_or(what);
            return Self::Conflict(constraint.to_owned());
        }
        Self::Database(err)
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Errors from running migrations.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// A schema migration failed.
    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    /// The session store table could not be created.
    #[error("session store migration error: {0}")]
    SessionStore(#[from] sqlx::Error),
}

/// Apply the storefront schema migrations and create the session table.
///
/// # Errors
///
/// Returns `MigrationError` if any migration fails.
pub async fn migrate(pool: &PgPool) -> Result<(), MigrationError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    PostgresStore::new(pool.clone()).migrate().await?;
    Ok(())
}
