//! Integration tests for Bloom Beauty.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p bloom-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `checkout_flow` - Cart to order, failures and idempotent replay
//! - `order_confirmation` - Reading orders back, ownership and degraded addresses
//! - `order_admin` - Status lifecycle and concurrent updates
//! - `http` - Router wiring, authentication and health checks
//!
//! The service tests run against [`MemoryStore`], which implements the same
//! store traits as the `PostgreSQL` repositories. The HTTP tests build the
//! real router over a lazily connected pool that is never reached.

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;

use bloom_core::{AddressType, Money, ProductId, UserId};
use bloom_storefront::config::StorefrontConfig;
use bloom_storefront::db::MemoryStore;
use bloom_storefront::models::{Address, AddressInput};
use bloom_storefront::services::{
    CartEventHub, CheckoutRequest, CheckoutService, ConfirmationReader, OrderAdminService,
};
use bloom_storefront::state::AppState;

/// The storefront services wired over one shared [`MemoryStore`].
pub struct Shop {
    pub store: MemoryStore,
    pub events: CartEventHub,
    pub checkout: CheckoutService<MemoryStore>,
    pub confirmation: ConfirmationReader<MemoryStore>,
    pub admin: OrderAdminService<MemoryStore>,
}

impl Default for Shop {
    fn default() -> Self {
        Self::new()
    }
}

impl Shop {
    /// A shop with an empty store and the default pricing policy.
    #[must_use]
    pub fn new() -> Self {
        let store = MemoryStore::new();
        let events = CartEventHub::default();
        Self {
            checkout: CheckoutService::new(store.clone(), events.clone()),
            confirmation: ConfirmationReader::new(store.clone()),
            admin: OrderAdminService::new(store.clone()),
            store,
            events,
        }
    }

    /// Add a product priced from a decimal string such as `"24.99"`.
    ///
    /// # Panics
    ///
    /// Panics if `price` is not a decimal.
    pub async fn product(&self, sku: &str, price: &str) -> ProductId {
        self.store.add_product(sku, sku, money(price)).await
    }

    /// A shopper with one default address.
    pub async fn shopper(&self, id: i32) -> Shopper {
        let user = UserId::new(id);
        let address = self
            .store
            .add_address(user, &address_input("Home", true))
            .await;
        Shopper { user, address }
    }

    /// Put `(product, quantity)` pairs in a shopper's cart.
    pub async fn fill_cart(&self, shopper: &Shopper, lines: &[(ProductId, u32)]) {
        for &(product, quantity) in lines {
            self.store
                .add_cart_line(shopper.user, product, quantity)
                .await;
        }
    }

    /// A checkout request for the shopper's current cart and default address.
    pub async fn request(&self, shopper: &Shopper) -> CheckoutRequest {
        CheckoutRequest {
            owner: Some(shopper.user),
            shipping_address_id: Some(shopper.address.id),
            lines: self.store.cart_lines(shopper.user).await,
            idempotency_key: None,
        }
    }
}

/// A signed-in shopper and their default address.
#[derive(Debug, Clone)]
pub struct Shopper {
    pub user: UserId,
    pub address: Address,
}

/// Parse a decimal string into [`Money`].
///
/// # Panics
///
/// Panics if `s` is not a decimal.
#[must_use]
#[allow(clippy::unwrap_used)]
pub fn money(s: &str) -> Money {
    s.parse().unwrap()
}

/// A complete address form.
#[must_use]
pub fn address_input(label: &str, is_default: bool) -> AddressInput {
    AddressInput {
        address_type: AddressType::Home,
        label: label.to_owned(),
        street: "12 Peony Lane".to_owned(),
        city: "Portland".to_owned(),
        state: "OR".to_owned(),
        postal_code: "97201".to_owned(),
        country: "US".to_owned(),
        is_default,
    }
}

/// Application state over a pool that fails fast if anything touches it.
///
/// # Panics
///
/// Panics if the built-in configuration or database URL is rejected.
#[must_use]
#[allow(clippy::unwrap_used)]
pub fn offline_state() -> AppState {
    let database_url = "postgres://bloom@127.0.0.1:1/bloom";
    let config = StorefrontConfig::from_lookup(&|key| match key {
        "STOREFRONT_DATABASE_URL" => Some(database_url.to_owned()),
        "STOREFRONT_BASE_URL" => Some("http://localhost:3000".to_owned()),
        _ => None,
    })
    .unwrap();

    let pool = PgPoolOptions::new()
        .acquire_timeout(Duration::from_millis(250))
        .connect_lazy(database_url)
        .unwrap();

    AppState::new(config, pool)
}
