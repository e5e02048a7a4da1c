//! Application state shared across handlers.

use std::sync::Arc;

use chrono::TimeDelta;
use sqlx::PgPool;

use crate::config::StorefrontConfig;
use crate::db::PgCheckoutStore;
use crate::services::{CartEventHub, CheckoutService, ConfirmationReader};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    events: CartEventHub,
    checkout: CheckoutService<PgCheckoutStore>,
    confirmation: ConfirmationReader<PgCheckoutStore>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Storefront configuration
    /// * `pool` - `PostgreSQL` connection pool
    #[must_use]
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Self {
        let events = CartEventHub::default();
        let store = PgCheckoutStore::new(pool.clone());

        let checkout = CheckoutService::new(store.clone(), events.clone())
            .with_policy(config.checkout.pricing.clone())
            .with_idempotency_window(TimeDelta::hours(config.checkout.idempotency_window_hours));
        let confirmation = ConfirmationReader::new(store);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                events,
                checkout,
                confirmation,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the cart event hub.
    #[must_use]
    pub fn events(&self) -> &CartEventHub {
        &self.inner.events
    }

    /// Get a reference to the checkout orchestrator.
    #[must_use]
    pub fn checkout(&self) -> &CheckoutService<PgCheckoutStore> {
        &self.inner.checkout
    }

    /// Get a reference to the order confirmation reader.
    #[must_use]
    pub fn confirmation(&self) -> &ConfirmationReader<PgCheckoutStore> {
        &self.inner.confirmation
    }
}
