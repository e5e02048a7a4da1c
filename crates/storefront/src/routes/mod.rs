//! HTTP route handlers for storefront.
//!
//! All handlers speak JSON.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                         - Liveness check
//! GET  /health/ready                   - Database connectivity check
//!
//! # Cart
//! GET  /cart                           - Cart lines and totals
//! POST /cart/add                       - Add a product
//! POST /cart/update                    - Change a quantity (0 removes)
//! POST /cart/remove                    - Remove a line
//! GET  /cart/count                     - Units in the cart
//!
//! # Checkout
//! GET  /checkout                       - Summary with addresses
//! POST /checkout                       - Place the order
//!
//! # Orders
//! GET  /orders                         - Order history
//! GET  /orders/{id}                    - Order confirmation
//!
//! # Account (requires auth)
//! GET  /account/addresses              - Address list
//! POST /account/addresses              - Create address
//! POST /account/addresses/{id}         - Update address
//! POST /account/addresses/{id}/delete  - Delete address
//! POST /account/addresses/{id}/default - Make default
//! ```

pub mod addresses;
pub mod cart;
pub mod checkout;
pub mod orders;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/count", get(cart::count))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::index))
        .route("/{id}", get(orders::show))
}

/// Create the account routes router.
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/addresses",
            get(addresses::index).post(addresses::create),
        )
        .route("/addresses/{id}", post(addresses::update))
        .route("/addresses/{id}/delete", post(addresses::delete))
        .route("/addresses/{id}/default", post(addresses::set_default))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/cart", cart_routes())
        .route("/checkout", get(checkout::show).post(checkout::place))
        .nest("/orders", order_routes())
        .nest("/account", account_routes())
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
