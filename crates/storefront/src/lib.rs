//! Bloom Beauty storefront library.
//!
//! Cart, checkout and order confirmation for the public storefront. The
//! binary in `main.rs` wires these pieces to a `PostgreSQL` pool and an
//! axum server; the CLI and the integration tests use them directly.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod telemetry;

use axum::Router;

use state::AppState;

/// Build the storefront router with its per-request middleware.
///
/// Sentry layers are added by the binary, outermost.
pub fn app(state: AppState) -> Router {
    let session_layer = middleware::create_session_layer(state.pool(), state.config());

    routes::routes()
        .layer(session_layer)
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
        .layer(middleware::trace_layer())
        .with_state(state)
}
