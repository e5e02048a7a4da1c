//! Bloom Beauty storefront binary.
//!
//! Loads configuration, starts telemetry, and serves the storefront router
//! until SIGINT or SIGTERM. Schema migrations are applied by `bloom-cli migrate`.

#![cfg_attr(not(test), forbid(unsafe_code))]

use bloom_storefront::{app, config::StorefrontConfig, db, state::AppState, telemetry};

#[tokio::main]
async fn main() {
    let config = StorefrontConfig::from_env().expect("invalid storefront configuration");

    let _sentry = telemetry::init_sentry(&config.sentry);
    telemetry::init_tracing();

    let pool = db::create_pool(&config.database_url)
        .await
        .expect("could not connect to the storefront database");

    let addr = config.socket_addr();
    let router = app(AppState::new(config, pool))
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction());

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("could not bind storefront listener");
    tracing::info!(%addr, "storefront ready");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("storefront server failed");
}

async fn shutdown_signal() {
    let interrupt = async {
        tokio::signal::ctrl_c().await.expect("SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = interrupt => {},
        () = terminate => {},
    }

    tracing::info!("draining in-flight requests");
}
