//! Error reporting and structured logging setup for the storefront binary.

use sentry::integrations::tracing::{self as sentry_tracing, EventFilter};
use tracing::Level;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::SentryConfig;

/// Log directives used when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "bloom_storefront=info,tower_http=debug";

/// Start the Sentry client. Returns `None` when no DSN is configured.
///
/// The guard flushes pending events on drop, so hold it for the life of the process.
#[must_use]
pub fn init_sentry(config: &SentryConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.dsn.as_deref()?;

    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config.environment.clone().map(Into::into),
            sample_rate: config.sample_rate,
            traces_sample_rate: config.traces_sample_rate,
            attach_stacktrace: true,
            ..Default::default()
        },
    )))
}

/// Install the global subscriber: env filter, stdout formatter and the Sentry bridge.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer().event_filter(|metadata: &tracing::Metadata<'_>| {
            sentry_kind(*metadata.level())
        }))
        .init();
}

/// Warnings and errors become Sentry events; info and debug ride along as breadcrumbs.
fn sentry_kind(level: Level) -> EventFilter {
    match level {
        Level::ERROR | Level::WARN => EventFilter::Event,
        Level::INFO | Level::DEBUG => EventFilter::Breadcrumb,
        Level::TRACE => EventFilter::Ignore,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentry_kind_by_level() {
        assert_eq!(sentry_kind(Level::ERROR).bits(), EventFilter::Event.bits());
        assert_eq!(sentry_kind(Level::WARN).bits(), EventFilter::Event.bits());
        assert_eq!(sentry_kind(Level::INFO).bits(), EventFilter::Breadcrumb.bits());
        assert_eq!(sentry_kind(Level::DEBUG).bits(), EventFilter::Breadcrumb.bits());
        assert_eq!(sentry_kind(Level::TRACE).bits(), EventFilter::Ignore.bits());
    }

    #[test]
    fn test_sentry_disabled_without_dsn() {
        assert!(init_sentry(&SentryConfig::default()).is_none());
    }
}
