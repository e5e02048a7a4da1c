//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `STOREFRONT_BASE_URL` - Public URL for the storefront
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment tag
//! - `SENTRY_SAMPLE_RATE` - Error event sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Performance trace sample rate (default: 0.0)
//! - `CHECKOUT_FREE_SHIPPING_THRESHOLD` - Subtotals above this ship free (default: 50)
//! - `CHECKOUT_FLAT_SHIPPING_FEE` - Shipping fee otherwise (default: 5.99)
//! - `CHECKOUT_TAX_RATE` - Flat tax rate (default: 0.08)
//! - `CHECKOUT_IDEMPOTENCY_WINDOW_HOURS` - Replay window for checkout keys (default: 24)

use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use rust_decimal::Decimal;
use secrecy::SecretString;
use thiserror::Error;

use bloom_core::{Money, PricingPolicy};

use crate::services::checkout::DEFAULT_IDEMPOTENCY_WINDOW_HOURS;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: String,
    /// Error tracking
    pub sentry: SentryConfig,
    /// Pricing and checkout behaviour
    pub checkout: CheckoutConfig,
}

/// Sentry error tracking configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct SentryConfig {
    /// DSN; Sentry is disabled when unset
    pub dsn: Option<String>,
    /// Environment tag (e.g. `production`)
    pub environment: Option<String>,
    /// Fraction of error events sent
    pub sample_rate: f32,
    /// Fraction of transactions traced
    pub traces_sample_rate: f32,
}

impl Default for SentryConfig {
    fn default() -> Self {
        Self {
            dsn: None,
            environment: None,
            sample_rate: 1.0,
            traces_sample_rate: 0.0,
        }
    }
}

/// Checkout configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutConfig {
    /// Shipping and tax rules
    pub pricing: PricingPolicy,
    /// Hours during which a repeated idempotency key replays the first order
    pub idempotency_window_hours: i64,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            pricing: PricingPolicy::default(),
            idempotency_window_hours: DEFAULT_IDEMPOTENCY_WINDOW_HOURS,
        }
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(&|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key/value source.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_lookup(env: &dyn Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url = env("STOREFRONT_DATABASE_URL")
            .or_else(|| env("DATABASE_URL"))
            .map(SecretString::from)
            .ok_or_else(|| ConfigError::MissingEnvVar("STOREFRONT_DATABASE_URL".to_string()))?;
        let host = parse_or(env, "STOREFRONT_HOST", IpAddr::from([127, 0, 0, 1]))?;
        let port = parse_or(env, "STOREFRONT_PORT", 3000_u16)?;
        let base_url = env("STOREFRONT_BASE_URL")
            .ok_or_else(|| ConfigError::MissingEnvVar("STOREFRONT_BASE_URL".to_string()))?;

        Ok(Self {
            database_url,
            host,
            port,
            base_url: base_url.trim_end_matches('/').to_string(),
            sentry: SentryConfig::from_lookup(env)?,
            checkout: CheckoutConfig::from_lookup(env)?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether the storefront is served over HTTPS.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl SentryConfig {
    fn from_lookup(env: &dyn Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let sample_rate = parse_or(env, "SENTRY_SAMPLE_RATE", defaults.sample_rate)?;
        let traces_sample_rate =
            parse_or(env, "SENTRY_TRACES_SAMPLE_RATE", defaults.traces_sample_rate)?;
        check_rate("SENTRY_SAMPLE_RATE", sample_rate)?;
        check_rate("SENTRY_TRACES_SAMPLE_RATE", traces_sample_rate)?;

        Ok(Self {
            dsn: env("SENTRY_DSN").filter(|v| !v.trim().is_empty()),
            environment: env("SENTRY_ENVIRONMENT").filter(|v| !v.trim().is_empty()),
            sample_rate,
            traces_sample_rate,
        })
    }
}

impl CheckoutConfig {
    fn from_lookup(env: &dyn Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let free_shipping_threshold: Money = parse_or(
            env,
            "CHECKOUT_FREE_SHIPPING_THRESHOLD",
            defaults.pricing.free_shipping_threshold,
        )?;
        let flat_shipping_fee: Money = parse_or(
            env,
            "CHECKOUT_FLAT_SHIPPING_FEE",
            defaults.pricing.flat_shipping_fee,
        )?;
        let tax_rate: Decimal = parse_or(env, "CHECKOUT_TAX_RATE", defaults.pricing.tax_rate)?;
        let idempotency_window_hours = parse_or(
            env,
            "CHECKOUT_IDEMPOTENCY_WINDOW_HOURS",
            defaults.idempotency_window_hours,
        )?;

        for (key, amount) in [
            ("CHECKOUT_FREE_SHIPPING_THRESHOLD", free_shipping_threshold),
            ("CHECKOUT_FLAT_SHIPPING_FEE", flat_shipping_fee),
        ] {
            if amount.is_negative() {
                return Err(ConfigError::InvalidEnvVar(
                    key.to_string(),
                    "must not be negative".to_string(),
                ));
            }
        }
        if tax_rate.is_sign_negative() || tax_rate >= Decimal::ONE {
            return Err(ConfigError::InvalidEnvVar(
                "CHECKOUT_TAX_RATE".to_string(),
                "must be a fraction between 0 and 1 (e.g. 0.08)".to_string(),
            ));
        }
        if idempotency_window_hours <= 0 {
            return Err(ConfigError::InvalidEnvVar(
                "CHECKOUT_IDEMPOTENCY_WINDOW_HOURS".to_string(),
                "must be positive".to_string(),
            ));
        }

        Ok(Self {
            pricing: PricingPolicy {
                free_shipping_threshold: free_shipping_threshold.round_cents(),
                flat_shipping_fee: flat_shipping_fee.round_cents(),
                tax_rate,
            },
            idempotency_window_hours,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Parse an optional variable, falling back to `default` when unset.
fn parse_or<T>(env: &dyn Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env(key) {
        Some(value) if !value.trim().is_empty() => value
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
        _ => Ok(default),
    }
}

fn check_rate(key: &str, rate: f32) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&rate) {
        Ok(())
    } else {
        Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("must be between 0.0 and 1.0 (got {rate})"),
        ))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<StorefrontConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        StorefrontConfig::from_lookup(&|key| vars.get(key).cloned())
    }

    const REQUIRED: [(&str, &str); 2] = [
        ("STOREFRONT_DATABASE_URL", "postgres://localhost/bloom"),
        ("STOREFRONT_BASE_URL", "https://shop.bloom.test/"),
    ];

    #[test]
    fn test_defaults() {
        let config = load(&REQUIRED).unwrap();
        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:3000");
        assert_eq!(config.base_url, "https://shop.bloom.test");
        assert!(config.is_secure());
        assert_eq!(config.sentry, SentryConfig::default());
        assert_eq!(config.checkout, CheckoutConfig::default());
    }

    #[test]
    fn test_database_url_fallback() {
        let config = load(&[
            ("DATABASE_URL", "postgres://fallback/bloom"),
            ("STOREFRONT_BASE_URL", "http://localhost:3000"),
        ])
        .unwrap();
        assert_eq!(config.database_url.expose_secret(), "postgres://fallback/bloom");
        assert!(!config.is_secure());
    }

    #[test]
    fn test_missing_required() {
        let err = load(&[("STOREFRONT_BASE_URL", "http://localhost")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref key) if key == "STOREFRONT_DATABASE_URL"));

        let err = load(&[("DATABASE_URL", "postgres://x")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref key) if key == "STOREFRONT_BASE_URL"));
    }

    #[test]
    fn test_checkout_overrides() {
        let mut vars = REQUIRED.to_vec();
        vars.extend([
            ("CHECKOUT_FREE_SHIPPING_THRESHOLD", "75"),
            ("CHECKOUT_FLAT_SHIPPING_FEE", "7.5"),
            ("CHECKOUT_TAX_RATE", "0.0625"),
            ("CHECKOUT_IDEMPOTENCY_WINDOW_HOURS", "2"),
        ]);
        let checkout = load(&vars).unwrap().checkout;
        assert_eq!(checkout.pricing.free_shipping_threshold, Money::from_cents(7500));
        assert_eq!(checkout.pricing.flat_shipping_fee, Money::from_cents(750));
        assert_eq!(checkout.pricing.tax_rate, Decimal::new(625, 4));
        assert_eq!(checkout.idempotency_window_hours, 2);
    }

    #[test]
    fn test_invalid_values() {
        for (key, value) in [
            ("STOREFRONT_PORT", "http"),
            ("STOREFRONT_HOST", "localhost"),
            ("SENTRY_SAMPLE_RATE", "1.5"),
            ("CHECKOUT_TAX_RATE", "8"),
            ("CHECKOUT_FLAT_SHIPPING_FEE", "-1"),
            ("CHECKOUT_IDEMPOTENCY_WINDOW_HOURS", "0"),
        ] {
            let mut vars = REQUIRED.to_vec();
            vars.push((key, value));
            let err = load(&vars).unwrap_err();
            assert!(
                matches!(err, ConfigError::InvalidEnvVar(ref k, _) if k == key),
                "{key}={value} gave {err}"
            );
        }
    }

    #[test]
    fn test_blank_sentry_dsn_is_disabled() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("SENTRY_DSN", " "));
        assert!(load(&vars).unwrap().sentry.dsn.is_none());
    }
}
