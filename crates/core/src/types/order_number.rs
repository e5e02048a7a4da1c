//! Human-facing order numbers and checkout idempotency keys.

use core::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing an [`OrderNumber`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum OrderNumberError {
    /// The value does not start with `ORD-`.
    #[error("order number must start with {prefix}")]
    MissingPrefix {
        /// Expected prefix.
        prefix: &'static str,
    },
    /// The timestamp segment is not a number.
    #[error("order number timestamp is not numeric")]
    InvalidTimestamp,
    /// The disambiguator segment is missing or out of range.
    #[error("order number suffix must be between 0 and {max}")]
    InvalidSuffix {
        /// Largest allowed suffix.
        max: u16,
    },
}

/// Human-facing order identifier, distinct from the internal [`OrderId`](crate::OrderId).
///
/// Format: `ORD-<unix-millis>-<0..999>`. Uniqueness is only probabilistic from
/// the generator; the store enforces it with a unique index and the checkout
/// regenerates on conflict.
///
/// ```
/// use bloom_core::OrderNumber;
///
/// let number = OrderNumber::parse("ORD-1718000000000-42").unwrap();
/// assert_eq!(number.suffix(), 42);
/// assert!(OrderNumber::parse("ORD-1718000000000-1000").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(feature = "postgres", sqlx(transparent))]
#[serde(transparent)]
pub struct OrderNumber(String);

impl OrderNumber {
    /// Prefix shared by all order numbers.
    pub const PREFIX: &'static str = "ORD-";

    /// Largest random disambiguator.
    pub const MAX_SUFFIX: u16 = 999;

    /// Build an order number from a timestamp and a disambiguator.
    ///
    /// The disambiguator is reduced modulo 1000.
    #[must_use]
    pub fn generate(at: DateTime<Utc>, disambiguator: u16) -> Self {
        let suffix = disambiguator % (Self::MAX_SUFFIX + 1);
        Self(format!(
            "{}{}-{}",
            Self::PREFIX,
            at.timestamp_millis(),
            suffix
        ))
    }

    /// Parse and validate an order number.
    ///
    /// # Errors
    ///
    /// Returns an error if the prefix, timestamp or suffix is malformed.
    pub fn parse(s: &str) -> Result<Self, OrderNumberError> {
        let rest = s
            .strip_prefix(Self::PREFIX)
            .ok_or(OrderNumberError::MissingPrefix {
                prefix: Self::PREFIX,
            })?;
        let (timestamp, suffix) = rest
            .rsplit_once('-')
            .ok_or(OrderNumberError::InvalidSuffix {
                max: Self::MAX_SUFFIX,
            })?;
        timestamp
            .parse::<i64>()
            .map_err(|_| OrderNumberError::InvalidTimestamp)?;
        match suffix.parse::<u16>() {
            Ok(n) if n <= Self::MAX_SUFFIX => Ok(Self(s.to_owned())),
            _ => Err(OrderNumberError::InvalidSuffix {
                max: Self::MAX_SUFFIX,
            }),
        }
    }

    /// The order number as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The random disambiguator (`0..=999`).
    #[must_use]
    pub fn suffix(&self) -> u16 {
        self.0
            .rsplit_once('-')
            .and_then(|(_, n)| n.parse().ok())
            .unwrap_or_default()
    }
}

impl fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for OrderNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Errors that can occur when parsing an [`IdempotencyKey`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum IdempotencyKeyError {
    /// The key is empty.
    #[error("idempotency key cannot be empty")]
    Empty,
    /// The key is too long.
    #[error("idempotency key must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The key contains a character outside `[A-Za-z0-9_-]`.
    #[error("idempotency key may only contain letters, digits, '-' and '_'")]
    InvalidCharacter,
}

/// Client-generated token identifying one logical checkout submission.
///
/// A second checkout by the same owner with the same key inside the replay
/// window returns the first order instead of creating another.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(feature = "postgres", sqlx(transparent))]
#[serde(try_from = "String", into = "String")]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    /// Maximum key length.
    pub const MAX_LENGTH: usize = 64;

    /// Parse an idempotency key.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is empty, longer than 64 characters, or
    /// contains characters other than ASCII letters, digits, `-` and `_`.
    pub fn parse(s: &str) -> Result<Self, IdempotencyKeyError> {
        if s.is_empty() {
            return Err(IdempotencyKeyError::Empty);
        }
        if s.len() > Self::MAX_LENGTH {
            return Err(IdempotencyKeyError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        if !s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(IdempotencyKeyError::InvalidCharacter);
        }
        Ok(Self(s.to_owned()))
    }

    /// The key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for IdempotencyKey {
    type Error = IdempotencyKeyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<IdempotencyKey> for String {
    fn from(key: IdempotencyKey) -> Self {
        key.0
    }
}

impl fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_generate_format() {
        let at = Utc.timestamp_millis_opt(1_718_000_000_123).unwrap();
        let number = OrderNumber::generate(at, 7);
        assert_eq!(number.as_str(), "ORD-1718000000123-7");
        assert_eq!(number.suffix(), 7);
    }

    #[test]
    fn test_generate_wraps_suffix() {
        let at = Utc.timestamp_millis_opt(1).unwrap();
        assert_eq!(OrderNumber::generate(at, 1000).suffix(), 0);
        assert_eq!(OrderNumber::generate(at, 1999).suffix(), 999);
    }

    #[test]
    fn test_generated_numbers_parse() {
        let at = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        let number = OrderNumber::generate(at, 512);
        assert_eq!(OrderNumber::parse(number.as_str()).unwrap(), number);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(matches!(
            OrderNumber::parse("INV-1-1"),
            Err(OrderNumberError::MissingPrefix { .. })
        ));
        assert_eq!(
            OrderNumber::parse("ORD-abc-1"),
            Err(OrderNumberError::InvalidTimestamp)
        );
        assert!(matches!(
            OrderNumber::parse("ORD-123"),
            Err(OrderNumberError::InvalidSuffix { .. })
        ));
    }

    #[test]
    fn test_idempotency_key_validation() {
        assert!(IdempotencyKey::parse("checkout-2f9c_01").is_ok());
        assert_eq!(IdempotencyKey::parse(""), Err(IdempotencyKeyError::Empty));
        assert_eq!(
            IdempotencyKey::parse(&"k".repeat(65)),
            Err(IdempotencyKeyError::TooLong { max: 64 })
        );
        assert_eq!(
            IdempotencyKey::parse("has space"),
            Err(IdempotencyKeyError::InvalidCharacter)
        );
    }

    #[test]
    fn test_idempotency_key_deserialize_validates() {
        let ok: IdempotencyKey = serde_json::from_str("\"abc-123\"").unwrap();
        assert_eq!(ok.as_str(), "abc-123");
        assert!(serde_json::from_str::<IdempotencyKey>("\"bad key!\"").is_err());
    }
}
