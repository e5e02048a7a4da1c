//! Saved address model.
//!
//! Orders reference addresses without owning them, so an address can be
//! edited or deleted after an order was placed. The confirmation page copes
//! with a missing address instead of failing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bloom_core::{AddressId, AddressType, UserId};

/// A shopper's saved address.
///
/// At most one address per owner has `is_default` set; the database enforces
/// this with a partial unique index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Address {
    pub id: AddressId,
    pub user_id: UserId,
    pub address_type: AddressType,
    pub label: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}

/// Address form data for create and update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressInput {
    #[serde(default)]
    pub address_type: AddressType,
    pub label: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    #[serde(default)]
    pub is_default: bool,
}

impl AddressInput {
    /// Maximum length of any single field.
    pub const MAX_FIELD_LENGTH: usize = 200;

    /// Validate required fields.
    ///
    /// # Errors
    ///
    /// Returns a human-readable message for every invalid field.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let fields = [
            ("label", &self.label),
            ("street", &self.street),
            ("city", &self.city),
            ("state", &self.state),
            ("postal_code", &self.postal_code),
            ("country", &self.country),
        ];

        let errors: Vec<String> = fields
            .iter()
            .filter_map(|(name, value)| {
                let value = value.trim();
                if value.is_empty() {
                    Some(format!("{name} is required"))
                } else if value.len() > Self::MAX_FIELD_LENGTH {
                    Some(format!(
                        "{name} must be at most {} characters",
                        Self::MAX_FIELD_LENGTH
                    ))
                } else {
                    None
                }
            })
            .collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Single-line rendering used in order summaries.
    #[must_use]
    pub fn one_line(&self) -> String {
        format!(
            "{}, {}, {} {}, {}",
            self.street, self.city, self.state, self.postal_code, self.country
        )
    }
}

impl From<&Address> for AddressInput {
    fn from(address: &Address) -> Self {
        Self {
            address_type: address.address_type,
            label: address.label.clone(),
            street: address.street.clone(),
            city: address.city.clone(),
            state: address.state.clone(),
            postal_code: address.postal_code.clone(),
            country: address.country.clone(),
            is_default: address.is_default,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn input() -> AddressInput {
        AddressInput {
            address_type: AddressType::Office,
            label: "Studio".to_owned(),
            street: "12 Rose Lane".to_owned(),
            city: "Portland".to_owned(),
            state: "OR".to_owned(),
            postal_code: "97201".to_owned(),
            country: "US".to_owned(),
            is_default: false,
        }
    }

    #[test]
    fn test_validate_ok() {
        assert!(input().validate().is_ok());
    }

    #[test]
    fn test_validate_reports_every_blank_field() {
        let mut address = input();
        address.city = "  ".to_owned();
        address.country = String::new();
        let errors = address.validate().unwrap_err();
        assert_eq!(errors, vec!["city is required", "country is required"]);
    }

    #[test]
    fn test_validate_rejects_long_fields() {
        let mut address = input();
        address.street = "x".repeat(201);
        assert_eq!(address.validate().unwrap_err().len(), 1);
    }

    #[test]
    fn test_one_line() {
        assert_eq!(input().one_line(), "12 Rose Lane, Portland, OR 97201, US");
    }

    #[test]
    fn test_deserialize_defaults() {
        let json = r#"{"label":"Home","street":"1 A St","city":"B","state":"C","postal_code":"1","country":"US"}"#;
        let parsed: AddressInput = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.address_type, AddressType::Home);
        assert!(!parsed.is_default);
    }
}
