//! Session-related types.
//!
//! Logging in is handled outside this crate; whatever authenticates the
//! shopper stores a [`CurrentUser`] under [`keys::CURRENT_USER`].

use serde::{Deserialize, Serialize};

use bloom_core::UserId;

/// Session-stored user identity.
///
/// Minimal data stored in the session to identify the logged-in user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    /// User's database ID.
    pub id: UserId,
    /// Name shown in greetings, if the profile has one.
    pub display_name: Option<String>,
}

/// Session keys for authentication data.
pub mod keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";
}
