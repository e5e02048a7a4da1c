//! Checkout error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur while committing a checkout.
///
/// A failure to clear the cart after a successful commit is not an error;
/// it is reported through `CheckoutOutcome::cart_cleared`.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// No signed-in shopper.
    #[error("please sign in to check out")]
    Unauthenticated,

    /// No shipping address was selected.
    #[error("please select a shipping address")]
    MissingAddress,

    /// The cart has no lines.
    #[error("your cart is empty")]
    EmptyCart,

    /// The selected address does not exist or belongs to someone else.
    #[error("the selected shipping address is not available")]
    InvalidAddress,

    /// The order row could not be written. Nothing was persisted.
    #[error("failed to create order: {0}")]
    OrderCreateFailed(#[source] RepositoryError),

    /// The order items could not be written. The order was rolled back and
    /// the cart is untouched.
    #[error("failed to create order items: {0}")]
    OrderItemsFailed(#[source] RepositoryError),

    /// A read needed before committing failed.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl CheckoutError {
    /// Whether the shopper can fix this by changing their input.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Unauthenticated | Self::MissingAddress | Self::EmptyCart | Self::InvalidAddress
        )
    }
}
