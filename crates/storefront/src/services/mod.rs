//! Business logic services for the storefront.
//!
//! # Services
//!
//! - [`checkout`] - Commits a cart as an order
//! - [`confirmation`] - Reads an order back for its owner
//! - [`order_admin`] - Operator status changes
//! - [`events`] - Cart change notifications

pub mod checkout;
pub mod confirmation;
pub mod events;
pub mod order_admin;

pub use checkout::{
    CheckoutError, CheckoutOutcome, CheckoutRequest, CheckoutService, CheckoutStore,
    OrderNumberSource, PlaceOrderError, TimestampOrderNumbers,
};
pub use confirmation::{ConfirmationError, ConfirmationReader, OrderConfirmation, ShippingAddress};
pub use events::{CartEvent, CartEventHub, OwnerSubscription};
pub use order_admin::{OrderAdminError, OrderAdminService, OrderAdminStore};
