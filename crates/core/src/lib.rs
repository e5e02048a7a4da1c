//! Bloom Core - Shared domain types library.
//!
//! This crate provides the types used across all Bloom components:
//! - `storefront` - Public storefront: cart, checkout and order confirmation
//! - `cli` - Command-line tools for migrations, catalog seeding and order admin
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients. Cart pricing lives here so that the checkout summary
//! and the order commit derive their totals from the same code.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, money, order numbers and statuses
//! - [`pricing`] - Cart totals (subtotal, shipping, tax, total)

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod pricing;
pub mod types;

pub use pricing::{CartTotals, PricedLine, PricingPolicy};
pub use types::*;
