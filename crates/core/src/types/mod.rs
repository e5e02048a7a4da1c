//! Core types for Bloom.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod money;
pub mod order_number;
pub mod status;

pub use id::*;
pub use money::Money;
pub use order_number::{IdempotencyKey, IdempotencyKeyError, OrderNumber, OrderNumberError};
pub use status::*;
