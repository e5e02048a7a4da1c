//! Domain models for the storefront.
//!
//! - [`cart`] - Cart lines with the product price snapshot taken at load time
//! - [`address`] - Saved shipping addresses
//! - [`order`] - Orders, order items and the records written at checkout
//! - [`product`] - Catalog products (read-only here, seeded by the CLI)
//! - [`session`] - Identity stored in the session

pub mod address;
pub mod cart;
pub mod order;
pub mod product;
pub mod session;

pub use address::{Address, AddressInput};
pub use cart::{CartLine, MAX_LINE_QUANTITY};
pub use order::{NewOrder, NewOrderItem, Order, OrderItemDetail};
pub use product::{NewProduct, Product};
pub use session::{CurrentUser, keys as session_keys};
