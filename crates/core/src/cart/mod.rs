//! Cart domain: owners, line items, quantities and the mutation rules.
//!
//! Both the client-local cart and the server-owned cart apply the rules on
//! [`Cart`]. The stores differ only in where the result is written.

pub mod error;
pub mod model;
pub mod quantity;
pub mod sync;

pub use error::CartError;
pub use model::{Cart, CartLineItem, CartOwner, check_stock};
pub use quantity::Quantity;
pub use sync::{LineQuantity, SyncReport};
