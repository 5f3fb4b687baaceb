//! Business logic services for storefront.
//!
//! # Services
//!
//! - `cart` - Persistent cart rules (stock validation, atomic writes, merge)

pub mod cart;

pub use cart::CartService;
