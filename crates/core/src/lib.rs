//! Lashaz Core - Shared cart domain types.
//!
//! This crate provides the types shared by every Lashaz component:
//! - `storefront` - HTTP server owning the persistent cart store
//! - `cart-client` - Client-side cart state, local storage and reconciliation
//! - `cli` - Command-line tools for migrations and support
//!
//! # Architecture
//!
//! The core crate contains only types and pure rules - no I/O, no database
//! access, no HTTP clients. Both cart stores apply the same [`Cart`] rules, so
//! the invariants (one line per product, quantity at least one, no overselling)
//! are enforced in exactly one place.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, prices and catalog snapshots
//! - [`cart`] - Cart model, quantities, sync payloads and the error taxonomy

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod types;

pub use cart::*;
pub use types::*;
