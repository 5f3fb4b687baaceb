//! Domain models for storefront.

pub mod session;

pub use session::{CurrentUser, keys as session_keys};
