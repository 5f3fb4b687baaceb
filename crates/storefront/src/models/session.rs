//! Session-related types.
//!
//! Sign-in itself belongs to the external auth service; it writes the
//! identity below into the session and the cart API only reads it.

use serde::{Deserialize, Serialize};

use lashaz_core::AccountId;

/// Session-stored user identity.
///
/// Minimal data stored in the session to identify the signed-in account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    /// Account that owns the persistent cart.
    pub id: AccountId,
}

/// Session keys for authentication data.
pub mod keys {
    /// Key for storing the current signed-in user.
    pub const CURRENT_USER: &str = "current_user";
}
