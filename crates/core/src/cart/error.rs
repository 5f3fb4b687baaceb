//! Cart error taxonomy.

use thiserror::Error;

use crate::types::ProductId;

/// Errors raised by cart operations on either store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    /// The operation needs a persistent owner but nobody is signed in.
    ///
    /// Operations on the local (anonymous) cart never raise this.
    #[error("not signed in")]
    Unauthenticated,

    /// The catalog does not know the product.
    #[error("product not found: {0}")]
    ProductNotFound(ProductId),

    /// Adding would take the line above current stock.
    #[error("insufficient stock: {available} available")]
    InsufficientStock {
        /// Units that can still be added.
        available: u32,
    },

    /// Quantity below 1 (or out of range).
    #[error("invalid quantity: {0}")]
    InvalidQuantity(i64),

    /// The owner has no persistent cart yet.
    ///
    /// The local cart treats "missing" as "empty" and never raises this.
    #[error("cart not found")]
    CartNotFound,

    /// The cart has no line for the product.
    #[error("product {0} is not in the cart")]
    LineNotFound(ProductId),

    /// A reconciliation applied some lines but not all of them.
    #[error("cart sync applied {applied} item(s), {count} failed", count = .failed.len())]
    SyncPartialFailure {
        /// Lines written.
        applied: usize,
        /// Products whose line was not written.
        failed: Vec<ProductId>,
    },

    /// The backing store could not be read or written.
    #[error("cart storage error: {0}")]
    Storage(String),
}

impl CartError {
    /// Message suitable for showing to a shopper.
    ///
    /// Stock violations carry the remaining quantity; everything else
    /// degrades to a generic notice.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::InsufficientStock { available } => {
                format!("Only {available} items left in stock")
            }
            Self::InvalidQuantity(_) => "Quantity must be at least 1".to_string(),
            Self::Unauthenticated => "Please sign in to continue".to_string(),
            Self::ProductNotFound(_) => "Product not found".to_string(),
            Self::CartNotFound => "Cart not found".to_string(),
            Self::LineNotFound(_) => "Item is not in your cart".to_string(),
            Self::SyncPartialFailure { .. } | Self::Storage(_) => {
                "Could not update cart".to_string()
            }
        }
    }

    /// Whether rerunning the same operation can succeed without user input.
    ///
    /// Validation errors are never retried automatically.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage(_) | Self::SyncPartialFailure { .. })
    }
}
