//! Client-side transport and storage errors.
//!
//! Adapters raise [`ClientError`]; the cart layers only ever see
//! [`CartError`], converted here at the store boundary.

use lashaz_core::{CartError, ProductId};
use thiserror::Error;

/// Errors from talking to the storefront or the local cart file.
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed before a response arrived.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The storefront answered with a non-success status.
    #[error("storefront returned {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// The `error` field of the response body, or the raw body.
        message: String,
    },

    /// Local cart file could not be read or written.
    #[error("local storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// JSON encoding or decoding failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An endpoint URL could not be built from the base URL.
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

/// What a request was about, used to pick the right [`CartError`] for a status.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestContext {
    /// Product the request targeted.
    pub product_id: Option<ProductId>,
    /// Quantity the request carried.
    pub quantity: Option<i64>,
}

impl RequestContext {
    /// Context for a request about one product.
    #[must_use]
    pub const fn product(product_id: ProductId) -> Self {
        Self {
            product_id: Some(product_id),
            quantity: None,
        }
    }

    /// Context for a request carrying a product and quantity.
    #[must_use]
    pub const fn line(product_id: ProductId, quantity: i64) -> Self {
        Self {
            product_id: Some(product_id),
            quantity: Some(quantity),
        }
    }
}

impl ClientError {
    /// Convert into the cart taxonomy.
    ///
    /// Status mapping: 401 is `Unauthenticated`; 404 is `CartNotFound`,
    /// `LineNotFound` or `ProductNotFound` depending on the message; 400 is
    /// `InsufficientStock` when the message carries a count, otherwise
    /// `InvalidQuantity`. Everything else is a storage failure.
    #[must_use]
    pub fn into_cart_error(self, context: RequestContext) -> CartError {
        match self {
            Self::Status { status: 401, .. } => CartError::Unauthenticated,
            Self::Status {
                status: 404,
                message,
            } => match context.product_id {
                Some(id) if message == CartError::LineNotFound(id).user_message() => {
                    CartError::LineNotFound(id)
                }
                Some(id) if message != CartError::CartNotFound.user_message() => {
                    CartError::ProductNotFound(id)
                }
                _ => CartError::CartNotFound,
            },
            Self::Status {
                status: 400,
                message,
            } => parse_available(&message).map_or_else(
                || CartError::InvalidQuantity(context.quantity.unwrap_or(0)),
                |available| CartError::InsufficientStock { available },
            ),
            other => CartError::Storage(other.to_string()),
        }
    }
}

impl From<ClientError> for CartError {
    fn from(err: ClientError) -> Self {
        err.into_cart_error(RequestContext::default())
    }
}

/// Pull the count out of "Only {n} items left in stock".
fn parse_available(message: &str) -> Option<u32> {
    message
        .strip_prefix("Only ")?
        .strip_suffix(" items left in stock")?
        .parse()
        .ok()
}
