//! Database operations for storefront `PostgreSQL`.
//!
//! # Database: `lashaz_storefront`
//!
//! ## Tables
//!
//! - `storefront.product` - Catalog (read-only here; owned by the back office)
//! - `storefront.cart` - One persistent cart per account
//! - `storefront.cart_item` - Lines, unique per `(cart_id, product_id)`
//! - `tower_sessions.session` - Tower-sessions storage
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p lashaz-cli -- migrate
//! ```
//!
//! # Seams
//!
//! Route handlers never touch the pool directly. They go through the
//! [`CartRepository`] and [`ProductCatalog`] traits so the cart rules can be
//! exercised against in-memory stores in tests.

pub mod carts;
#[cfg(test)]
pub mod memory;
pub mod products;

use std::time::Duration;

use async_trait::async_trait;
use lashaz_core::{AccountId, CartId, CartLineItem, ProductId, ProductSnapshot, Quantity};
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use carts::PgCartRepository;
pub use products::PgProductCatalog;

/// Errors from repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., quantity out of range for the column).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Persistent cart storage keyed by account.
///
/// Every write is a single statement keyed by `(cart, product)`, so two tabs
/// mutating the same line never lose an update.
#[async_trait]
pub trait CartRepository: Send + Sync {
    /// Find the account's cart.
    async fn find_cart(&self, owner: AccountId) -> Result<Option<CartId>, RepositoryError>;

    /// Find or create the account's cart.
    async fn ensure_cart(&self, owner: AccountId) -> Result<CartId, RepositoryError>;

    /// Lines of a cart decorated with catalog display data, in insertion order.
    async fn lines(&self, cart: CartId) -> Result<Vec<CartLineItem>, RepositoryError>;

    /// Current quantity of a line, zero when absent.
    async fn line_quantity(
        &self,
        cart: CartId,
        product: ProductId,
    ) -> Result<u32, RepositoryError>;

    /// Atomically increment (or create) a line if the new total fits in `stock`.
    ///
    /// Returns the new total, or `None` when the total would exceed `stock`
    /// and nothing was written.
    async fn add_within_stock(
        &self,
        cart: CartId,
        product: ProductId,
        quantity: Quantity,
        stock: u32,
    ) -> Result<Option<Quantity>, RepositoryError>;

    /// Overwrite an existing line's quantity. Returns `false` if there is no line.
    async fn set_quantity(
        &self,
        cart: CartId,
        product: ProductId,
        quantity: Quantity,
    ) -> Result<bool, RepositoryError>;

    /// Upsert a line with absolute-set semantics.
    async fn set_absolute(
        &self,
        cart: CartId,
        product: ProductId,
        quantity: Quantity,
    ) -> Result<(), RepositoryError>;

    /// Delete a line. Returns `false` if there was none.
    async fn remove_line(
        &self,
        cart: CartId,
        product: ProductId,
    ) -> Result<bool, RepositoryError>;
}

/// Read access to the catalog (the stock oracle).
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    /// Look up a product.
    async fn find(&self, id: ProductId) -> Result<Option<ProductSnapshot>, RepositoryError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Convert a quantity for an `INTEGER` column.
fn quantity_to_db(quantity: Quantity) -> Result<i32, RepositoryError> {
    i32::try_from(quantity.get())
        .map_err(|_| RepositoryError::Conflict(format!("quantity {quantity} out of range")))
}

/// Read a quantity from an `INTEGER` column.
fn quantity_from_db(value: i32) -> Result<Quantity, RepositoryError> {
    Quantity::try_from(value)
        .map_err(|e| RepositoryError::DataCorruption(format!("invalid cart_item quantity: {e}")))
}
