//! Integration tests for Lashaz.
//!
//! # Running Tests
//!
//! ```bash
//! # Start the database and apply migrations
//! cargo run -p lashaz-cli -- migrate
//!
//! # Start the storefront, then run the ignored tests
//! cargo run -p lashaz-storefront &
//! cargo test -p lashaz-integration-tests -- --ignored
//! ```
//!
//! # Test Categories
//!
//! - `storefront_api` - Black-box HTTP tests against a running storefront
//! - `cart_postgres` - Cart service against a real database
//!
//! # Environment Variables
//!
//! - `STOREFRONT_BASE_URL` - Running storefront (default `http://localhost:3000`)
//! - `STOREFRONT_DATABASE_URL` - Migrated test database (falls back to `DATABASE_URL`)

use lashaz_core::ProductId;
use rust_decimal::Decimal;
use secrecy::SecretString;
use sqlx::PgPool;

/// Base URL of the storefront under test.
#[must_use]
pub fn storefront_base_url() -> String {
    std::env::var("STOREFRONT_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

/// Connect to the migrated test database.
///
/// # Errors
///
/// Returns an error if no database URL is set or the connection fails.
pub async fn connect_database() -> Result<PgPool, sqlx::Error> {
    let url = std::env::var("STOREFRONT_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map_err(|_| sqlx::Error::Configuration("STOREFRONT_DATABASE_URL is not set".into()))?;
    lashaz_storefront::db::create_pool(&SecretString::from(url)).await
}

/// Insert a catalog product for a test.
///
/// # Errors
///
/// Returns an error if the insert fails.
pub async fn insert_product(
    pool: &PgPool,
    name: &str,
    price_cents: i64,
    stock: i32,
) -> Result<ProductId, sqlx::Error> {
    sqlx::query_scalar(
        r"
        INSERT INTO storefront.product (name, price, stock)
        VALUES ($1, $2, $3)
        RETURNING id
        ",
    )
    .bind(name)
    .bind(Decimal::new(price_cents, 2))
    .bind(stock)
    .fetch_one(pool)
    .await
}
