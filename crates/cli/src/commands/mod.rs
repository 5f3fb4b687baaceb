//! CLI subcommands.

pub mod cart;
pub mod migrate;
pub mod product;

use secrecy::SecretString;
use sqlx::PgPool;
use thiserror::Error;

/// Errors shared by every command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection or query error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration failed.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Session store setup failed.
    #[error("Session store error: {0}")]
    SessionStore(String),

    /// Repository operation failed.
    #[error("Repository error: {0}")]
    Repository(#[from] lashaz_storefront::db::RepositoryError),

    /// Argument out of range.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// No such row.
    #[error("Not found: {0}")]
    NotFound(String),
}

/// Connect to the storefront database.
///
/// Reads `STOREFRONT_DATABASE_URL`, falling back to `DATABASE_URL`.
pub async fn connect() -> Result<PgPool, CommandError> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("STOREFRONT_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map_err(|_| CommandError::MissingEnvVar("STOREFRONT_DATABASE_URL"))?;

    tracing::info!("Connecting to storefront database...");
    let pool = lashaz_storefront::db::create_pool(&SecretString::from(database_url)).await?;
    Ok(pool)
}
