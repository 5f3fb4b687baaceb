//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `LASHAZ_STOREFRONT_URL` - Base URL of the storefront API
//!
//! ## Optional
//! - `LASHAZ_CART_FILE` - Local cart file (default: `lashaz_cart.json`)
//! - `LASHAZ_CATALOG_CACHE_TTL_SECS` - Product display cache TTL (default: 60)

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

/// Default local cart file name.
pub const DEFAULT_CART_FILE: &str = "lashaz_cart.json";

/// Default product display cache TTL in seconds.
const DEFAULT_CACHE_TTL_SECS: u64 = 60;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Cart client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Storefront base URL, always ending in `/`
    pub storefront_url: Url,
    /// Where the anonymous cart is kept
    pub cart_file: PathBuf,
    /// How long product display data stays cached
    pub catalog_cache_ttl: Duration,
}

impl ClientConfig {
    /// Build a configuration with defaults for everything but the URL.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if the URL does not parse.
    pub fn new(storefront_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            storefront_url: parse_base_url(storefront_url)?,
            cart_file: PathBuf::from(DEFAULT_CART_FILE),
            catalog_cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
        })
    }

    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let url = std::env::var("LASHAZ_STOREFRONT_URL")
            .map_err(|_| ConfigError::MissingEnvVar("LASHAZ_STOREFRONT_URL".to_string()))?;
        let mut config = Self::new(&url)?;

        if let Ok(path) = std::env::var("LASHAZ_CART_FILE") {
            config.cart_file = PathBuf::from(path);
        }
        if let Ok(ttl) = std::env::var("LASHAZ_CATALOG_CACHE_TTL_SECS") {
            config.catalog_cache_ttl = parse_ttl(&ttl)?;
        }

        Ok(config)
    }
}

/// Parse the base URL and make sure relative joins keep its path.
fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let invalid =
        |msg: String| ConfigError::InvalidEnvVar("LASHAZ_STOREFRONT_URL".to_string(), msg);

    let mut url = Url::parse(raw.trim()).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

fn parse_ttl(raw: &str) -> Result<Duration, ConfigError> {
    raw.trim()
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|e| {
            ConfigError::InvalidEnvVar("LASHAZ_CATALOG_CACHE_TTL_SECS".to_string(), e.to_string())
        })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::new("http://localhost:3000").unwrap();
        assert_eq!(config.storefront_url.as_str(), "http://localhost:3000/");
        assert_eq!(config.cart_file, PathBuf::from("lashaz_cart.json"));
        assert_eq!(config.catalog_cache_ttl, Duration::from_secs(60));
    }

    #[test]
    fn test_base_path_kept_for_joins() {
        let config = ClientConfig::new("https://lashaz.com/shop").unwrap();
        let joined = config.storefront_url.join("api/cart/get").unwrap();
        assert_eq!(joined.as_str(), "https://lashaz.com/shop/api/cart/get");
    }

    #[test]
    fn test_rejects_bad_urls() {
        assert!(ClientConfig::new("localhost:3000").is_err());
        assert!(ClientConfig::new("ftp://lashaz.com").is_err());
    }

    #[test]
    fn test_ttl_parsing() {
        assert_eq!(parse_ttl(" 5 ").unwrap(), Duration::from_secs(5));
        assert!(parse_ttl("soon").is_err());
    }
}
