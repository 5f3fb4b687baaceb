//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::StorefrontConfig;
use crate::db::{CartRepository, PgCartRepository, PgProductCatalog, ProductCatalog};
use crate::services::CartService;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like the cart service and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    catalog: Arc<dyn ProductCatalog>,
    cart: CartService,
}

impl AppState {
    /// Create application state backed by `PostgreSQL`.
    ///
    /// # Arguments
    ///
    /// * `config` - Storefront configuration
    /// * `pool` - `PostgreSQL` connection pool
    #[must_use]
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Self {
        Self::from_parts(
            config,
            Arc::new(PgCartRepository::new(pool.clone())),
            Arc::new(PgProductCatalog::new(pool)),
        )
    }

    /// Create application state from explicit stores.
    #[must_use]
    pub fn from_parts(
        config: StorefrontConfig,
        carts: Arc<dyn CartRepository>,
        catalog: Arc<dyn ProductCatalog>,
    ) -> Self {
        let cart = CartService::new(carts, Arc::clone(&catalog));
        Self {
            inner: Arc::new(AppStateInner {
                config,
                catalog,
                cart,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get the persistent cart service.
    #[must_use]
    pub fn cart(&self) -> &CartService {
        &self.inner.cart
    }

    /// Get the product catalog.
    #[must_use]
    pub fn catalog(&self) -> &dyn ProductCatalog {
        self.inner.catalog.as_ref()
    }
}
