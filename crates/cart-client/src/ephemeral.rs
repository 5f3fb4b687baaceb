//! The anonymous cart, applied to local storage.
//!
//! Each mutation is load, apply the `Cart` rules, save. The write lock keeps
//! that sequence whole when several tasks share one store.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use lashaz_core::{Cart, CartError, CartLineItem, CartOwner, ProductId, ProductSnapshot, Quantity};

use crate::storage::LocalCartStorage;
use crate::traits::StockOracle;

/// Anonymous cart backed by [`LocalCartStorage`].
pub struct EphemeralCart {
    storage: Arc<dyn LocalCartStorage>,
    oracle: Arc<dyn StockOracle>,
    write_lock: Mutex<()>,
}

impl EphemeralCart {
    /// Create an anonymous cart over `storage`, validating against `oracle`.
    #[must_use]
    pub fn new(storage: Arc<dyn LocalCartStorage>, oracle: Arc<dyn StockOracle>) -> Self {
        Self {
            storage,
            oracle,
            write_lock: Mutex::new(()),
        }
    }

    /// The stored cart. Missing storage is an empty cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Storage` if the store cannot be read.
    pub fn load(&self) -> Result<Cart, CartError> {
        let items = self.storage.load()?;
        Ok(Cart::from_items(CartOwner::Anonymous, items))
    }

    /// Whether nothing is stored.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Storage` if the store cannot be read.
    pub fn is_empty(&self) -> Result<bool, CartError> {
        Ok(self.load()?.is_empty())
    }

    /// Add units of a product.
    ///
    /// # Errors
    ///
    /// - `ProductNotFound` if the catalog does not know the product
    /// - `InsufficientStock` with the units still addable
    /// - `Storage` if the store cannot be read or written
    pub async fn add(
        &self,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<CartLineItem, CartError> {
        let product = self.product(product_id).await?;
        self.mutate(|cart| cart.add(&product, quantity))
    }

    /// Overwrite a line's quantity, refusing more than current stock.
    ///
    /// # Errors
    ///
    /// - `ProductNotFound` if the catalog does not know the product
    /// - `InsufficientStock` (with current stock) if `quantity > stock`
    /// - `LineNotFound` if the product is not in the cart
    /// - `Storage` if the store cannot be read or written
    pub async fn set_quantity(
        &self,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<CartLineItem, CartError> {
        let product = self.product(product_id).await?;
        self.mutate(|cart| cart.set_quantity(product_id, quantity, Some(product.stock)))
    }

    /// Remove a line. Returns the removed line, `None` if it was absent.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Storage` if the store cannot be read or written.
    pub fn remove(&self, product_id: ProductId) -> Result<Option<CartLineItem>, CartError> {
        self.mutate(|cart| Ok(cart.remove(product_id)))
    }

    /// Discard the anonymous cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Storage` if the store cannot be cleared.
    pub fn clear(&self) -> Result<(), CartError> {
        let _guard = self.lock();
        self.storage.clear()?;
        tracing::debug!("Local cart cleared");
        Ok(())
    }

    async fn product(&self, product_id: ProductId) -> Result<ProductSnapshot, CartError> {
        self.oracle
            .product(product_id)
            .await?
            .ok_or(CartError::ProductNotFound(product_id))
    }

    /// Load, apply `f`, and save only if `f` succeeded.
    fn mutate<T>(
        &self,
        f: impl FnOnce(&mut Cart) -> Result<T, CartError>,
    ) -> Result<T, CartError> {
        let _guard = self.lock();
        let mut cart = self.load()?;
        let out = f(&mut cart)?;
        self.storage.save(cart.items())?;
        Ok(out)
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
