//! In-memory repositories for tests.
//!
//! Each account's lines live behind one `DashMap` entry, so an increment holds
//! the shard lock for the whole read-modify-write, like the single upsert
//! statement does in `PostgreSQL`.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::{DashMap, DashSet};

use lashaz_core::{
    AccountId, CartId, CartLineItem, ProductId, ProductSnapshot, Quantity, check_stock,
};

use super::{CartRepository, ProductCatalog, RepositoryError};

/// Catalog held in memory.
#[derive(Default)]
pub struct MemoryCatalog {
    products: DashMap<ProductId, ProductSnapshot>,
}

impl MemoryCatalog {
    /// Add or replace a product.
    pub fn insert(&self, product: ProductSnapshot) {
        self.products.insert(product.id, product);
    }
}

#[async_trait]
impl ProductCatalog for MemoryCatalog {
    async fn find(&self, id: ProductId) -> Result<Option<ProductSnapshot>, RepositoryError> {
        Ok(self.products.get(&id).map(|p| p.value().clone()))
    }
}

/// Cart repository held in memory.
pub struct MemoryCartRepository {
    catalog: Arc<MemoryCatalog>,
    carts: DashMap<AccountId, CartId>,
    lines: DashMap<CartId, Vec<(ProductId, Quantity)>>,
    failing: DashSet<ProductId>,
}

impl MemoryCartRepository {
    /// Create a repository that decorates lines from `catalog`.
    #[must_use]
    pub fn new(catalog: Arc<MemoryCatalog>) -> Self {
        Self {
            catalog,
            carts: DashMap::new(),
            lines: DashMap::new(),
            failing: DashSet::new(),
        }
    }

    /// Make every write for `product` fail with a database-style error.
    pub fn fail_writes_for(&self, product: ProductId) {
        self.failing.insert(product);
    }

    fn check_writable(&self, product: ProductId) -> Result<(), RepositoryError> {
        if self.failing.contains(&product) {
            return Err(RepositoryError::Conflict(format!(
                "simulated write failure for {product}"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl CartRepository for MemoryCartRepository {
    async fn find_cart(&self, owner: AccountId) -> Result<Option<CartId>, RepositoryError> {
        Ok(self.carts.get(&owner).map(|id| *id))
    }

    async fn ensure_cart(&self, owner: AccountId) -> Result<CartId, RepositoryError> {
        Ok(*self.carts.entry(owner).or_insert_with(CartId::generate))
    }

    async fn lines(&self, cart: CartId) -> Result<Vec<CartLineItem>, RepositoryError> {
        let stored = self
            .lines
            .get(&cart)
            .map(|lines| lines.value().clone())
            .unwrap_or_default();

        Ok(stored
            .into_iter()
            .map(|(product_id, quantity)| {
                self.catalog.products.get(&product_id).map_or_else(
                    || CartLineItem::bare(product_id, quantity),
                    |p| CartLineItem::from_product(&p, quantity),
                )
            })
            .collect())
    }

    async fn line_quantity(
        &self,
        cart: CartId,
        product: ProductId,
    ) -> Result<u32, RepositoryError> {
        Ok(self
            .lines
            .get(&cart)
            .and_then(|lines| {
                lines
                    .iter()
                    .find(|(id, _)| *id == product)
                    .map(|(_, q)| q.get())
            })
            .unwrap_or(0))
    }

    async fn add_within_stock(
        &self,
        cart: CartId,
        product: ProductId,
        quantity: Quantity,
        stock: u32,
    ) -> Result<Option<Quantity>, RepositoryError> {
        self.check_writable(product)?;
        let mut lines = self.lines.entry(cart).or_default();
        let existing = lines
            .iter()
            .find(|(id, _)| *id == product)
            .map_or(0, |(_, q)| q.get());

        let Ok(total) = check_stock(stock, existing, quantity) else {
            return Ok(None);
        };

        if let Some(line) = lines.iter_mut().find(|(id, _)| *id == product) {
            line.1 = total;
        } else {
            lines.push((product, total));
        }
        Ok(Some(total))
    }

    async fn set_quantity(
        &self,
        cart: CartId,
        product: ProductId,
        quantity: Quantity,
    ) -> Result<bool, RepositoryError> {
        self.check_writable(product)?;
        let Some(mut lines) = self.lines.get_mut(&cart) else {
            return Ok(false);
        };
        match lines.iter_mut().find(|(id, _)| *id == product) {
            Some(line) => {
                line.1 = quantity;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn set_absolute(
        &self,
        cart: CartId,
        product: ProductId,
        quantity: Quantity,
    ) -> Result<(), RepositoryError> {
        self.check_writable(product)?;
        let mut lines = self.lines.entry(cart).or_default();
        if let Some(line) = lines.iter_mut().find(|(id, _)| *id == product) {
            line.1 = quantity;
        } else {
            lines.push((product, quantity));
        }
        Ok(())
    }

    async fn remove_line(
        &self,
        cart: CartId,
        product: ProductId,
    ) -> Result<bool, RepositoryError> {
        let Some(mut lines) = self.lines.get_mut(&cart) else {
            return Ok(false);
        };
        let before = lines.len();
        lines.retain(|(id, _)| *id != product);
        Ok(lines.len() < before)
    }
}
