//! Seams between the cart logic and the outside world.

use async_trait::async_trait;
use lashaz_core::{
    CartError, CartLineItem, LineQuantity, Price, ProductId, ProductSnapshot, Quantity, SyncReport,
};

/// Product fields shown on a cart line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductDisplay {
    /// Product name.
    pub name: String,
    /// Unit price.
    pub price: Price,
    /// Primary image URL.
    pub image_url: Option<String>,
}

impl From<&ProductSnapshot> for ProductDisplay {
    fn from(product: &ProductSnapshot) -> Self {
        Self {
            name: product.name.clone(),
            price: product.price,
            image_url: product.image_url.clone(),
        }
    }
}

impl ProductDisplay {
    /// A display-complete line for `product_id`.
    #[must_use]
    pub fn line(&self, product_id: ProductId, quantity: Quantity) -> CartLineItem {
        CartLineItem {
            product_id,
            quantity,
            unit_price_snapshot: Some(self.price),
            display_name: self.name.clone(),
            image_ref: self.image_url.clone(),
        }
    }
}

/// Current stock and product data.
#[async_trait]
pub trait StockOracle: Send + Sync {
    /// Fresh product data. `None` when the catalog does not know the product.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the catalog cannot be reached.
    async fn product(&self, id: ProductId) -> Result<Option<ProductSnapshot>, CartError>;

    /// Display data already known locally, without any I/O.
    async fn cached_display(&self, _id: ProductId) -> Option<ProductDisplay> {
        None
    }
}

/// The signed-in account's server-side cart.
///
/// Identity travels with the transport (the session cookie); every call
/// fails with `Unauthenticated` when there is none.
#[async_trait]
pub trait PersistentCartApi: Send + Sync {
    /// All lines. An account without a cart has an empty one.
    async fn load(&self) -> Result<Vec<CartLineItem>, CartError>;

    /// Increment a line; returns the line with its new total.
    async fn add(&self, product_id: ProductId, quantity: Quantity)
    -> Result<CartLineItem, CartError>;

    /// Overwrite a line's quantity.
    async fn set_quantity(
        &self,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<CartLineItem, CartError>;

    /// Remove a line; absent lines are not an error.
    async fn remove(&self, product_id: ProductId) -> Result<(), CartError>;

    /// Absolute-set every line, best effort.
    async fn sync(&self, items: &[LineQuantity]) -> Result<SyncReport, CartError>;
}
