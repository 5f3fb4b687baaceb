//! Persistent cart operations.
//!
//! Every mutation validates against the catalog first and then delegates to a
//! single repository write. Stock is read fresh on each call; nothing here
//! caches product data.

use std::sync::Arc;

use tracing::instrument;

use lashaz_core::{AccountId, CartError, CartId, CartLineItem, ProductId, Quantity, SyncReport};

use crate::db::{CartRepository, ProductCatalog, RepositoryError};
use crate::error::{AppError, add_breadcrumb};

/// Cart operations for signed-in accounts.
#[derive(Clone)]
pub struct CartService {
    carts: Arc<dyn CartRepository>,
    catalog: Arc<dyn ProductCatalog>,
}

impl CartService {
    /// Create a new cart service.
    #[must_use]
    pub fn new(carts: Arc<dyn CartRepository>, catalog: Arc<dyn ProductCatalog>) -> Self {
        Self { carts, catalog }
    }

    /// Lines of the account's cart. An account without a cart has an empty one.
    ///
    /// # Errors
    ///
    /// Returns an error if the database read fails.
    #[instrument(skip(self))]
    pub async fn get_cart(&self, account: AccountId) -> Result<Vec<CartLineItem>, AppError> {
        match self.carts.find_cart(account).await? {
            Some(cart) => Ok(self.carts.lines(cart).await?),
            None => Ok(Vec::new()),
        }
    }

    /// Add units of a product, creating the cart and line as needed.
    ///
    /// `quantity` defaults to 1. The increment and the stock check are one
    /// atomic write, so concurrent adds from several tabs never oversell.
    ///
    /// # Errors
    ///
    /// - `InvalidQuantity` if `quantity < 1`
    /// - `ProductNotFound` if the catalog does not know the product
    /// - `InsufficientStock` with the units still addable
    #[instrument(skip(self))]
    pub async fn add(
        &self,
        account: AccountId,
        product_id: ProductId,
        quantity: Option<i64>,
    ) -> Result<CartLineItem, AppError> {
        let quantity = quantity.map_or(Ok(Quantity::ONE), Quantity::new)?;
        let product = self
            .catalog
            .find(product_id)
            .await?
            .ok_or(CartError::ProductNotFound(product_id))?;

        let cart = self.carts.ensure_cart(account).await?;
        let Some(total) = self
            .carts
            .add_within_stock(cart, product_id, quantity, product.stock)
            .await?
        else {
            let existing = self.carts.line_quantity(cart, product_id).await?;
            return Err(CartError::InsufficientStock {
                available: product.stock.saturating_sub(existing),
            }
            .into());
        };

        add_breadcrumb(
            "cart",
            "Added to cart",
            Some(&[
                ("product_id", product_id.to_string().as_str()),
                ("quantity", total.to_string().as_str()),
            ]),
        );
        tracing::info!(%product_id, quantity = total.get(), "Cart line incremented");

        Ok(CartLineItem::from_product(&product, total))
    }

    /// Overwrite a line's quantity.
    ///
    /// # Errors
    ///
    /// - `InvalidQuantity` if `quantity < 1`
    /// - `CartNotFound` if the account has no cart
    /// - `ProductNotFound` if the catalog does not know the product
    /// - `InsufficientStock` (with current stock) if `quantity > stock`
    /// - `LineNotFound` if the product is not in the cart
    #[instrument(skip(self))]
    pub async fn set_quantity(
        &self,
        account: AccountId,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<CartLineItem, AppError> {
        let quantity = Quantity::new(quantity)?;
        let cart = self
            .carts
            .find_cart(account)
            .await?
            .ok_or(CartError::CartNotFound)?;
        let product = self
            .catalog
            .find(product_id)
            .await?
            .ok_or(CartError::ProductNotFound(product_id))?;

        if quantity.get() > product.stock {
            return Err(CartError::InsufficientStock {
                available: product.stock,
            }
            .into());
        }

        if !self.carts.set_quantity(cart, product_id, quantity).await? {
            return Err(CartError::LineNotFound(product_id).into());
        }

        add_breadcrumb(
            "cart",
            "Updated cart quantity",
            Some(&[
                ("product_id", product_id.to_string().as_str()),
                ("quantity", quantity.to_string().as_str()),
            ]),
        );

        Ok(CartLineItem::from_product(&product, quantity))
    }

    /// Remove a line. Removing a product that is not in the cart is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `CartNotFound` if the account has no cart.
    #[instrument(skip(self))]
    pub async fn remove(&self, account: AccountId, product_id: ProductId) -> Result<(), AppError> {
        let cart = self
            .carts
            .find_cart(account)
            .await?
            .ok_or(CartError::CartNotFound)?;

        if self.carts.remove_line(cart, product_id).await? {
            add_breadcrumb(
                "cart",
                "Removed from cart",
                Some(&[("product_id", product_id.to_string().as_str())]),
            );
        } else {
            tracing::debug!(%product_id, "Remove of absent line ignored");
        }
        Ok(())
    }

    /// Merge a local cart into the account's cart.
    ///
    /// Each line's stored quantity becomes exactly the submitted quantity, so
    /// replaying the same request leaves the cart unchanged. Every item is
    /// attempted; failures are collected rather than aborting the merge.
    ///
    /// # Errors
    ///
    /// Returns an error only if the account's cart cannot be created.
    /// Per-item failures are reported in the [`SyncReport`].
    #[instrument(skip(self, items), fields(items = items.len()))]
    pub async fn sync(
        &self,
        account: AccountId,
        items: &[(ProductId, i64)],
    ) -> Result<SyncReport, AppError> {
        let cart = self.carts.ensure_cart(account).await?;
        let mut report = SyncReport::default();

        for &(product_id, quantity) in items {
            match self.sync_line(cart, product_id, quantity).await {
                Ok(()) => report.applied += 1,
                Err(error) => {
                    tracing::warn!(%product_id, quantity, error = %error, "Cart sync item failed");
                    report.failed.push(product_id);
                }
            }
        }

        add_breadcrumb(
            "cart",
            "Synced local cart",
            Some(&[
                ("applied", report.applied.to_string().as_str()),
                ("failed", report.failed.len().to_string().as_str()),
            ]),
        );
        if report.is_complete() {
            tracing::info!(applied = report.applied, "Cart sync complete");
        }

        Ok(report)
    }

    async fn sync_line(
        &self,
        cart: CartId,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<(), AppError> {
        let quantity = Quantity::new(quantity)?;
        let product = self
            .catalog
            .find(product_id)
            .await?
            .ok_or(CartError::ProductNotFound(product_id))?;

        if quantity.get() > product.stock {
            return Err(CartError::InsufficientStock {
                available: product.stock,
            }
            .into());
        }

        self.carts
            .set_absolute(cart, product_id, quantity)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => CartError::ProductNotFound(product_id).into(),
                other => AppError::Database(other),
            })
    }
}
