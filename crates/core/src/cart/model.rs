//! Cart, line items and owners.

use serde::{Deserialize, Serialize};

use super::{CartError, LineQuantity, Quantity};
use crate::types::{AccountId, Price, ProductId, ProductSnapshot};

/// Whose cart this is.
///
/// An owner never changes variant in place: signing in produces a new
/// `Authenticated` owner and a reconciliation, not a mutation of the
/// anonymous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "accountId", rename_all = "snake_case")]
pub enum CartOwner {
    /// No durable identity; scoped to one browser's local storage.
    #[default]
    Anonymous,
    /// A signed-in account.
    Authenticated(AccountId),
}

impl CartOwner {
    /// The account, if signed in.
    #[must_use]
    pub const fn account(&self) -> Option<AccountId> {
        match self {
            Self::Anonymous => None,
            Self::Authenticated(id) => Some(*id),
        }
    }
}

/// One product's entry in a cart.
///
/// Serializes as `{productId, name, price, quantity, imageUrl}`, the shape the
/// cart API returns and the local cart file stores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineItem {
    /// Product ID, unique within a cart.
    pub product_id: ProductId,
    /// Units of this product, always at least 1.
    pub quantity: Quantity,
    /// Unit price when the line was last refreshed from the catalog.
    #[serde(rename = "price", default, skip_serializing_if = "Option::is_none")]
    pub unit_price_snapshot: Option<Price>,
    /// Product name for display.
    #[serde(rename = "name", default)]
    pub display_name: String,
    /// Image URL for display.
    #[serde(rename = "imageUrl", default, skip_serializing_if = "Option::is_none")]
    pub image_ref: Option<String>,
}

impl CartLineItem {
    /// Build a line from a catalog snapshot.
    #[must_use]
    pub fn from_product(product: &ProductSnapshot, quantity: Quantity) -> Self {
        Self {
            product_id: product.id,
            quantity,
            unit_price_snapshot: Some(product.price),
            display_name: product.name.clone(),
            image_ref: product.image_url.clone(),
        }
    }

    /// A line carrying only the persisted fields.
    #[must_use]
    pub fn bare(product_id: ProductId, quantity: Quantity) -> Self {
        Self {
            product_id,
            quantity,
            unit_price_snapshot: None,
            display_name: String::new(),
            image_ref: None,
        }
    }

    /// Line total, if the price is known.
    #[must_use]
    pub fn line_total(&self) -> Option<Price> {
        self.unit_price_snapshot
            .map(|price| price.line_total(self.quantity))
    }

    /// The persisted part of this line.
    #[must_use]
    pub const fn as_line_quantity(&self) -> LineQuantity {
        LineQuantity {
            product_id: self.product_id,
            quantity: self.quantity,
        }
    }

    fn refresh_display(&mut self, product: &ProductSnapshot) {
        self.unit_price_snapshot = Some(product.price);
        self.display_name.clone_from(&product.name);
        self.image_ref.clone_from(&product.image_url);
    }
}

/// Check that `existing + requested` units fit in `stock`.
///
/// Returns the new line total. At the boundary (`existing + requested ==
/// stock`) the check passes.
///
/// # Errors
///
/// Returns [`CartError::InsufficientStock`] with `stock - existing` (floored
/// at zero) when the total would exceed stock.
pub fn check_stock(stock: u32, existing: u32, requested: Quantity) -> Result<Quantity, CartError> {
    let total = u64::from(existing) + u64::from(requested.get());
    if total > u64::from(stock) {
        return Err(CartError::InsufficientStock {
            available: stock.saturating_sub(existing),
        });
    }
    // total <= stock, so it fits in u32 and is at least `requested`
    u32::try_from(total)
        .map_err(|_| CartError::InvalidQuantity(i64::from(stock)))
        .and_then(Quantity::try_from)
}

/// A cart: an owner and at most one line per product.
///
/// Only built through [`Cart::from_items`] and the mutators, so the
/// one-line-per-product rule always holds.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Cart {
    owner: CartOwner,
    items: Vec<CartLineItem>,
}

impl Cart {
    /// An empty cart. Empty is a valid cart, not a missing one.
    #[must_use]
    pub const fn empty(owner: CartOwner) -> Self {
        Self {
            owner,
            items: Vec::new(),
        }
    }

    /// Build a cart from stored lines.
    ///
    /// Duplicate products collapse onto one line; the last one wins.
    #[must_use]
    pub fn from_items(owner: CartOwner, items: impl IntoIterator<Item = CartLineItem>) -> Self {
        let mut cart = Self::empty(owner);
        for item in items {
            cart.set_absolute(item);
        }
        cart
    }

    /// The owner.
    #[must_use]
    pub const fn owner(&self) -> CartOwner {
        self.owner
    }

    /// Lines in insertion order.
    #[must_use]
    pub fn items(&self) -> &[CartLineItem] {
        &self.items
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of distinct products.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Total units across all lines (the cart badge count).
    #[must_use]
    pub fn total_quantity(&self) -> u64 {
        self.items
            .iter()
            .map(|line| u64::from(line.quantity.get()))
            .sum()
    }

    /// Sum of the known line totals.
    #[must_use]
    pub fn subtotal(&self) -> Price {
        self.items
            .iter()
            .filter_map(CartLineItem::line_total)
            .fold(Price::ZERO, |acc, total| acc + total)
    }

    /// The line for a product.
    #[must_use]
    pub fn line(&self, product_id: ProductId) -> Option<&CartLineItem> {
        self.items.iter().find(|line| line.product_id == product_id)
    }

    /// Units of a product in the cart, zero when absent.
    #[must_use]
    pub fn quantity_of(&self, product_id: ProductId) -> u32 {
        self.line(product_id).map_or(0, |line| line.quantity.get())
    }

    /// The persisted part of every line, for a sync.
    #[must_use]
    pub fn snapshot(&self) -> Vec<LineQuantity> {
        self.items.iter().map(CartLineItem::as_line_quantity).collect()
    }

    /// Put more of a product in the cart.
    ///
    /// Increments the existing line or creates one. Display fields are
    /// refreshed from the snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::InsufficientStock`] if the new total would exceed
    /// `product.stock`.
    pub fn add(
        &mut self,
        product: &ProductSnapshot,
        quantity: Quantity,
    ) -> Result<CartLineItem, CartError> {
        let total = check_stock(product.stock, self.quantity_of(product.id), quantity)?;
        let line = if let Some(line) = self.line_mut(product.id) {
            line.quantity = total;
            line.refresh_display(product);
            line.clone()
        } else {
            let line = CartLineItem::from_product(product, total);
            self.items.push(line.clone());
            line
        };
        Ok(line)
    }

    /// Increment a line without a stock check.
    ///
    /// Used for the optimistic mirror, where the authoritative store performs
    /// the check and a failure restores the previous state.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::InvalidQuantity`] on overflow.
    pub fn accumulate(&mut self, line: CartLineItem) -> Result<CartLineItem, CartError> {
        if let Some(existing) = self.line_mut(line.product_id) {
            existing.quantity = existing.quantity.checked_add(line.quantity)?;
            return Ok(existing.clone());
        }
        self.items.push(line.clone());
        Ok(line)
    }

    /// Make the cart contain exactly `quantity` of a product.
    ///
    /// This overwrites; it never increments. Pass `stock` to refuse
    /// quantities above what is available.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::LineNotFound`] if the product is not in the cart,
    /// or [`CartError::InsufficientStock`] if `quantity > stock`.
    pub fn set_quantity(
        &mut self,
        product_id: ProductId,
        quantity: Quantity,
        stock: Option<u32>,
    ) -> Result<CartLineItem, CartError> {
        if let Some(stock) = stock
            && quantity.get() > stock
        {
            return Err(CartError::InsufficientStock { available: stock });
        }
        let line = self
            .line_mut(product_id)
            .ok_or(CartError::LineNotFound(product_id))?;
        line.quantity = quantity;
        Ok(line.clone())
    }

    /// Upsert a line with absolute-set semantics.
    ///
    /// The stored quantity becomes exactly `line.quantity`, so applying the
    /// same line any number of times converges to the same cart.
    pub fn set_absolute(&mut self, line: CartLineItem) {
        if let Some(existing) = self.line_mut(line.product_id) {
            existing.quantity = line.quantity;
            if !line.display_name.is_empty() {
                existing.display_name = line.display_name;
            }
            if line.unit_price_snapshot.is_some() {
                existing.unit_price_snapshot = line.unit_price_snapshot;
            }
            if line.image_ref.is_some() {
                existing.image_ref = line.image_ref;
            }
        } else {
            self.items.push(line);
        }
    }

    /// Remove a product's line entirely.
    ///
    /// Returns the removed line, or `None` (not an error) if it was absent.
    pub fn remove(&mut self, product_id: ProductId) -> Option<CartLineItem> {
        let idx = self
            .items
            .iter()
            .position(|line| line.product_id == product_id)?;
        Some(self.items.remove(idx))
    }

    /// Drop every line.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    fn line_mut(&mut self, product_id: ProductId) -> Option<&mut CartLineItem> {
        self.items
            .iter_mut()
            .find(|line| line.product_id == product_id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    fn product(stock: u32) -> ProductSnapshot {
        ProductSnapshot {
            id: ProductId::generate(),
            name: "Velvet Lip Tint".to_string(),
            price: Price::new(Decimal::new(1800, 2)),
            stock,
            image_url: Some("https://cdn.lashaz.com/tint.png".to_string()),
        }
    }

    fn qty(n: i64) -> Quantity {
        Quantity::new(n).unwrap()
    }

    #[test]
    fn test_add_accumulates() {
        let p = product(100);
        let mut cart = Cart::empty(CartOwner::Anonymous);
        cart.add(&p, qty(2)).unwrap();
        let line = cart.add(&p, qty(3)).unwrap();
        assert_eq!(line.quantity.get(), 5);
        assert_eq!(cart.len(), 1);
    }

    #[test]
    fn test_set_quantity_overwrites() {
        let p = product(100);
        let mut cart = Cart::empty(CartOwner::Anonymous);
        cart.add(&p, Quantity::ONE).unwrap();
        cart.set_quantity(p.id, qty(2), Some(p.stock)).unwrap();
        cart.set_quantity(p.id, qty(3), Some(p.stock)).unwrap();
        assert_eq!(cart.quantity_of(p.id), 3);
    }

    #[test]
    fn test_set_quantity_requires_line() {
        let p = product(10);
        let mut cart = Cart::empty(CartOwner::Anonymous);
        assert_eq!(
            cart.set_quantity(p.id, qty(2), None),
            Err(CartError::LineNotFound(p.id))
        );
    }

    #[test]
    fn test_set_quantity_above_stock() {
        let p = product(4);
        let mut cart = Cart::empty(CartOwner::Anonymous);
        cart.add(&p, Quantity::ONE).unwrap();
        assert_eq!(
            cart.set_quantity(p.id, qty(5), Some(4)),
            Err(CartError::InsufficientStock { available: 4 })
        );
        assert_eq!(cart.quantity_of(p.id), 1);
    }

    #[test]
    fn test_uniqueness_across_mixed_operations() {
        let a = product(50);
        let b = product(50);
        let mut cart = Cart::empty(CartOwner::Anonymous);
        for step in 0..20_i64 {
            let p = if step % 2 == 0 { &a } else { &b };
            if step % 3 == 0 {
                cart.add(p, Quantity::ONE).unwrap();
            } else if cart.line(p.id).is_some() {
                cart.set_quantity(p.id, qty(step % 4 + 1), Some(p.stock))
                    .unwrap();
            }
        }
        let mut ids: Vec<_> = cart.items().iter().map(|l| l.product_id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), cart.len());
    }

    #[test]
    fn test_stock_boundary() {
        let p = product(5);
        let mut cart = Cart::empty(CartOwner::Anonymous);
        cart.add(&p, qty(2)).unwrap();

        // existing 2 + 3 == stock: allowed
        let mut at_boundary = cart.clone();
        assert_eq!(at_boundary.add(&p, qty(3)).unwrap().quantity.get(), 5);

        // one unit above: refused with stock - existing
        assert_eq!(
            cart.add(&p, qty(4)),
            Err(CartError::InsufficientStock { available: 3 })
        );
        assert_eq!(cart.quantity_of(p.id), 2);
    }

    #[test]
    fn test_check_stock_floors_available_at_zero() {
        assert_eq!(
            check_stock(2, 5, Quantity::ONE),
            Err(CartError::InsufficientStock { available: 0 })
        );
    }

    #[test]
    fn test_remove_drops_line() {
        let p = product(10);
        let mut cart = Cart::empty(CartOwner::Anonymous);
        cart.add(&p, qty(2)).unwrap();
        assert!(cart.remove(p.id).is_some());
        assert!(cart.line(p.id).is_none());
        assert!(cart.is_empty());
        // absent: no-op
        assert!(cart.remove(p.id).is_none());
    }

    #[test]
    fn test_from_items_keeps_one_line_per_product() {
        let a = ProductId::generate();
        let cart = Cart::from_items(
            CartOwner::Anonymous,
            [CartLineItem::bare(a, qty(1)), CartLineItem::bare(a, qty(5))],
        );
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.quantity_of(a), 5);
    }

    #[test]
    fn test_set_absolute_is_idempotent() {
        let a = ProductId::generate();
        let b = ProductId::generate();
        let mut cart = Cart::from_items(
            CartOwner::Authenticated(AccountId::generate()),
            [CartLineItem::bare(a, qty(1)), CartLineItem::bare(b, qty(4))],
        );
        let incoming = CartLineItem::bare(a, qty(2));

        cart.set_absolute(incoming.clone());
        let once = cart.clone();
        cart.set_absolute(incoming);

        assert_eq!(cart, once);
        assert_eq!(cart.quantity_of(a), 2);
        assert_eq!(cart.quantity_of(b), 4);
    }

    #[test]
    fn test_set_absolute_keeps_display_fields_when_bare() {
        let p = product(10);
        let mut cart = Cart::empty(CartOwner::Anonymous);
        cart.add(&p, qty(1)).unwrap();
        cart.set_absolute(CartLineItem::bare(p.id, qty(6)));
        let line = cart.line(p.id).unwrap();
        assert_eq!(line.quantity.get(), 6);
        assert_eq!(line.display_name, "Velvet Lip Tint");
    }

    #[test]
    fn test_subtotal_and_count() {
        let p = product(10);
        let mut cart = Cart::empty(CartOwner::Anonymous);
        cart.add(&p, qty(3)).unwrap();
        assert_eq!(cart.total_quantity(), 3);
        assert_eq!(cart.subtotal().to_string(), "$54.00");
    }

    #[test]
    fn test_line_wire_shape() {
        let p = product(10);
        let line = CartLineItem::from_product(&p, qty(2));
        let json = serde_json::to_value(&line).unwrap();
        assert_eq!(json["productId"], p.id.to_string());
        assert_eq!(json["name"], "Velvet Lip Tint");
        assert_eq!(json["quantity"], 2);
        assert_eq!(json["price"], 18.0);
        assert_eq!(json["imageUrl"], "https://cdn.lashaz.com/tint.png");
    }

    #[test]
    fn test_owner_account() {
        let id = AccountId::generate();
        assert_eq!(CartOwner::Authenticated(id).account(), Some(id));
        assert!(CartOwner::Anonymous.account().is_none());
    }
}
