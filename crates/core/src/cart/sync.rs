//! Payloads exchanged when a local cart is merged into an account cart.

use serde::{Deserialize, Serialize};

use super::Quantity;
use crate::types::ProductId;

/// The persisted invariant set of one line: which product and how many.
///
/// Display fields (name, price, image) are a client convenience and never
/// travel in a sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineQuantity {
    /// Product ID.
    pub product_id: ProductId,
    /// Absolute quantity to store.
    pub quantity: Quantity,
}

/// Outcome of a best-effort merge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    /// Number of lines written.
    pub applied: usize,
    /// Products whose line could not be written.
    pub failed: Vec<ProductId>,
}

impl SyncReport {
    /// Whether every submitted line was written.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}
