//! Line quantity that is never zero.

use core::fmt;

use serde::{Deserialize, Serialize};

use super::CartError;

/// Quantity of one product in a cart.
///
/// A line that would drop to zero is removed instead, so a `Quantity` is
/// always at least 1. Deserializing `0` or a negative number fails with
/// [`CartError::InvalidQuantity`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u32")]
pub struct Quantity(u32);

impl Quantity {
    /// A single unit, the default for `add`.
    pub const ONE: Self = Self(1);

    /// Validate a raw quantity.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::InvalidQuantity`] if `value < 1` or it does not fit in a `u32`.
    pub fn new(value: i64) -> Result<Self, CartError> {
        u32::try_from(value)
            .ok()
            .filter(|v| *v >= 1)
            .map(Self)
            .ok_or(CartError::InvalidQuantity(value))
    }

    /// Get the raw count.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Add two quantities.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::InvalidQuantity`] on `u32` overflow.
    pub fn checked_add(self, other: Self) -> Result<Self, CartError> {
        self.0
            .checked_add(other.0)
            .map(Self)
            .ok_or_else(|| CartError::InvalidQuantity(i64::from(self.0) + i64::from(other.0)))
    }
}

impl Default for Quantity {
    fn default() -> Self {
        Self::ONE
    }
}

impl TryFrom<i64> for Quantity {
    type Error = CartError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<u32> for Quantity {
    type Error = CartError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(i64::from(value))
    }
}

impl TryFrom<i32> for Quantity {
    type Error = CartError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Self::new(i64::from(value))
    }
}

impl From<Quantity> for u32 {
    fn from(quantity: Quantity) -> Self {
        quantity.0
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
