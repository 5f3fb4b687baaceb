//! Catalog product snapshot.

use serde::{Deserialize, Serialize};

use super::{Price, ProductId};

/// What the catalog knows about a product at the moment it was asked.
///
/// The cart never owns product data; it reads a snapshot to validate stock and
/// to fill display fields on a new line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSnapshot {
    /// Product ID.
    pub id: ProductId,
    /// Display name.
    pub name: String,
    /// Current unit price.
    pub price: Price,
    /// Units currently available.
    pub stock: u32,
    /// Primary image URL, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl ProductSnapshot {
    /// Pick the primary image from the catalog's comma-separated image list.
    ///
    /// Empty lists and blank entries yield `None`.
    #[must_use]
    pub fn primary_image(image_list: Option<&str>) -> Option<String> {
        image_list
            .and_then(|list| list.split(',').next())
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .map(ToOwned::to_owned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_image_takes_first_entry() {
        assert_eq!(
            ProductSnapshot::primary_image(Some("https://a/1.png, https://a/2.png")),
            Some("https://a/1.png".to_string())
        );
    }

    #[test]
    fn test_primary_image_blank() {
        assert_eq!(ProductSnapshot::primary_image(Some("")), None);
        assert_eq!(ProductSnapshot::primary_image(Some(" ,x")), None);
        assert_eq!(ProductSnapshot::primary_image(None), None);
    }
}
