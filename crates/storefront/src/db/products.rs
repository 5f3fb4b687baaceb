//! Catalog reads for stock validation and line display data.

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::PgPool;

use lashaz_core::{Price, ProductId, ProductSnapshot};

use super::{ProductCatalog, RepositoryError};

/// Catalog backed by `storefront.product`.
#[derive(Clone)]
pub struct PgProductCatalog {
    pool: PgPool,
}

impl PgProductCatalog {
    /// Create a new catalog reader.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: ProductId,
    name: String,
    price: Decimal,
    stock: i32,
    image_url: Option<String>,
}

impl TryFrom<ProductRow> for ProductSnapshot {
    type Error = RepositoryError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let stock = u32::try_from(row.stock).map_err(|_| {
            RepositoryError::DataCorruption(format!(
                "negative stock {} for product {}",
                row.stock, row.id
            ))
        })?;

        Ok(Self {
            id: row.id,
            name: row.name,
            price: Price::new(row.price),
            stock,
            image_url: Self::primary_image(row.image_url.as_deref()),
        })
    }
}

#[async_trait]
impl ProductCatalog for PgProductCatalog {
    async fn find(&self, id: ProductId) -> Result<Option<ProductSnapshot>, RepositoryError> {
        let row: Option<ProductRow> = sqlx::query_as(
            "SELECT id, name, price, stock, image_url FROM storefront.product WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(ProductSnapshot::try_from).transpose()
    }
}
