//! Catalog support commands.
//!
//! The catalog belongs to the back office; this exists to fix stock by hand
//! and to prepare test data.
//!
//! # Usage
//!
//! ```bash
//! lashaz-cli product set-stock 4b7d1f3e-2c55-4a8b-9e61-0f3a2d9c7e44 12
//! ```

use lashaz_core::ProductId;

use super::{CommandError, connect};

/// Overwrite a product's stock level.
pub async fn set_stock(product: ProductId, stock: u32) -> Result<(), CommandError> {
    let stock = i32::try_from(stock)
        .map_err(|_| CommandError::InvalidArgument(format!("stock {stock} is out of range")))?;
    let pool = connect().await?;

    let result = sqlx::query(
        r"
        UPDATE storefront.product
        SET stock = $2, updated_at = now()
        WHERE id = $1
        ",
    )
    .bind(product)
    .bind(stock)
    .execute(&pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(CommandError::NotFound(format!("product {product}")));
    }

    tracing::info!("Stock for {product} set to {stock}");
    Ok(())
}
