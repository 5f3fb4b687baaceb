//! Cart repository for `PostgreSQL`.
//!
//! Quantity changes are single statements keyed by the
//! `cart_item_cart_product_key` unique constraint. There is no
//! read-then-write pair anywhere in this module.

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use lashaz_core::{AccountId, CartId, CartLineItem, Price, ProductId, ProductSnapshot, Quantity};

use super::{CartRepository, RepositoryError, quantity_from_db, quantity_to_db};

/// Repository for persistent carts.
#[derive(Clone)]
pub struct PgCartRepository {
    pool: PgPool,
}

impl PgCartRepository {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// A cart line joined with its product.
#[derive(Debug, sqlx::FromRow)]
struct LineRow {
    product_id: ProductId,
    quantity: i32,
    name: String,
    price: Decimal,
    image_url: Option<String>,
}

impl TryFrom<LineRow> for CartLineItem {
    type Error = RepositoryError;

    fn try_from(row: LineRow) -> Result<Self, Self::Error> {
        Ok(Self {
            product_id: row.product_id,
            quantity: quantity_from_db(row.quantity)?,
            unit_price_snapshot: Some(Price::new(row.price)),
            display_name: row.name,
            image_ref: ProductSnapshot::primary_image(row.image_url.as_deref()),
        })
    }
}

#[async_trait]
impl CartRepository for PgCartRepository {
    async fn find_cart(&self, owner: AccountId) -> Result<Option<CartId>, RepositoryError> {
        let id: Option<(Uuid,)> =
            sqlx::query_as("SELECT id FROM storefront.cart WHERE account_id = $1")
                .bind(owner)
                .fetch_optional(&self.pool)
                .await?;

        Ok(id.map(|(id,)| CartId::from_uuid(id)))
    }

    async fn ensure_cart(&self, owner: AccountId) -> Result<CartId, RepositoryError> {
        // The no-op update makes RETURNING yield the existing row on conflict.
        let (id,): (Uuid,) = sqlx::query_as(
            r"
            INSERT INTO storefront.cart (account_id)
            VALUES ($1)
            ON CONFLICT (account_id) DO UPDATE SET updated_at = now()
            RETURNING id
            ",
        )
        .bind(owner)
        .fetch_one(&self.pool)
        .await?;

        Ok(CartId::from_uuid(id))
    }

    async fn lines(&self, cart: CartId) -> Result<Vec<CartLineItem>, RepositoryError> {
        let rows: Vec<LineRow> = sqlx::query_as(
            r"
            SELECT ci.product_id, ci.quantity, p.name, p.price, p.image_url
            FROM storefront.cart_item ci
            JOIN storefront.product p ON p.id = ci.product_id
            WHERE ci.cart_id = $1
            ORDER BY ci.created_at, ci.id
            ",
        )
        .bind(cart)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(CartLineItem::try_from).collect()
    }

    async fn line_quantity(
        &self,
        cart: CartId,
        product: ProductId,
    ) -> Result<u32, RepositoryError> {
        let row: Option<(i32,)> = sqlx::query_as(
            "SELECT quantity FROM storefront.cart_item WHERE cart_id = $1 AND product_id = $2",
        )
        .bind(cart)
        .bind(product)
        .fetch_optional(&self.pool)
        .await?;

        row.map_or(Ok(0), |(quantity,)| {
            quantity_from_db(quantity).map(Quantity::get)
        })
    }

    async fn add_within_stock(
        &self,
        cart: CartId,
        product: ProductId,
        quantity: Quantity,
        stock: u32,
    ) -> Result<Option<Quantity>, RepositoryError> {
        // Stock above i32::MAX cannot be stored, so clamp rather than fail.
        let stock = i32::try_from(stock).unwrap_or(i32::MAX);

        // Insert guarded by the requested amount, increment guarded by the
        // new total. Either guard failing returns no row.
        let row: Option<(i32,)> = sqlx::query_as(
            r"
            INSERT INTO storefront.cart_item (cart_id, product_id, quantity)
            SELECT $1, $2, $3::int4
            WHERE $3::int4 <= $4::int4
            ON CONFLICT (cart_id, product_id) DO UPDATE
                SET quantity = storefront.cart_item.quantity + EXCLUDED.quantity,
                    updated_at = now()
                WHERE storefront.cart_item.quantity + EXCLUDED.quantity <= $4::int4
            RETURNING quantity
            ",
        )
        .bind(cart)
        .bind(product)
        .bind(quantity_to_db(quantity)?)
        .bind(stock)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|(total,)| quantity_from_db(total)).transpose()
    }

    async fn set_quantity(
        &self,
        cart: CartId,
        product: ProductId,
        quantity: Quantity,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE storefront.cart_item
            SET quantity = $3, updated_at = now()
            WHERE cart_id = $1 AND product_id = $2
            ",
        )
        .bind(cart)
        .bind(product)
        .bind(quantity_to_db(quantity)?)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn set_absolute(
        &self,
        cart: CartId,
        product: ProductId,
        quantity: Quantity,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO storefront.cart_item (cart_id, product_id, quantity)
            VALUES ($1, $2, $3)
            ON CONFLICT (cart_id, product_id) DO UPDATE
                SET quantity = EXCLUDED.quantity,
                    updated_at = now()
            ",
        )
        .bind(cart)
        .bind(product)
        .bind(quantity_to_db(quantity)?)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_foreign_key_violation()
            {
                return RepositoryError::NotFound;
            }
            RepositoryError::Database(e)
        })?;

        Ok(())
    }

    async fn remove_line(
        &self,
        cart: CartId,
        product: ProductId,
    ) -> Result<bool, RepositoryError> {
        let result =
            sqlx::query("DELETE FROM storefront.cart_item WHERE cart_id = $1 AND product_id = $2")
                .bind(cart)
                .bind(product)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }
}
