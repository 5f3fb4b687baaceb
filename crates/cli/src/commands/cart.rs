//! Persistent cart support commands.
//!
//! # Usage
//!
//! ```bash
//! # Print an account's cart
//! lashaz-cli cart show 1f0c6a9e-8a4e-4f55-9d1c-3d2c7f9a0b11
//! ```

use lashaz_core::{AccountId, Cart, CartOwner};
use lashaz_storefront::db::{CartRepository, PgCartRepository};

use super::{CommandError, connect};

/// Print the account's persistent cart.
pub async fn show(account: AccountId) -> Result<(), CommandError> {
    let pool = connect().await?;
    let repo = PgCartRepository::new(pool);

    let Some(cart_id) = repo.find_cart(account).await? else {
        tracing::info!("Account {account} has no cart");
        return Ok(());
    };

    let cart = Cart::from_items(CartOwner::Authenticated(account), repo.lines(cart_id).await?);
    print_cart(&cart);
    Ok(())
}

#[allow(clippy::print_stdout)]
fn print_cart(cart: &Cart) {
    for line in cart.items() {
        let price = line
            .unit_price_snapshot
            .map_or_else(|| "-".to_owned(), |p| p.to_string());
        println!(
            "{}  {:>4} x {:<10} {}",
            line.product_id,
            line.quantity.get(),
            price,
            line.display_name
        );
    }
    println!(
        "{} line(s), {} unit(s), subtotal {}",
        cart.len(),
        cart.total_quantity(),
        cart.subtotal()
    );
}
