//! Lashaz CLI - Database migrations and cart support tools.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront database migrations
//! lashaz-cli migrate
//!
//! # Print an account's persistent cart
//! lashaz-cli cart show <ACCOUNT_ID>
//!
//! # Fix a product's stock level
//! lashaz-cli product set-stock <PRODUCT_ID> <STOCK>
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `cart show` - Inspect a persistent cart
//! - `product set-stock` - Overwrite catalog stock

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use lashaz_core::{AccountId, ProductId};

mod commands;

#[derive(Parser)]
#[command(name = "lashaz-cli")]
#[command(author, version, about = "Lashaz storefront CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run storefront database migrations
    Migrate,
    /// Inspect persistent carts
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Catalog maintenance
    Product {
        #[command(subcommand)]
        action: ProductAction,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Print an account's cart
    Show {
        /// Account ID (UUID)
        account: AccountId,
    },
}

#[derive(Subcommand)]
enum ProductAction {
    /// Overwrite a product's stock level
    SetStock {
        /// Product ID (UUID)
        product: ProductId,
        /// New stock level
        stock: u32,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    match cli.command {
        Commands::Migrate => commands::migrate::storefront().await?,
        Commands::Cart { action } => match action {
            CartAction::Show { account } => commands::cart::show(account).await?,
        },
        Commands::Product { action } => match action {
            ProductAction::SetStock { product, stock } => {
                commands::product::set_stock(product, stock).await?;
            }
        },
    }
    Ok(())
}
