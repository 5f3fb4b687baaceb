//! Lashaz Cart Client - client-side cart state.
//!
//! Keeps the anonymous cart in local storage, merges it into the account cart
//! on sign-in, and presents one optimistic mirror of whichever store is
//! authoritative.
//!
//! # Modules
//!
//! - [`storage`] - Local persistence for the anonymous cart
//! - [`ephemeral`] - Anonymous cart rules over local storage
//! - [`http`] - Storefront cart and product API adapters
//! - [`reconciler`] - One-shot merge of the anonymous cart on sign-in
//! - [`manager`] - Mirror, authority switching and optimistic writes
//!
//! # Example
//!
//! ```rust,ignore
//! use lashaz_cart_client::{CartCommand, CartStateManager, ClientConfig};
//!
//! let config = ClientConfig::from_env()?;
//! let manager = CartStateManager::from_config(&config, None).await?;
//! manager
//!     .dispatch(CartCommand::Add { product_id, quantity: Quantity::ONE })
//!     .await?;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod ephemeral;
pub mod error;
pub mod http;
pub mod manager;
pub mod reconciler;
pub mod storage;
pub mod traits;

pub use config::{ClientConfig, ConfigError};
pub use ephemeral::EphemeralCart;
pub use error::ClientError;
pub use http::{HttpCartApi, HttpCatalog, StorefrontHttp};
pub use manager::{Authority, CartCommand, CartStateManager};
pub use reconciler::{ReconcileOutcome, Reconciler, ReconcilerState};
pub use storage::{FileCartStorage, LocalCartStorage, MemoryCartStorage};
pub use traits::{PersistentCartApi, ProductDisplay, StockOracle};
