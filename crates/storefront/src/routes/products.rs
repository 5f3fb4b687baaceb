//! Product lookup for clients.
//!
//! The client-side cart uses this as its stock oracle before writing to local
//! storage.

use axum::{Json, extract::State};
use tracing::instrument;

use lashaz_core::{CartError, ProductId, ProductSnapshot};

use crate::error::Result;
use crate::extract::ApiPath;
use crate::state::AppState;

/// Current snapshot of one product.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ProductId>,
) -> Result<Json<ProductSnapshot>> {
    let product = state
        .catalog()
        .find(id)
        .await?
        .ok_or(CartError::ProductNotFound(id))?;

    Ok(Json(product))
}
