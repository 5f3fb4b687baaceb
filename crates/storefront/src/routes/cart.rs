//! Cart API handlers.
//!
//! JSON endpoints over the signed-in account's persistent cart. Anonymous
//! visitors keep their cart client-side and only call `get`, which answers
//! with an empty list.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use lashaz_core::{CartLineItem, ProductId, SyncReport};

use crate::error::Result;
use crate::extract::ApiJson;
use crate::middleware::{OptionalAuth, RequireAuth};
use crate::state::AppState;

/// Add-to-cart request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddRequest {
    pub product_id: ProductId,
    /// Defaults to 1 when absent.
    #[serde(default)]
    pub quantity: Option<i64>,
}

/// Set-quantity request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRequest {
    pub product_id: ProductId,
    pub quantity: i64,
}

/// Remove request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveRequest {
    pub product_id: ProductId,
}

/// One local line submitted for merge.
///
/// The quantity stays a raw integer so a bad line fails alone instead of
/// rejecting the whole body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncItem {
    pub product_id: ProductId,
    pub quantity: i64,
}

/// Sync request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRequest {
    #[serde(default)]
    pub local_items: Vec<SyncItem>,
}

/// Add-to-cart response.
#[derive(Debug, Serialize)]
pub struct AddResponse {
    pub success: bool,
    pub message: String,
    pub item: CartLineItem,
}

/// Set-quantity response.
#[derive(Debug, Serialize)]
pub struct UpdateResponse {
    pub success: bool,
    pub item: CartLineItem,
}

/// Bare success acknowledgement.
#[derive(Debug, Serialize)]
pub struct Ack {
    pub success: bool,
}

/// Sync response. `success` is false when any line failed.
#[derive(Debug, Serialize)]
pub struct SyncResponse {
    pub success: bool,
    pub applied: usize,
    pub failed: Vec<ProductId>,
}

impl From<SyncReport> for SyncResponse {
    fn from(report: SyncReport) -> Self {
        Self {
            success: report.is_complete(),
            applied: report.applied,
            failed: report.failed,
        }
    }
}

/// Current cart lines (empty when anonymous or when no cart exists yet).
#[instrument(skip(state, user))]
pub async fn show(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
) -> Result<Json<Vec<CartLineItem>>> {
    let Some(user) = user else {
        return Ok(Json(Vec::new()));
    };
    Ok(Json(state.cart().get_cart(user.id).await?))
}

/// Add units of a product.
#[instrument(skip(state, user), fields(product_id = %req.product_id))]
pub async fn add(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiJson(req): ApiJson<AddRequest>,
) -> Result<Json<AddResponse>> {
    let item = state
        .cart()
        .add(user.id, req.product_id, req.quantity)
        .await?;

    Ok(Json(AddResponse {
        success: true,
        message: format!("{} added to bag", item.display_name),
        item,
    }))
}

/// Overwrite a line's quantity.
#[instrument(skip(state, user), fields(product_id = %req.product_id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiJson(req): ApiJson<UpdateRequest>,
) -> Result<Json<UpdateResponse>> {
    let item = state
        .cart()
        .set_quantity(user.id, req.product_id, req.quantity)
        .await?;

    Ok(Json(UpdateResponse {
        success: true,
        item,
    }))
}

/// Remove a line.
#[instrument(skip(state, user), fields(product_id = %req.product_id))]
pub async fn remove(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiJson(req): ApiJson<RemoveRequest>,
) -> Result<Json<Ack>> {
    state.cart().remove(user.id, req.product_id).await?;
    Ok(Json(Ack { success: true }))
}

/// Merge the local cart into the account cart.
#[instrument(skip(state, user, req), fields(items = req.local_items.len()))]
pub async fn sync(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiJson(req): ApiJson<SyncRequest>,
) -> Result<Json<SyncResponse>> {
    let items: Vec<_> = req
        .local_items
        .iter()
        .map(|item| (item.product_id, item.quantity))
        .collect();

    let report = state.cart().sync(user.id, &items).await?;
    Ok(Json(report.into()))
}
