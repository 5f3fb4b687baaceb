//! HTTP adapters for the storefront cart and product APIs.
//!
//! Both adapters share one `reqwest` client with a cookie store, so the
//! session cookie issued at sign-in identifies every cart call.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, instrument};
use url::Url;

use lashaz_core::{
    CartError, CartLineItem, LineQuantity, ProductId, ProductSnapshot, Quantity, SyncReport,
};

use crate::error::{ClientError, RequestContext};
use crate::traits::{PersistentCartApi, ProductDisplay, StockOracle};

/// Request timeout for storefront calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Longest error body kept in a `ClientError::Status` message.
const MAX_ERROR_BODY_CHARS: usize = 200;

/// Shared HTTP transport to the storefront.
#[derive(Clone)]
pub struct StorefrontHttp {
    inner: Arc<StorefrontHttpInner>,
}

struct StorefrontHttpInner {
    client: reqwest::Client,
    base_url: Url,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Deserialize)]
struct ItemResponse {
    item: CartLineItem,
}

#[derive(Deserialize)]
struct SyncResponse {
    applied: usize,
    failed: Vec<ProductId>,
}

impl StorefrontHttp {
    /// Create a transport rooted at `base_url` (which should end in `/`).
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(base_url: Url) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            inner: Arc::new(StorefrontHttpInner { client, base_url }),
        })
    }

    /// Start a request to a path relative to the base URL.
    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ClientError> {
        let url = self.inner.base_url.join(path)?;
        Ok(self.inner.client.request(method, url))
    }

    /// Send a request and decode a JSON success body.
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ClientError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorBody>(&body).map_or_else(
                |_| body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
                |e| e.error,
            );
            debug!(status = %status, message = %message, "Storefront returned non-success status");
            return Err(ClientError::Status {
                status: status.as_u16(),
                message,
            });
        }

        Ok(serde_json::from_str(&body)?)
    }
}

/// [`PersistentCartApi`] over the storefront's `/api/cart` routes.
#[derive(Clone)]
pub struct HttpCartApi {
    http: StorefrontHttp,
}

impl HttpCartApi {
    /// Create a cart API client.
    #[must_use]
    pub const fn new(http: StorefrontHttp) -> Self {
        Self { http }
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
        context: RequestContext,
    ) -> Result<T, CartError> {
        let mut request = self
            .http
            .request(method, path)
            .map_err(|e| e.into_cart_error(context))?;
        if let Some(body) = body {
            request = request.json(&body);
        }
        self.http
            .send(request)
            .await
            .map_err(|e| e.into_cart_error(context))
    }
}

#[async_trait]
impl PersistentCartApi for HttpCartApi {
    #[instrument(skip(self))]
    async fn load(&self) -> Result<Vec<CartLineItem>, CartError> {
        self.call(Method::GET, "api/cart/get", None, RequestContext::default())
            .await
    }

    #[instrument(skip(self))]
    async fn add(
        &self,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<CartLineItem, CartError> {
        let response: ItemResponse = self
            .call(
                Method::POST,
                "api/cart/add",
                Some(json!({ "productId": product_id, "quantity": quantity })),
                RequestContext::line(product_id, i64::from(quantity.get())),
            )
            .await?;
        Ok(response.item)
    }

    #[instrument(skip(self))]
    async fn set_quantity(
        &self,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<CartLineItem, CartError> {
        let response: ItemResponse = self
            .call(
                Method::PATCH,
                "api/cart/update",
                Some(json!({ "productId": product_id, "quantity": quantity })),
                RequestContext::line(product_id, i64::from(quantity.get())),
            )
            .await?;
        Ok(response.item)
    }

    #[instrument(skip(self))]
    async fn remove(&self, product_id: ProductId) -> Result<(), CartError> {
        let _: serde_json::Value = self
            .call(
                Method::DELETE,
                "api/cart/remove",
                Some(json!({ "productId": product_id })),
                RequestContext::product(product_id),
            )
            .await?;
        Ok(())
    }

    #[instrument(skip(self, items), fields(items = items.len()))]
    async fn sync(&self, items: &[LineQuantity]) -> Result<SyncReport, CartError> {
        let response: SyncResponse = self
            .call(
                Method::POST,
                "api/cart/sync",
                Some(json!({ "localItems": items })),
                RequestContext::default(),
            )
            .await?;
        Ok(SyncReport {
            applied: response.applied,
            failed: response.failed,
        })
    }
}

/// [`StockOracle`] over `/api/products/{id}`.
///
/// Stock is fetched on every call. Only display fields are cached.
#[derive(Clone)]
pub struct HttpCatalog {
    http: StorefrontHttp,
    display_cache: Cache<ProductId, ProductDisplay>,
}

impl HttpCatalog {
    /// Create a catalog client caching display data for `ttl`.
    #[must_use]
    pub fn new(http: StorefrontHttp, ttl: Duration) -> Self {
        let display_cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(ttl)
            .build();
        Self {
            http,
            display_cache,
        }
    }
}

#[async_trait]
impl StockOracle for HttpCatalog {
    #[instrument(skip(self))]
    async fn product(&self, id: ProductId) -> Result<Option<ProductSnapshot>, CartError> {
        let context = RequestContext::product(id);
        let request = self
            .http
            .request(Method::GET, &format!("api/products/{id}"))
            .map_err(|e| e.into_cart_error(context))?;

        let product: ProductSnapshot = match self.http.send(request).await {
            Ok(product) => product,
            Err(ClientError::Status { status, .. }) if status == StatusCode::NOT_FOUND.as_u16() => {
                return Ok(None);
            }
            Err(e) => return Err(e.into_cart_error(context)),
        };

        self.display_cache
            .insert(id, ProductDisplay::from(&product))
            .await;
        Ok(Some(product))
    }

    async fn cached_display(&self, id: ProductId) -> Option<ProductDisplay> {
        self.display_cache.get(&id).await
    }
}
