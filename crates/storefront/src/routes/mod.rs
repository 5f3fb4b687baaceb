//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health               - Health check
//! GET    /health/ready         - Readiness (database probe)
//!
//! # Cart API (JSON)
//! GET    /api/cart/get         - Current lines (empty when anonymous)
//! POST   /api/cart/add         - Add units of a product
//! PATCH  /api/cart/update      - Overwrite a line's quantity
//! DELETE /api/cart/remove      - Remove a line
//! POST   /api/cart/sync        - Merge a local cart after sign-in
//!
//! # Products API (JSON)
//! GET    /api/products/{id}    - Product snapshot (stock, price, display data)
//! ```

pub mod cart;
pub mod products;

use axum::{
    Router,
    routing::{delete, get, patch, post},
};

use crate::state::AppState;

/// Create the cart API router.
pub fn cart_api_routes() -> Router<AppState> {
    Router::new()
        .route("/get", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", patch(cart::update))
        .route("/remove", delete(cart::remove))
        .route("/sync", post(cart::sync))
}

/// Create the product API router.
pub fn product_api_routes() -> Router<AppState> {
    Router::new().route("/{id}", get(products::show))
}

/// Create all API routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/api/cart", cart_api_routes())
        .nest("/api/products", product_api_routes())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        extract::Path,
        http::{Method, Request, StatusCode, header},
        response::Response,
    };
    use lashaz_core::{AccountId, Price, ProductId, ProductSnapshot};
    use rust_decimal::Decimal;
    use secrecy::SecretString;
    use serde_json::{Value, json};
    use tower::ServiceExt;
    use tower_sessions::{MemoryStore, Session};

    use super::*;
    use crate::config::{SentryConfig, StorefrontConfig};
    use crate::db::memory::{MemoryCartRepository, MemoryCatalog};
    use crate::middleware::{session, set_current_user};
    use crate::models::CurrentUser;

    struct TestApp {
        router: Router,
        catalog: Arc<MemoryCatalog>,
        repo: Arc<MemoryCartRepository>,
    }

    async fn sign_in_for_test(session: Session, Path(id): Path<AccountId>) -> StatusCode {
        set_current_user(&session, &CurrentUser { id }).await.unwrap();
        StatusCode::NO_CONTENT
    }

    fn test_config() -> StorefrontConfig {
        StorefrontConfig {
            database_url: SecretString::from("postgres://localhost/test"),
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            sentry: SentryConfig::default(),
        }
    }

    fn app() -> TestApp {
        let catalog = Arc::new(MemoryCatalog::default());
        let repo = Arc::new(MemoryCartRepository::new(Arc::clone(&catalog)));
        let state = AppState::from_parts(test_config(), repo.clone(), catalog.clone());

        let router = routes()
            .route("/test/sign-in/{id}", post(sign_in_for_test))
            .layer(session::configure(MemoryStore::default(), false))
            .with_state(state);

        TestApp {
            router,
            catalog,
            repo,
        }
    }

    fn stock_product(app: &TestApp, stock: u32) -> ProductSnapshot {
        let product = ProductSnapshot {
            id: ProductId::generate(),
            name: "Mink Volume Lashes".to_string(),
            price: Price::new(Decimal::new(3450, 2)),
            stock,
            image_url: Some("https://cdn.lashaz.com/mink.png".to_string()),
        };
        app.catalog.insert(product.clone());
        product
    }

    async fn send(
        app: &TestApp,
        method: Method,
        uri: &str,
        cookie: Option<&str>,
        body: Option<Value>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        app.router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    /// Sign in and return the session cookie pair.
    async fn sign_in(app: &TestApp) -> String {
        let account = AccountId::generate();
        let response = send(
            app,
            Method::POST,
            &format!("/test/sign-in/{account}"),
            None,
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap();
        set_cookie.split(';').next().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_anonymous_get_is_empty_list() {
        let app = app();
        let response = send(&app, Method::GET, "/api/cart/get", None, None).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!([]));
    }

    #[tokio::test]
    async fn test_anonymous_mutations_are_unauthorized() {
        let app = app();
        let id = ProductId::generate();

        let cases = [
            (Method::POST, "/api/cart/add", json!({ "productId": id })),
            (
                Method::PATCH,
                "/api/cart/update",
                json!({ "productId": id, "quantity": 2 }),
            ),
            (Method::DELETE, "/api/cart/remove", json!({ "productId": id })),
            (Method::POST, "/api/cart/sync", json!({ "localItems": [] })),
        ];

        for (method, uri, body) in cases {
            let response = send(&app, method, uri, None, Some(body)).await;
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
            assert_eq!(json_body(response).await["error"], "Unauthorized");
        }
    }

    #[tokio::test]
    async fn test_add_then_get_returns_line() {
        let app = app();
        let product = stock_product(&app, 10);
        let cookie = sign_in(&app).await;

        let response = send(
            &app,
            Method::POST,
            "/api/cart/add",
            Some(&cookie),
            Some(json!({ "productId": product.id, "quantity": 2 })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["message"], "Mink Volume Lashes added to bag");
        assert_eq!(body["item"]["quantity"], 2);

        let response = send(&app, Method::GET, "/api/cart/get", Some(&cookie), None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await,
            json!([{
                "productId": product.id,
                "name": "Mink Volume Lashes",
                "price": 34.5,
                "quantity": 2,
                "imageUrl": "https://cdn.lashaz.com/mink.png",
            }])
        );
    }

    #[tokio::test]
    async fn test_add_error_statuses() {
        let app = app();
        let product = stock_product(&app, 3);
        let cookie = sign_in(&app).await;

        let response = send(
            &app,
            Method::POST,
            "/api/cart/add",
            Some(&cookie),
            Some(json!({ "productId": product.id, "quantity": 4 })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            json_body(response).await["error"],
            "Only 3 items left in stock"
        );

        let response = send(
            &app,
            Method::POST,
            "/api/cart/add",
            Some(&cookie),
            Some(json!({ "productId": product.id, "quantity": 0 })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = send(
            &app,
            Method::POST,
            "/api/cart/add",
            Some(&cookie),
            Some(json!({ "productId": ProductId::generate() })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_malformed_requests_get_json_errors() {
        let app = app();
        let product = stock_product(&app, 5);
        let cookie = sign_in(&app).await;

        let cases = [
            (
                Method::POST,
                "/api/cart/add",
                json!({ "productId": product.id, "quantity": 1.5 }),
            ),
            (
                Method::PATCH,
                "/api/cart/update",
                json!({ "productId": "not-a-uuid", "quantity": 2 }),
            ),
            (Method::DELETE, "/api/cart/remove", json!({})),
            (
                Method::POST,
                "/api/cart/sync",
                json!({ "localItems": "everything" }),
            ),
        ];

        for (method, uri, body) in cases {
            let response = send(&app, method, uri, Some(&cookie), Some(body)).await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
            let body = json_body(response).await;
            assert!(body["error"].is_string(), "{uri}: {body}");
        }

        let response = send(&app, Method::GET, "/api/products/42", None, None).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(json_body(response).await["error"].is_string());
    }

    #[tokio::test]
    async fn test_update_and_remove() {
        let app = app();
        let product = stock_product(&app, 5);
        let cookie = sign_in(&app).await;

        // No cart yet
        let response = send(
            &app,
            Method::PATCH,
            "/api/cart/update",
            Some(&cookie),
            Some(json!({ "productId": product.id, "quantity": 2 })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        send(
            &app,
            Method::POST,
            "/api/cart/add",
            Some(&cookie),
            Some(json!({ "productId": product.id })),
        )
        .await;

        let response = send(
            &app,
            Method::PATCH,
            "/api/cart/update",
            Some(&cookie),
            Some(json!({ "productId": product.id, "quantity": 4 })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["item"]["quantity"], 4);

        let response = send(
            &app,
            Method::PATCH,
            "/api/cart/update",
            Some(&cookie),
            Some(json!({ "productId": product.id, "quantity": 0 })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = send(
            &app,
            Method::DELETE,
            "/api/cart/remove",
            Some(&cookie),
            Some(json!({ "productId": product.id })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!({ "success": true }));

        let response = send(&app, Method::GET, "/api/cart/get", Some(&cookie), None).await;
        assert_eq!(json_body(response).await, json!([]));
    }

    #[tokio::test]
    async fn test_sync_partial_failure_still_200() {
        let app = app();
        let good = stock_product(&app, 10);
        let broken = stock_product(&app, 10);
        app.repo.fail_writes_for(broken.id);
        let cookie = sign_in(&app).await;

        let response = send(
            &app,
            Method::POST,
            "/api/cart/sync",
            Some(&cookie),
            Some(json!({ "localItems": [
                { "productId": good.id, "quantity": 2 },
                { "productId": broken.id, "quantity": 1 },
            ]})),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await,
            json!({ "success": false, "applied": 1, "failed": [broken.id] })
        );
    }

    #[tokio::test]
    async fn test_product_lookup() {
        let app = app();
        let product = stock_product(&app, 7);

        let response = send(
            &app,
            Method::GET,
            &format!("/api/products/{}", product.id),
            None,
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["stock"], 7);
        assert_eq!(body["name"], "Mink Volume Lashes");

        let response = send(
            &app,
            Method::GET,
            &format!("/api/products/{}", ProductId::generate()),
            None,
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
