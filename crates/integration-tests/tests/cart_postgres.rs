//! Cart service against a real `PostgreSQL` database.
//!
//! These tests require a migrated database (`lashaz-cli migrate`) reachable
//! through `STOREFRONT_DATABASE_URL`.
//!
//! Run with: cargo test -p lashaz-integration-tests -- --ignored

use std::sync::Arc;

use lashaz_core::{AccountId, CartError};
use lashaz_integration_tests::{connect_database, insert_product};
use lashaz_storefront::db::{PgCartRepository, PgProductCatalog};
use lashaz_storefront::error::AppError;
use lashaz_storefront::services::CartService;
use sqlx::PgPool;

async fn service() -> (CartService, PgPool) {
    let pool = connect_database()
        .await
        .expect("Failed to connect to test database");
    let service = CartService::new(
        Arc::new(PgCartRepository::new(pool.clone())),
        Arc::new(PgProductCatalog::new(pool.clone())),
    );
    (service, pool)
}

#[tokio::test]
#[ignore = "Requires migrated PostgreSQL database"]
async fn test_add_accumulates_and_respects_stock() {
    let (service, pool) = service().await;
    let product = insert_product(&pool, "Classic Lash Strip", 1250, 5)
        .await
        .expect("Failed to insert product");
    let account = AccountId::generate();

    service.add(account, product, Some(2)).await.expect("add 2");
    let line = service.add(account, product, Some(3)).await.expect("add 3");
    assert_eq!(line.quantity.get(), 5);

    let err = service
        .add(account, product, None)
        .await
        .expect_err("stock exhausted");
    assert!(matches!(
        err,
        AppError::Cart(CartError::InsufficientStock { available: 0 })
    ));

    let lines = service.get_cart(account).await.expect("get cart");
    assert_eq!(lines.len(), 1);
    assert_eq!(lines.first().map(|l| l.quantity.get()), Some(5));
}

#[tokio::test]
#[ignore = "Requires migrated PostgreSQL database"]
async fn test_concurrent_adds_lose_no_update() {
    let (service, pool) = service().await;
    let product = insert_product(&pool, "Lash Glue", 899, 100)
        .await
        .expect("Failed to insert product");
    let account = AccountId::generate();
    let service = Arc::new(service);

    let tasks: Vec<_> = (0..10)
        .map(|_| {
            let service = Arc::clone(&service);
            tokio::spawn(async move { service.add(account, product, Some(1)).await })
        })
        .collect();
    for task in tasks {
        task.await.expect("task panicked").expect("add failed");
    }

    let lines = service.get_cart(account).await.expect("get cart");
    assert_eq!(lines.first().map(|l| l.quantity.get()), Some(10));
}

#[tokio::test]
#[ignore = "Requires migrated PostgreSQL database"]
async fn test_concurrent_adds_never_oversell() {
    let (service, pool) = service().await;
    let product = insert_product(&pool, "Lash Tweezers", 1500, 3)
        .await
        .expect("Failed to insert product");
    let account = AccountId::generate();
    let service = Arc::new(service);

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let service = Arc::clone(&service);
            tokio::spawn(async move { service.add(account, product, Some(1)).await })
        })
        .collect();
    let mut succeeded = 0;
    for task in tasks {
        if task.await.expect("task panicked").is_ok() {
            succeeded += 1;
        }
    }

    assert_eq!(succeeded, 3);
    let lines = service.get_cart(account).await.expect("get cart");
    assert_eq!(lines.first().map(|l| l.quantity.get()), Some(3));
}

#[tokio::test]
#[ignore = "Requires migrated PostgreSQL database"]
async fn test_sync_overwrites_and_is_idempotent() {
    let (service, pool) = service().await;
    let a = insert_product(&pool, "Volume Lashes", 3450, 10)
        .await
        .expect("Failed to insert product");
    let b = insert_product(&pool, "Lash Serum", 2200, 10)
        .await
        .expect("Failed to insert product");
    let account = AccountId::generate();

    service.add(account, a, Some(1)).await.expect("seed a");
    service.add(account, b, Some(4)).await.expect("seed b");

    for _ in 0..2 {
        let report = service.sync(account, &[(a, 2)]).await.expect("sync");
        assert!(report.is_complete());
        assert_eq!(report.applied, 1);
    }

    let lines = service.get_cart(account).await.expect("get cart");
    let quantity_of = |id| {
        lines
            .iter()
            .find(|l| l.product_id == id)
            .map(|l| l.quantity.get())
    };
    assert_eq!(quantity_of(a), Some(2));
    assert_eq!(quantity_of(b), Some(4));
}

#[tokio::test]
#[ignore = "Requires migrated PostgreSQL database"]
async fn test_remove_then_set_quantity_is_line_not_found() {
    let (service, pool) = service().await;
    let product = insert_product(&pool, "Lash Brush", 350, 10)
        .await
        .expect("Failed to insert product");
    let account = AccountId::generate();

    service.add(account, product, None).await.expect("add");
    service.remove(account, product).await.expect("remove");
    service.remove(account, product).await.expect("remove is idempotent");

    let err = service
        .set_quantity(account, product, 2)
        .await
        .expect_err("line is gone");
    assert!(matches!(err, AppError::Cart(CartError::LineNotFound(id)) if id == product));
}
