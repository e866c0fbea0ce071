//! Reservation-protocol and catalog scenarios over a real PostgreSQL
//! instance.
//!
//! ```sh
//! DATABASE_URL=postgres://localhost/orderhub_inventory_test cargo test -p inventory-service -- --ignored
//! ```

use inventory_service::db::stock_repo;
use inventory_service::error::InventoryError;
use inventory_service::middleware::jwt_auth::AuthUser;
use inventory_service::models::{Product, ReservationStatus, Stock};
use inventory_service::services::{InventoryService, ProductInput, ReserveItem};
use jwt_verify::Role;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

async fn test_pool() -> PgPool {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for these tests");
    let pool = PgPoolOptions::new()
        .max_connections(8)
        .connect(&url)
        .await
        .expect("failed to connect to test database");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("failed to run migrations");
    pool
}

fn admin() -> AuthUser {
    AuthUser {
        user_id: Uuid::new_v4(),
        role: Role::Admin,
    }
}

fn vendor(user_id: Uuid) -> AuthUser {
    AuthUser {
        user_id,
        role: Role::Vendor,
    }
}

fn product_input(vendor_id: Uuid) -> ProductInput {
    ProductInput {
        vendor_id,
        sku: format!("SKU-{}", Uuid::new_v4()),
        name: "Test product".to_string(),
        description: "".to_string(),
        price_cents: 149_900,
        currency_code: "RUB".to_string(),
        is_active: true,
    }
}

async fn product_with_stock(
    service: &InventoryService,
    available: i32,
) -> (Product, AuthUser) {
    let actor = admin();
    let product = service
        .create_product(&actor, product_input(Uuid::new_v4()))
        .await
        .unwrap();
    service
        .set_stock(&actor, product.id, available)
        .await
        .unwrap();
    (product, actor)
}

async fn stock_of(service: &InventoryService, product_id: Uuid) -> Stock {
    service.get_stock(product_id).await.unwrap()
}

#[tokio::test]
#[ignore = "requires DATABASE_URL with a PostgreSQL instance"]
async fn reserve_moves_available_to_reserved() {
    let pool = test_pool().await;
    let service = InventoryService::new(pool);
    let (product, _) = product_with_stock(&service, 10).await;
    let order_id = Uuid::new_v4();

    let outcome = service
        .reserve(
            order_id,
            &[ReserveItem {
                product_id: product.id,
                quantity: 4,
            }],
        )
        .await
        .unwrap();

    assert_eq!(outcome.ok.len(), 1);
    assert!(outcome.failed.is_empty());

    let stock = stock_of(&service, product.id).await;
    assert_eq!(stock.available, 6);
    assert_eq!(stock.reserved, 4);
    // The transition conserved the total.
    assert_eq!(stock.available + stock.reserved, 10);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL with a PostgreSQL instance"]
async fn out_of_stock_is_reported_inline_and_leaves_stock_untouched() {
    let pool = test_pool().await;
    let service = InventoryService::new(pool);
    let (scarce, _) = product_with_stock(&service, 2).await;
    let (plenty, _) = product_with_stock(&service, 10).await;
    let order_id = Uuid::new_v4();

    let outcome = service
        .reserve(
            order_id,
            &[
                ReserveItem {
                    product_id: plenty.id,
                    quantity: 3,
                },
                ReserveItem {
                    product_id: scarce.id,
                    quantity: 5,
                },
            ],
        )
        .await
        .unwrap();

    assert_eq!(outcome.ok.len(), 1);
    assert_eq!(outcome.failed.len(), 1);
    assert_eq!(outcome.failed[0].reason, "out_of_stock");

    let untouched = stock_of(&service, scarce.id).await;
    assert_eq!(untouched.available, 2);
    assert_eq!(untouched.reserved, 0);

    let held = stock_of(&service, plenty.id).await;
    assert_eq!(held.available, 7);
    assert_eq!(held.reserved, 3);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL with a PostgreSQL instance"]
async fn second_reserve_for_same_order_is_refused() {
    let pool = test_pool().await;
    let service = InventoryService::new(pool);
    let (first, _) = product_with_stock(&service, 5).await;
    let (second, _) = product_with_stock(&service, 5).await;
    let order_id = Uuid::new_v4();

    service
        .reserve(
            order_id,
            &[ReserveItem {
                product_id: first.id,
                quantity: 1,
            }],
        )
        .await
        .unwrap();

    // Even with disjoint items the order-level idempotency guard holds.
    let err = service
        .reserve(
            order_id,
            &[ReserveItem {
                product_id: second.id,
                quantity: 1,
            }],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, InventoryError::ReservationExists));
}

#[tokio::test]
#[ignore = "requires DATABASE_URL with a PostgreSQL instance"]
async fn zero_quantity_aborts_the_whole_reservation() {
    let pool = test_pool().await;
    let service = InventoryService::new(pool);
    let (product, _) = product_with_stock(&service, 5).await;
    let order_id = Uuid::new_v4();

    let err = service
        .reserve(
            order_id,
            &[
                ReserveItem {
                    product_id: product.id,
                    quantity: 2,
                },
                ReserveItem {
                    product_id: product.id,
                    quantity: 0,
                },
            ],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, InventoryError::InvalidQuantity));

    // The aborted transaction left nothing behind.
    let stock = stock_of(&service, product.id).await;
    assert_eq!(stock.available, 5);
    assert_eq!(stock.reserved, 0);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL with a PostgreSQL instance"]
async fn release_returns_stock_to_pre_reserve_state() {
    let pool = test_pool().await;
    let service = InventoryService::new(pool.clone());
    let (p1, _) = product_with_stock(&service, 8).await;
    let (p2, _) = product_with_stock(&service, 6).await;
    let order_id = Uuid::new_v4();

    service
        .reserve(
            order_id,
            &[
                ReserveItem {
                    product_id: p1.id,
                    quantity: 2,
                },
                ReserveItem {
                    product_id: p2.id,
                    quantity: 3,
                },
            ],
        )
        .await
        .unwrap();

    let released = service.release(order_id).await.unwrap();
    assert_eq!(released, 2);

    let s1 = stock_of(&service, p1.id).await;
    assert_eq!((s1.available, s1.reserved), (8, 0));
    let s2 = stock_of(&service, p2.id).await;
    assert_eq!((s2.available, s2.reserved), (6, 0));

    let statuses: Vec<ReservationStatus> = sqlx::query_scalar(
        "SELECT status FROM reservations WHERE order_id = $1",
    )
    .bind(order_id)
    .fetch_all(&pool)
    .await
    .unwrap();
    assert!(statuses.iter().all(|s| *s == ReservationStatus::Released));
}

#[tokio::test]
#[ignore = "requires DATABASE_URL with a PostgreSQL instance"]
async fn confirm_burns_reserve_without_crediting_available() {
    let pool = test_pool().await;
    let service = InventoryService::new(pool);
    let (product, _) = product_with_stock(&service, 10).await;
    let order_id = Uuid::new_v4();

    service
        .reserve(
            order_id,
            &[ReserveItem {
                product_id: product.id,
                quantity: 4,
            }],
        )
        .await
        .unwrap();

    let confirmed = service.confirm(order_id).await.unwrap();
    assert_eq!(confirmed, 1);

    let stock = stock_of(&service, product.id).await;
    assert_eq!(stock.available, 6);
    assert_eq!(stock.reserved, 0);

    // Releasing after consumption refunds nothing: the conditional update
    // requires reserved >= quantity and the reserve is already burned.
    let released = service.release(order_id).await.unwrap();
    assert_eq!(released, 0);

    let stock = stock_of(&service, product.id).await;
    assert_eq!((stock.available, stock.reserved), (6, 0));
}

#[tokio::test]
#[ignore = "requires DATABASE_URL with a PostgreSQL instance"]
async fn concurrent_reserves_serialize_on_the_stock_row() {
    let pool = test_pool().await;
    let service = std::sync::Arc::new(InventoryService::new(pool));
    let (product, _) = product_with_stock(&service, 5).await;

    let a = {
        let service = service.clone();
        let product_id = product.id;
        tokio::spawn(async move {
            service
                .reserve(
                    Uuid::new_v4(),
                    &[ReserveItem {
                        product_id,
                        quantity: 4,
                    }],
                )
                .await
        })
    };
    let b = {
        let service = service.clone();
        let product_id = product.id;
        tokio::spawn(async move {
            service
                .reserve(
                    Uuid::new_v4(),
                    &[ReserveItem {
                        product_id,
                        quantity: 4,
                    }],
                )
                .await
        })
    };

    let (ra, rb) = (a.await.unwrap().unwrap(), b.await.unwrap().unwrap());

    let oks = ra.ok.len() + rb.ok.len();
    let fails = ra.failed.len() + rb.failed.len();
    assert_eq!((oks, fails), (1, 1));
    let failed = if ra.failed.is_empty() { &rb.failed } else { &ra.failed };
    assert_eq!(failed[0].reason, "out_of_stock");

    let stock = stock_of(&service, product.id).await;
    assert_eq!((stock.available, stock.reserved), (1, 4));
}

#[tokio::test]
#[ignore = "requires DATABASE_URL with a PostgreSQL instance"]
async fn try_reserve_beyond_available_leaves_stock_unchanged() {
    let pool = test_pool().await;
    let service = InventoryService::new(pool.clone());
    let (product, _) = product_with_stock(&service, 5).await;

    let reserved = stock_repo::try_reserve(&pool, product.id, 6).await.unwrap();
    assert!(!reserved);

    let stock = stock_of(&service, product.id).await;
    assert_eq!((stock.available, stock.reserved), (5, 0));
}

#[tokio::test]
#[ignore = "requires DATABASE_URL with a PostgreSQL instance"]
async fn adjust_below_zero_reports_no_change() {
    let pool = test_pool().await;
    let service = InventoryService::new(pool);
    let (product, actor) = product_with_stock(&service, 3).await;

    let stock = service.adjust_stock(&actor, product.id, -5).await.unwrap();
    assert_eq!((stock.available, stock.reserved), (3, 0));

    let stock = service.adjust_stock(&actor, product.id, -3).await.unwrap();
    assert_eq!((stock.available, stock.reserved), (0, 0));
}

#[tokio::test]
#[ignore = "requires DATABASE_URL with a PostgreSQL instance"]
async fn vendors_only_manage_their_own_products() {
    let pool = test_pool().await;
    let service = InventoryService::new(pool);

    let owner_id = Uuid::new_v4();
    let owner = vendor(owner_id);
    let product = service
        .create_product(&owner, product_input(owner_id))
        .await
        .unwrap();

    // A different vendor can neither restock nor delete it.
    let intruder = vendor(Uuid::new_v4());
    let err = service.set_stock(&intruder, product.id, 5).await.unwrap_err();
    assert!(matches!(err, InventoryError::Forbidden));
    let err = service.delete_product(&intruder, product.id).await.unwrap_err();
    assert!(matches!(err, InventoryError::Forbidden));

    // A vendor cannot create under someone else's vendor id either.
    let err = service
        .create_product(&intruder, product_input(owner_id))
        .await
        .unwrap_err();
    assert!(matches!(err, InventoryError::Forbidden));

    // An admin can.
    assert!(service.set_stock(&admin(), product.id, 5).await.is_ok());
}

#[tokio::test]
#[ignore = "requires DATABASE_URL with a PostgreSQL instance"]
async fn deleting_a_product_with_reserved_stock_is_refused() {
    let pool = test_pool().await;
    let service = InventoryService::new(pool);
    let (product, actor) = product_with_stock(&service, 5).await;
    let order_id = Uuid::new_v4();

    service
        .reserve(
            order_id,
            &[ReserveItem {
                product_id: product.id,
                quantity: 2,
            }],
        )
        .await
        .unwrap();

    let err = service.delete_product(&actor, product.id).await.unwrap_err();
    assert!(matches!(err, InventoryError::CannotDeleteReserved));

    // Once released, deletion is still blocked by the reservation history
    // rows; that is the restricting foreign key, reported the same way.
    service.release(order_id).await.unwrap();
    let err = service.delete_product(&actor, product.id).await.unwrap_err();
    assert!(matches!(err, InventoryError::CannotDeleteReserved));
}

#[tokio::test]
#[ignore = "requires DATABASE_URL with a PostgreSQL instance"]
async fn duplicate_sku_for_same_vendor_conflicts() {
    let pool = test_pool().await;
    let service = InventoryService::new(pool);

    let vendor_id = Uuid::new_v4();
    let actor = admin();
    let mut input = product_input(vendor_id);
    input.sku = "DUP-SKU".to_string();
    service.create_product(&actor, input.clone()).await.unwrap();

    // Case-insensitive match on the same vendor.
    let mut duplicate = product_input(vendor_id);
    duplicate.sku = "dup-sku".to_string();
    let err = service.create_product(&actor, duplicate).await.unwrap_err();
    assert!(matches!(err, InventoryError::SkuAlreadyExists));

    // Another vendor may reuse the SKU.
    let mut other = product_input(Uuid::new_v4());
    other.sku = "DUP-SKU".to_string();
    assert!(service.create_product(&actor, other).await.is_ok());
}
