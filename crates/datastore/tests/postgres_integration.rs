//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency.
//! Run with:
//!
//! ```bash
//! cargo test -p datastore --test postgres_integration -- --test-threads=1
//! ```

use std::sync::Arc;

use chrono::{Duration, Utc};
use common::{AccountId, CustomerId, Money, ProductId};
use datastore::{
    CatalogStore, CustomerStore, NewCustomer, NewNotification, NewOrder, NewOrderLine, NewProduct,
    NotificationStore, OrderStatus, OrderStore, PostgresStore, StoreError,
};
use sqlx::PgPool;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            // Create a temporary pool just for migrations
            let temp_pool = PgPool::connect(&connection_string).await.unwrap();

            // Run migrations using raw_sql to execute multiple statements
            sqlx::raw_sql(include_str!("../../../migrations/001_initial_schema.sql"))
                .execute(&temp_pool)
                .await
                .unwrap();

            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and cleared tables
async fn get_test_store() -> PostgresStore {
    let info = get_container_info().await;

    // Create a fresh pool for each test to avoid connection issues
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    // Clear tables for test isolation
    sqlx::query(
        "TRUNCATE TABLE order_lines, orders, notifications, customers, products RESTART IDENTITY CASCADE",
    )
    .execute(&pool)
    .await
    .unwrap();

    PostgresStore::new(pool)
}

async fn seed_product(store: &PostgresStore, name: &str, stock: i64, cents: i64) -> ProductId {
    store
        .insert_product(NewProduct {
            name: name.to_string(),
            description: Some("integration test product".to_string()),
            price: Money::from_cents(cents),
            stock,
            category: Some("widgets".to_string()),
        })
        .await
        .unwrap()
        .id
}

async fn seed_customer(store: &PostgresStore, account: i64) -> CustomerId {
    store
        .insert_customer(NewCustomer {
            account_id: AccountId::new(account),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: format!("ada{account}@example.com"),
            address: Some("12 Analytical Row".to_string()),
        })
        .await
        .unwrap()
        .id
}

fn order_of(customer: CustomerId, product: ProductId, quantity: u32, cents: i64) -> NewOrder {
    let line = NewOrderLine {
        product_id: product,
        quantity,
        unit_price: Money::from_cents(cents),
    };
    NewOrder {
        customer_id: customer,
        shipping_address: Some("12 Analytical Row".to_string()),
        total: line.line_total(),
        lines: vec![line],
    }
}

fn notification_at(
    created_at: chrono::DateTime<Utc>,
    customer: Option<CustomerId>,
) -> NewNotification {
    NewNotification {
        kind: "NewOrder".to_string(),
        title: "New Order Received".to_string(),
        message: "Order #1".to_string(),
        order_id: None,
        customer_id: customer,
        customer_email: None,
        created_at,
    }
}

#[tokio::test]
async fn create_order_commits_lines_and_decrements_stock() {
    let store = get_test_store().await;
    let customer = seed_customer(&store, 1).await;
    let product = seed_product(&store, "Widget", 10, 250).await;

    let order = store
        .create_order(order_of(customer, product, 4, 250))
        .await
        .unwrap();

    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.total.cents(), 1000);
    assert_eq!(order.lines.len(), 1);
    assert_eq!(order.lines[0].product_name.as_deref(), Some("Widget"));
    assert_eq!(order.lines[0].line_total.cents(), 1000);

    let product = store.get_product(product).await.unwrap().unwrap();
    assert_eq!(product.stock, 6);
}

#[tokio::test]
async fn conditional_decrement_rejects_oversell() {
    let store = get_test_store().await;
    let customer = seed_customer(&store, 1).await;
    let product = seed_product(&store, "Scarce", 2, 100).await;

    let result = store.create_order(order_of(customer, product, 3, 100)).await;
    assert!(matches!(result, Err(StoreError::StockConflict { .. })));

    // The aborted transaction touched nothing.
    let record = store.get_product(product).await.unwrap().unwrap();
    assert_eq!(record.stock, 2);
    assert!(store.list_orders().await.unwrap().is_empty());
}

#[tokio::test]
async fn concurrent_orders_never_oversell() {
    let store = get_test_store().await;
    let customer = seed_customer(&store, 1).await;
    let product = seed_product(&store, "Scarce", 5, 100).await;

    let a = store.create_order(order_of(customer, product, 3, 100));
    let b = store.create_order(order_of(customer, product, 3, 100));
    let (ra, rb) = tokio::join!(a, b);

    let successes = [&ra, &rb].iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1, "exactly one of the two orders may commit");

    let record = store.get_product(product).await.unwrap().unwrap();
    assert_eq!(record.stock, 2);
}

#[tokio::test]
async fn failed_later_line_rolls_back_earlier_decrements() {
    let store = get_test_store().await;
    let customer = seed_customer(&store, 1).await;
    let plenty = seed_product(&store, "Plenty", 5, 100).await;
    let empty = seed_product(&store, "Empty", 0, 100).await;

    let lines = vec![
        NewOrderLine {
            product_id: plenty,
            quantity: 2,
            unit_price: Money::from_cents(100),
        },
        NewOrderLine {
            product_id: empty,
            quantity: 1,
            unit_price: Money::from_cents(100),
        },
    ];
    let result = store
        .create_order(NewOrder {
            customer_id: customer,
            shipping_address: None,
            total: Money::from_cents(300),
            lines,
        })
        .await;

    assert!(matches!(
        result,
        Err(StoreError::StockConflict { product_id }) if product_id == empty
    ));
    assert_eq!(store.get_product(plenty).await.unwrap().unwrap().stock, 5);
}

#[tokio::test]
async fn order_queries_scope_and_order() {
    let store = get_test_store().await;
    let ada = seed_customer(&store, 1).await;
    let bob = seed_customer(&store, 2).await;
    let product = seed_product(&store, "Widget", 100, 100).await;

    store.create_order(order_of(ada, product, 1, 100)).await.unwrap();
    store.create_order(order_of(bob, product, 1, 100)).await.unwrap();
    store.create_order(order_of(ada, product, 2, 100)).await.unwrap();

    let all = store.list_orders().await.unwrap();
    assert_eq!(all.len(), 3);

    let ada_orders = store.orders_for_customer(ada).await.unwrap();
    assert_eq!(ada_orders.len(), 2);
    assert!(ada_orders.iter().all(|o| o.customer_id == ada));
}

#[tokio::test]
async fn update_status_and_delete_cascade() {
    let store = get_test_store().await;
    let customer = seed_customer(&store, 1).await;
    let product = seed_product(&store, "Widget", 10, 100).await;
    let order = store
        .create_order(order_of(customer, product, 1, 100))
        .await
        .unwrap();

    let updated = store
        .update_status(order.id, OrderStatus::Shipped)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.status, OrderStatus::Shipped);

    assert!(store.delete_order(order.id).await.unwrap());
    assert!(store.get_order(order.id).await.unwrap().is_none());
    assert!(!store.delete_order(order.id).await.unwrap());
}

#[tokio::test]
async fn customer_lookup_by_account_and_id() {
    let store = get_test_store().await;
    let id = seed_customer(&store, 42).await;

    let by_account = store
        .customer_by_account(AccountId::new(42))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(by_account.id, id);
    assert_eq!(by_account.display_name(), "Ada Lovelace");

    assert!(store.customer_by_id(id).await.unwrap().is_some());
    assert!(
        store
            .customer_by_account(AccountId::new(43))
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn notification_lifecycle() {
    let store = get_test_store().await;
    let customer = seed_customer(&store, 1).await;
    let now = Utc::now();

    let older = store
        .create_notification(notification_at(now - Duration::minutes(5), Some(customer)))
        .await
        .unwrap();
    let newer = store
        .create_notification(notification_at(now, Some(customer)))
        .await
        .unwrap();
    assert!(older.sent_at.is_none());
    assert!(!older.is_read);

    // Listings are newest first; the sweep source is oldest first.
    let listed = store.list_notifications().await.unwrap();
    assert_eq!(listed[0].id, newer.id);
    let unsent = store.unsent_notifications().await.unwrap();
    assert_eq!(unsent[0].id, older.id);

    assert!(store.mark_sent(older.id, now).await.unwrap());
    assert_eq!(store.unsent_notifications().await.unwrap().len(), 1);

    assert!(store.mark_read(older.id).await.unwrap());
    // Idempotent.
    assert!(store.mark_read(older.id).await.unwrap());
    assert_eq!(store.unread_count().await.unwrap(), 1);

    let unread = store.unread_notifications(Some(customer)).await.unwrap();
    assert_eq!(unread.len(), 1);
    assert_eq!(unread[0].id, newer.id);

    assert_eq!(store.mark_all_read(customer).await.unwrap(), 1);
    assert_eq!(store.unread_count().await.unwrap(), 0);
}

#[tokio::test]
async fn retention_deletes_only_old_read_rows() {
    let store = get_test_store().await;
    let now = Utc::now();

    let old_read = store
        .create_notification(notification_at(now - Duration::days(31), None))
        .await
        .unwrap();
    let old_unread = store
        .create_notification(notification_at(now - Duration::days(31), None))
        .await
        .unwrap();
    let recent_read = store
        .create_notification(notification_at(now - Duration::days(2), None))
        .await
        .unwrap();
    store.mark_read(old_read.id).await.unwrap();
    store.mark_read(recent_read.id).await.unwrap();

    let deleted = store
        .delete_read_older_than(now - Duration::days(30))
        .await
        .unwrap();
    assert_eq!(deleted, 1);

    assert!(store.get_notification(old_read.id).await.unwrap().is_none());
    assert!(store.get_notification(old_unread.id).await.unwrap().is_some());
    assert!(store.get_notification(recent_read.id).await.unwrap().is_some());
}
