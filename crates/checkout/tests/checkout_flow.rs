//! End-to-end checkout pipeline tests over the in-memory store.

use std::sync::Arc;

use checkout::{
    CartItem, CheckoutError, CheckoutService, PlaceOrderRequest, RecordingNotificationSender,
};
use common::{AccountId, Identity, Money, ProductId, Role};
use datastore::{CatalogStore, CustomerStore, InMemoryStore, NewCustomer, NewProduct};

struct Shop {
    service: Arc<CheckoutService<InMemoryStore, RecordingNotificationSender>>,
    store: Arc<InMemoryStore>,
    notifier: Arc<RecordingNotificationSender>,
}

async fn shop() -> Shop {
    let store = Arc::new(InMemoryStore::new());
    let notifier = Arc::new(RecordingNotificationSender::new());
    Shop {
        service: Arc::new(CheckoutService::new(store.clone(), notifier.clone())),
        store,
        notifier,
    }
}

async fn seed_customer(store: &InMemoryStore, account: i64, first: &str) {
    store
        .insert_customer(NewCustomer {
            account_id: AccountId::new(account),
            first_name: first.to_string(),
            last_name: "Example".to_string(),
            email: format!("{}@example.com", first.to_lowercase()),
            address: None,
        })
        .await
        .unwrap();
}

async fn seed_product(store: &InMemoryStore, name: &str, stock: i64, cents: i64) -> ProductId {
    store
        .insert_product(NewProduct {
            name: name.to_string(),
            description: None,
            price: Money::from_cents(cents),
            stock,
            category: None,
        })
        .await
        .unwrap()
        .id
}

fn cart(items: Vec<(ProductId, u32)>) -> PlaceOrderRequest {
    PlaceOrderRequest {
        shipping_address: Some("1 Test Lane".to_string()),
        order_details: items
            .into_iter()
            .map(|(product_id, quantity)| CartItem {
                product_id,
                quantity,
            })
            .collect(),
    }
}

#[tokio::test]
async fn multi_line_order_totals_are_the_sum_of_line_totals() {
    let shop = shop().await;
    seed_customer(&shop.store, 1, "Ada").await;
    let widget = seed_product(&shop.store, "Widget", 10, 250).await;
    let gadget = seed_product(&shop.store, "Gadget", 10, 1099).await;

    let order = shop
        .service
        .place_order(AccountId::new(1), cart(vec![(widget, 2), (gadget, 3)]))
        .await
        .unwrap();

    let line_sum: i64 = order.order_details.iter().map(|l| l.line_total_cents).sum();
    assert_eq!(order.total_cents, line_sum);
    assert_eq!(order.total_cents, 2 * 250 + 3 * 1099);
}

#[tokio::test]
async fn two_concurrent_orders_for_scarce_stock() {
    // Stock 5, two concurrent orders of 3: exactly one commits and the
    // shelf ends at 2.
    let shop = shop().await;
    seed_customer(&shop.store, 1, "Ada").await;
    seed_customer(&shop.store, 2, "Bob").await;
    let scarce = seed_product(&shop.store, "Scarce", 5, 100).await;

    let s1 = shop.service.clone();
    let s2 = shop.service.clone();
    let (ra, rb) = tokio::join!(
        s1.place_order(AccountId::new(1), cart(vec![(scarce, 3)])),
        s2.place_order(AccountId::new(2), cart(vec![(scarce, 3)])),
    );

    let successes = [&ra, &rb].iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1);
    let loser = if ra.is_err() { ra } else { rb };
    assert!(matches!(
        loser,
        Err(CheckoutError::InsufficientStock { .. })
    ));

    let stock = shop.store.get_product(scarce).await.unwrap().unwrap().stock;
    assert_eq!(stock, 2);

    // Only the committed order was announced.
    assert_eq!(shop.notifier.notices().await.len(), 1);
}

#[tokio::test]
async fn placement_failures_leave_no_trace() {
    let shop = shop().await;
    seed_customer(&shop.store, 1, "Ada").await;
    let widget = seed_product(&shop.store, "Widget", 1, 100).await;

    let err = shop
        .service
        .place_order(AccountId::new(1), cart(vec![(widget, 5)]))
        .await
        .unwrap_err();
    assert!(matches!(err, CheckoutError::InsufficientStock { .. }));

    let admin = Identity::new(AccountId::new(99), Role::Admin);
    assert!(shop.service.list_orders(&admin).await.unwrap().is_empty());
    assert!(shop.notifier.notices().await.is_empty());
    assert_eq!(
        shop.store.get_product(widget).await.unwrap().unwrap().stock,
        1
    );
}
