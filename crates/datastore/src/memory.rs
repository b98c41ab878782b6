//! In-memory store implementation for testing.
//!
//! Mirrors the PostgreSQL semantics: the order commit holds the write
//! lock for the whole check-and-apply, so concurrent checkouts observe
//! the same conditional-decrement behavior as the SQL `UPDATE … WHERE
//! stock >= n`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{AccountId, CustomerId, NotificationId, OrderId, ProductId};
use tokio::sync::RwLock;

use crate::error::{Result, StoreError};
use crate::records::{
    CustomerRecord, NewCustomer, NewNotification, NewOrder, NewOrderLine, NewProduct,
    NotificationRecord, OrderLineRecord, OrderRecord, OrderStatus, ProductRecord,
};
use crate::store::{CatalogStore, CustomerStore, NotificationStore, OrderStore};

#[derive(Default)]
struct Inner {
    products: HashMap<i64, ProductRecord>,
    customers: HashMap<i64, CustomerRecord>,
    orders: HashMap<i64, OrderRecord>,
    notifications: HashMap<i64, NotificationRecord>,
    next_product_id: i64,
    next_customer_id: i64,
    next_order_id: i64,
    next_line_id: i64,
    next_notification_id: i64,
}

/// In-memory store with the same trait surface as [`crate::PostgresStore`].
#[derive(Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first(records: &mut [NotificationRecord]) {
    records.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then(b.id.as_i64().cmp(&a.id.as_i64()))
    });
}

#[async_trait]
impl CatalogStore for InMemoryStore {
    async fn insert_product(&self, product: NewProduct) -> Result<ProductRecord> {
        let mut inner = self.inner.write().await;
        inner.next_product_id += 1;
        let record = ProductRecord {
            id: ProductId::new(inner.next_product_id),
            name: product.name,
            description: product.description,
            price: product.price,
            stock: product.stock,
            category: product.category,
            created_at: Utc::now(),
        };
        inner.products.insert(record.id.as_i64(), record.clone());
        Ok(record)
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<ProductRecord>> {
        Ok(self.inner.read().await.products.get(&id.as_i64()).cloned())
    }

    async fn list_products(&self) -> Result<Vec<ProductRecord>> {
        let inner = self.inner.read().await;
        let mut products: Vec<_> = inner.products.values().cloned().collect();
        products.sort_by_key(|p| p.id.as_i64());
        Ok(products)
    }
}

#[async_trait]
impl CustomerStore for InMemoryStore {
    async fn insert_customer(&self, customer: NewCustomer) -> Result<CustomerRecord> {
        let mut inner = self.inner.write().await;
        inner.next_customer_id += 1;
        let record = CustomerRecord {
            id: CustomerId::new(inner.next_customer_id),
            account_id: customer.account_id,
            first_name: customer.first_name,
            last_name: customer.last_name,
            email: customer.email,
            address: customer.address,
        };
        inner.customers.insert(record.id.as_i64(), record.clone());
        Ok(record)
    }

    async fn customer_by_account(&self, account_id: AccountId) -> Result<Option<CustomerRecord>> {
        let inner = self.inner.read().await;
        Ok(inner
            .customers
            .values()
            .find(|c| c.account_id == account_id)
            .cloned())
    }

    async fn customer_by_id(&self, id: CustomerId) -> Result<Option<CustomerRecord>> {
        Ok(self.inner.read().await.customers.get(&id.as_i64()).cloned())
    }
}

#[async_trait]
impl OrderStore for InMemoryStore {
    async fn create_order(&self, order: NewOrder) -> Result<OrderRecord> {
        let mut inner = self.inner.write().await;

        // Check every line before touching any stock so a late conflict
        // leaves earlier products untouched, like a rolled-back
        // transaction. A missing product behaves like exhausted stock,
        // matching the zero-affected-rows outcome of the SQL decrement.
        for line in &order.lines {
            let available = inner
                .products
                .get(&line.product_id.as_i64())
                .map(|p| p.stock)
                .unwrap_or(0);
            if available < i64::from(line.quantity) {
                return Err(StoreError::StockConflict {
                    product_id: line.product_id,
                });
            }
        }

        for line in &order.lines {
            if let Some(product) = inner.products.get_mut(&line.product_id.as_i64()) {
                product.stock -= i64::from(line.quantity);
            }
        }

        inner.next_order_id += 1;
        let order_id = OrderId::new(inner.next_order_id);
        let mut lines = Vec::with_capacity(order.lines.len());
        for line in &order.lines {
            inner.next_line_id += 1;
            let product_name = inner
                .products
                .get(&line.product_id.as_i64())
                .map(|p| p.name.clone());
            lines.push(OrderLineRecord {
                id: inner.next_line_id,
                product_id: line.product_id,
                product_name,
                quantity: line.quantity,
                unit_price: line.unit_price,
                line_total: line.line_total(),
            });
        }

        let record = OrderRecord {
            id: order_id,
            customer_id: order.customer_id,
            order_date: Utc::now(),
            total: order.total,
            status: OrderStatus::Pending,
            shipping_address: order.shipping_address,
            lines,
        };
        inner.orders.insert(order_id.as_i64(), record.clone());
        Ok(record)
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<OrderRecord>> {
        Ok(self.inner.read().await.orders.get(&id.as_i64()).cloned())
    }

    async fn list_orders(&self) -> Result<Vec<OrderRecord>> {
        let inner = self.inner.read().await;
        let mut orders: Vec<_> = inner.orders.values().cloned().collect();
        orders.sort_by(|a, b| {
            b.order_date
                .cmp(&a.order_date)
                .then(b.id.as_i64().cmp(&a.id.as_i64()))
        });
        Ok(orders)
    }

    async fn orders_for_customer(&self, customer_id: CustomerId) -> Result<Vec<OrderRecord>> {
        let mut orders = self.list_orders().await?;
        orders.retain(|o| o.customer_id == customer_id);
        Ok(orders)
    }

    async fn update_status(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<Option<OrderRecord>> {
        let mut inner = self.inner.write().await;
        match inner.orders.get_mut(&id.as_i64()) {
            Some(order) => {
                order.status = status;
                Ok(Some(order.clone()))
            }
            None => Ok(None),
        }
    }

    async fn delete_order(&self, id: OrderId) -> Result<bool> {
        Ok(self.inner.write().await.orders.remove(&id.as_i64()).is_some())
    }
}

#[async_trait]
impl NotificationStore for InMemoryStore {
    async fn create_notification(
        &self,
        notification: NewNotification,
    ) -> Result<NotificationRecord> {
        let mut inner = self.inner.write().await;
        inner.next_notification_id += 1;
        let record = NotificationRecord {
            id: NotificationId::new(inner.next_notification_id),
            kind: notification.kind,
            title: notification.title,
            message: notification.message,
            order_id: notification.order_id,
            customer_id: notification.customer_id,
            customer_email: notification.customer_email,
            is_read: false,
            created_at: notification.created_at,
            sent_at: None,
        };
        inner
            .notifications
            .insert(record.id.as_i64(), record.clone());
        Ok(record)
    }

    async fn get_notification(&self, id: NotificationId) -> Result<Option<NotificationRecord>> {
        Ok(self
            .inner
            .read()
            .await
            .notifications
            .get(&id.as_i64())
            .cloned())
    }

    async fn list_notifications(&self) -> Result<Vec<NotificationRecord>> {
        let inner = self.inner.read().await;
        let mut records: Vec<_> = inner.notifications.values().cloned().collect();
        newest_first(&mut records);
        Ok(records)
    }

    async fn notifications_for_customer(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<NotificationRecord>> {
        let mut records = self.list_notifications().await?;
        records.retain(|n| n.customer_id == Some(customer_id));
        Ok(records)
    }

    async fn unread_notifications(
        &self,
        customer_id: Option<CustomerId>,
    ) -> Result<Vec<NotificationRecord>> {
        let mut records = self.list_notifications().await?;
        records.retain(|n| !n.is_read);
        if let Some(customer_id) = customer_id {
            records.retain(|n| n.customer_id == Some(customer_id));
        }
        Ok(records)
    }

    async fn unread_count(&self) -> Result<i64> {
        let inner = self.inner.read().await;
        Ok(inner.notifications.values().filter(|n| !n.is_read).count() as i64)
    }

    async fn mark_read(&self, id: NotificationId) -> Result<bool> {
        let mut inner = self.inner.write().await;
        match inner.notifications.get_mut(&id.as_i64()) {
            Some(notification) => {
                notification.is_read = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn mark_all_read(&self, customer_id: CustomerId) -> Result<u64> {
        let mut inner = self.inner.write().await;
        let mut updated = 0;
        for notification in inner.notifications.values_mut() {
            if notification.customer_id == Some(customer_id) && !notification.is_read {
                notification.is_read = true;
                updated += 1;
            }
        }
        Ok(updated)
    }

    async fn mark_sent(&self, id: NotificationId, at: DateTime<Utc>) -> Result<bool> {
        let mut inner = self.inner.write().await;
        match inner.notifications.get_mut(&id.as_i64()) {
            Some(notification) => {
                notification.sent_at = Some(at);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn unsent_notifications(&self) -> Result<Vec<NotificationRecord>> {
        let inner = self.inner.read().await;
        let mut records: Vec<_> = inner
            .notifications
            .values()
            .filter(|n| n.sent_at.is_none())
            .cloned()
            .collect();
        records.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then(a.id.as_i64().cmp(&b.id.as_i64()))
        });
        Ok(records)
    }

    async fn delete_read_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let mut inner = self.inner.write().await;
        let before = inner.notifications.len();
        inner
            .notifications
            .retain(|_, n| !(n.is_read && n.created_at < cutoff));
        Ok((before - inner.notifications.len()) as u64)
    }
}
