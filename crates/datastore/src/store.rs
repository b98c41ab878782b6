//! Storage traits implemented by the PostgreSQL and in-memory stores.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{AccountId, CustomerId, NotificationId, OrderId, ProductId};

use crate::Result;
use crate::records::{
    CustomerRecord, NewCustomer, NewNotification, NewOrder, NewProduct, NotificationRecord,
    OrderRecord, OrderStatus, ProductRecord,
};

/// Catalog reads and the administrative insert path.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Inserts a product and returns it with its generated id.
    async fn insert_product(&self, product: NewProduct) -> Result<ProductRecord>;

    /// Fetches a product by id.
    async fn get_product(&self, id: ProductId) -> Result<Option<ProductRecord>>;

    /// Lists the whole catalog.
    async fn list_products(&self) -> Result<Vec<ProductRecord>>;
}

/// Customer profile lookups.
#[async_trait]
pub trait CustomerStore: Send + Sync {
    /// Inserts a customer profile and returns it with its generated id.
    async fn insert_customer(&self, customer: NewCustomer) -> Result<CustomerRecord>;

    /// Resolves the profile linked to an external account, if any.
    async fn customer_by_account(&self, account_id: AccountId) -> Result<Option<CustomerRecord>>;

    /// Fetches a customer profile by id.
    async fn customer_by_id(&self, id: CustomerId) -> Result<Option<CustomerRecord>>;
}

/// Order persistence.
///
/// [`create_order`](OrderStore::create_order) is the atomic commit of
/// the checkout path: every line's conditional stock decrement and the
/// order + line inserts succeed together or not at all. A decrement
/// that affects zero rows aborts the transaction with
/// [`StoreError::StockConflict`](crate::StoreError::StockConflict).
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Commits an order atomically, decrementing stock per line.
    async fn create_order(&self, order: NewOrder) -> Result<OrderRecord>;

    /// Fetches an order with its lines and resolved product names.
    async fn get_order(&self, id: OrderId) -> Result<Option<OrderRecord>>;

    /// Lists all orders, newest first.
    async fn list_orders(&self) -> Result<Vec<OrderRecord>>;

    /// Lists a customer's orders, newest first.
    async fn orders_for_customer(&self, customer_id: CustomerId) -> Result<Vec<OrderRecord>>;

    /// Updates an order's status. Returns `None` for an unknown id.
    async fn update_status(&self, id: OrderId, status: OrderStatus)
    -> Result<Option<OrderRecord>>;

    /// Deletes an order and its lines. Returns false for an unknown id.
    async fn delete_order(&self, id: OrderId) -> Result<bool>;
}

/// Durable notification records.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Persists a notification with `is_read = false` and `sent_at` unset.
    async fn create_notification(
        &self,
        notification: NewNotification,
    ) -> Result<NotificationRecord>;

    /// Fetches a notification by id.
    async fn get_notification(&self, id: NotificationId) -> Result<Option<NotificationRecord>>;

    /// Lists all notifications, newest first.
    async fn list_notifications(&self) -> Result<Vec<NotificationRecord>>;

    /// Lists a customer's notifications, newest first.
    async fn notifications_for_customer(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<NotificationRecord>>;

    /// Lists unread notifications, optionally scoped to a customer,
    /// newest first.
    async fn unread_notifications(
        &self,
        customer_id: Option<CustomerId>,
    ) -> Result<Vec<NotificationRecord>>;

    /// Counts unread notifications across all customers.
    async fn unread_count(&self) -> Result<i64>;

    /// Sets the read flag. Returns false for an unknown id; setting an
    /// already-read row is a successful no-op.
    async fn mark_read(&self, id: NotificationId) -> Result<bool>;

    /// Sets the read flag on every unread notification for a customer.
    /// Returns the number of rows updated.
    async fn mark_all_read(&self, customer_id: CustomerId) -> Result<u64>;

    /// Records a dispatch attempt. Returns false for an unknown id.
    async fn mark_sent(&self, id: NotificationId, at: DateTime<Utc>) -> Result<bool>;

    /// Lists notifications that were never dispatched (`sent_at` NULL),
    /// oldest first so the sweep re-drives in creation order.
    async fn unsent_notifications(&self) -> Result<Vec<NotificationRecord>>;

    /// Deletes read notifications created before the cutoff. Returns the
    /// number of rows deleted.
    async fn delete_read_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64>;
}
