//! Record types stored and returned by the store traits.

use chrono::{DateTime, Utc};
use common::{CustomerId, Money, NotificationId, OrderId, ProductId};
use serde::{Deserialize, Serialize};

/// Lifecycle status of an order.
///
/// An order is created as `Pending`; every later transition happens
/// through the administrative status endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// Returns the status name as stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Confirmed => "Confirmed",
            OrderStatus::Shipped => "Shipped",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Cancelled => "Cancelled",
        }
    }

    /// Parses a status name, case-insensitively.
    pub fn parse(s: &str) -> Option<OrderStatus> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Some(OrderStatus::Pending),
            "confirmed" => Some(OrderStatus::Confirmed),
            "shipped" => Some(OrderStatus::Shipped),
            "delivered" => Some(OrderStatus::Delivered),
            "cancelled" => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A catalog product with its live stock count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductRecord {
    pub id: ProductId,
    pub name: String,
    pub description: Option<String>,
    pub price: Money,
    pub stock: i64,
    pub category: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields for inserting a product (administrative/seed path).
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub description: Option<String>,
    pub price: Money,
    pub stock: i64,
    pub category: Option<String>,
}

/// A customer profile linked one-to-one to an external account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerRecord {
    pub id: CustomerId,
    pub account_id: common::AccountId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub address: Option<String>,
}

impl CustomerRecord {
    /// Display name used in notification messages and order projections.
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Fields for inserting a customer profile.
#[derive(Debug, Clone)]
pub struct NewCustomer {
    pub account_id: common::AccountId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub address: Option<String>,
}

/// A persisted order with its lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRecord {
    pub id: OrderId,
    pub customer_id: CustomerId,
    pub order_date: DateTime<Utc>,
    pub total: Money,
    pub status: OrderStatus,
    pub shipping_address: Option<String>,
    pub lines: Vec<OrderLineRecord>,
}

/// A single line of a persisted order.
///
/// `unit_price` is the price captured at purchase time, not a live
/// reference to the current product price.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderLineRecord {
    pub id: i64,
    pub product_id: ProductId,
    pub product_name: Option<String>,
    pub quantity: u32,
    pub unit_price: Money,
    pub line_total: Money,
}

/// An order ready to commit: lines with captured prices and the
/// precomputed total. The store decrements stock and inserts the order
/// and its lines in one transaction.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub customer_id: CustomerId,
    pub shipping_address: Option<String>,
    pub total: Money,
    pub lines: Vec<NewOrderLine>,
}

/// One line of a [`NewOrder`].
#[derive(Debug, Clone)]
pub struct NewOrderLine {
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: Money,
}

impl NewOrderLine {
    /// Line total derived from the captured unit price.
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}

/// A stored notification.
///
/// `sent_at` marks that a dispatch was *attempted*, not that any
/// subscriber confirmed receipt; it stays NULL until the dispatcher or
/// the redelivery sweep has pushed the row toward its audience.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationRecord {
    pub id: NotificationId,
    pub kind: String,
    pub title: String,
    pub message: String,
    pub order_id: Option<OrderId>,
    pub customer_id: Option<CustomerId>,
    pub customer_email: Option<String>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
}

/// Fields for persisting a notification.
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub kind: String,
    pub title: String,
    pub message: String,
    pub order_id: Option<OrderId>,
    pub customer_id: Option<CustomerId>,
    pub customer_email: Option<String>,
    pub created_at: DateTime<Utc>,
}
