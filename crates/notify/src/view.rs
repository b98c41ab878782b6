//! Wire view of a stored notification.

use chrono::{DateTime, Utc};
use common::{CustomerId, NotificationId, OrderId};
use datastore::NotificationRecord;
use serde::Serialize;

/// Notification as sent to HTTP and WebSocket clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationView {
    pub id: NotificationId,
    #[serde(rename = "type")]
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

impl From<NotificationRecord> for NotificationView {
    fn from(record: NotificationRecord) -> Self {
        Self {
            id: record.id,
            kind: record.kind,
            title: record.title,
            message: record.message,
            order_id: record.order_id,
            customer_id: record.customer_id,
            customer_email: record.customer_email,
            is_read: record.is_read,
            created_at: record.created_at,
            sent_at: record.sent_at,
        }
    }
}
