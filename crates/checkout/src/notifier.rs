//! Delivery of order announcements to the notification service.
//!
//! The checkout pipeline treats the notification service as
//! best-effort: [`CheckoutService`](crate::CheckoutService) logs a
//! failed delivery and still returns the committed order. The missed
//! announcement is the notification service's redelivery sweep's
//! problem, not the customer's.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use common::{CustomerId, OrderId};
use serde::Serialize;
use thiserror::Error;

/// Announcement of a freshly committed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderNotice {
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub message: String,
    pub order_id: OrderId,
    pub customer_id: CustomerId,
    pub customer_email: String,
}

/// Errors while handing a notice to the notification service.
#[derive(Debug, Error)]
pub enum SendError {
    #[error("notification service rejected the notice with status {status}")]
    Rejected { status: u16 },

    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}

/// Sink the checkout pipeline hands order announcements to.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn deliver(&self, notice: OrderNotice) -> Result<(), SendError>;
}

/// [`NotificationSender`] that POSTs the notice to the notification
/// service over HTTP.
#[derive(Clone)]
pub struct HttpNotificationSender {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpNotificationSender {
    /// Creates a sender targeting the given notification service base
    /// URL, e.g. `http://localhost:8081`.
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: format!("{}/notifications", base_url.trim_end_matches('/')),
        }
    }
}

#[async_trait]
impl NotificationSender for HttpNotificationSender {
    async fn deliver(&self, notice: OrderNotice) -> Result<(), SendError> {
        let response = self.client.post(&self.endpoint).json(&notice).send().await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(SendError::Rejected {
                status: response.status().as_u16(),
            })
        }
    }
}

/// [`NotificationSender`] that records notices in memory, for tests.
#[derive(Clone, Default)]
pub struct RecordingNotificationSender {
    notices: Arc<tokio::sync::Mutex<Vec<OrderNotice>>>,
    fail: Arc<AtomicBool>,
}

impl RecordingNotificationSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent delivery fail.
    pub fn fail_deliveries(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    /// Returns a copy of every notice delivered so far.
    pub async fn notices(&self) -> Vec<OrderNotice> {
        self.notices.lock().await.clone()
    }
}

#[async_trait]
impl NotificationSender for RecordingNotificationSender {
    async fn deliver(&self, notice: OrderNotice) -> Result<(), SendError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(SendError::Rejected { status: 500 });
        }
        self.notices.lock().await.push(notice);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notice_serializes_with_wire_field_names() {
        let notice = OrderNotice {
            kind: "NewOrder".to_string(),
            title: "New Order Received".to_string(),
            message: "Order #1".to_string(),
            order_id: OrderId::new(1),
            customer_id: CustomerId::new(2),
            customer_email: "ada@example.com".to_string(),
        };
        let json = serde_json::to_value(&notice).unwrap();
        assert_eq!(json["type"], "NewOrder");
        assert_eq!(json["orderId"], 1);
        assert_eq!(json["customerId"], 2);
        assert_eq!(json["customerEmail"], "ada@example.com");
    }

    #[tokio::test]
    async fn recording_sender_captures_and_fails_on_demand() {
        let sender = RecordingNotificationSender::new();
        let notice = OrderNotice {
            kind: "NewOrder".to_string(),
            title: "t".to_string(),
            message: "m".to_string(),
            order_id: OrderId::new(1),
            customer_id: CustomerId::new(1),
            customer_email: "a@b.c".to_string(),
        };
        sender.deliver(notice.clone()).await.unwrap();
        assert_eq!(sender.notices().await, vec![notice.clone()]);

        sender.fail_deliveries();
        assert!(matches!(
            sender.deliver(notice).await,
            Err(SendError::Rejected { status: 500 })
        ));
    }
}
