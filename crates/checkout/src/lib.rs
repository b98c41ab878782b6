//! Order placement pipeline.
//!
//! [`CheckoutService`] turns an authenticated cart submission into a
//! committed order: it resolves the caller's customer profile,
//! validates the cart against the catalog, commits the order together
//! with the stock decrements, and announces the order to the
//! notification service on a best-effort basis.

pub mod error;
pub mod notifier;
pub mod service;

pub use error::{CheckoutError, Result};
pub use notifier::{
    HttpNotificationSender, NotificationSender, OrderNotice, RecordingNotificationSender, SendError,
};
pub use service::{CartItem, CheckoutService, OrderLineView, OrderView, PlaceOrderRequest};
