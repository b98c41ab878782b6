//! Durable notifications with live fan-out.
//!
//! Notifications are persisted first and pushed to live subscribers
//! second, so a subscriber that is offline at creation time can still
//! be reached later by the redelivery sweep. [`SubscriptionRegistry`]
//! tracks live WebSocket subscribers by group; [`NotificationService`]
//! owns the persist-then-dispatch pipeline; [`ReconciliationJob`]
//! hosts the periodic sweep and retention cleanup.

pub mod error;
pub mod hub;
pub mod jobs;
pub mod service;
pub mod view;

pub use error::{NotifyError, Result};
pub use hub::{Audience, SubscriptionRegistry};
pub use jobs::{DEFAULT_RETENTION_DAYS, JobSchedule, ReconciliationJob};
pub use service::{IncomingNotification, NotificationService};
pub use view::NotificationView;
