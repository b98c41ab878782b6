//! Notification service error types.

use common::NotificationId;
use datastore::StoreError;
use thiserror::Error;

/// Errors surfaced by the notification pipeline.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification {id} not found")]
    NotFound { id: NotificationId },

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, NotifyError>;
