//! Background reconciliation.
//!
//! Two periodic jobs keep the notification table honest: the
//! redelivery sweep re-dispatches notifications whose dispatch was
//! never attempted (the producer crashed, or the stamp failed), and
//! the retention cleanup drops read notifications past the retention
//! window. Both are safe to run concurrently with live traffic.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use datastore::NotificationStore;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use crate::error::Result;
use crate::hub::SubscriptionRegistry;
use crate::view::NotificationView;

/// How long reconciliation keeps read notifications around, in days.
pub const DEFAULT_RETENTION_DAYS: i64 = 30;

/// Cap on how long one sweep item may take before the sweep moves on.
const DEFAULT_ITEM_TIMEOUT: Duration = Duration::from_secs(5);

/// Intervals for the periodic jobs.
#[derive(Debug, Clone, Copy)]
pub struct JobSchedule {
    pub sweep_every: Duration,
    pub cleanup_every: Duration,
}

impl Default for JobSchedule {
    fn default() -> Self {
        Self {
            sweep_every: Duration::from_secs(60),
            cleanup_every: Duration::from_secs(86_400),
        }
    }
}

/// Hosts the redelivery sweep and the retention cleanup.
pub struct ReconciliationJob<S> {
    store: Arc<S>,
    registry: Arc<SubscriptionRegistry>,
    retention_days: i64,
    item_timeout: Duration,
}

impl<S> ReconciliationJob<S>
where
    S: NotificationStore + 'static,
{
    pub fn new(store: Arc<S>, registry: Arc<SubscriptionRegistry>) -> Self {
        Self {
            store,
            registry,
            retention_days: DEFAULT_RETENTION_DAYS,
            item_timeout: DEFAULT_ITEM_TIMEOUT,
        }
    }

    /// Overrides how long read notifications are retained.
    pub fn with_retention_days(mut self, days: i64) -> Self {
        self.retention_days = days;
        self
    }

    /// Overrides the per-item cap on sweep redelivery time.
    pub fn with_item_timeout(mut self, timeout: Duration) -> Self {
        self.item_timeout = timeout;
        self
    }

    /// Re-dispatches every notification without a `sent_at` stamp,
    /// oldest first. One slow or failing item is logged and skipped;
    /// the sweep keeps going. Returns the number of notifications
    /// stamped this pass.
    #[tracing::instrument(skip(self))]
    pub async fn run_redelivery_sweep(&self) -> Result<u64> {
        let unsent = self.store.unsent_notifications().await?;
        let mut swept = 0u64;
        for record in unsent {
            let id = record.id;
            let view = NotificationView::from(record);
            let attempt = async {
                self.registry.broadcast(&view);
                self.store.mark_sent(id, Utc::now()).await
            };
            match tokio::time::timeout(self.item_timeout, attempt).await {
                Ok(Ok(true)) => swept += 1,
                // Deleted out from under the sweep; nothing to stamp.
                Ok(Ok(false)) => {}
                Ok(Err(err)) => warn!(%id, error = %err, "redelivery failed"),
                Err(_) => warn!(%id, "redelivery timed out"),
            }
        }
        if swept > 0 {
            info!(swept, "redelivery sweep stamped notifications");
        }
        metrics::counter!("notify_sweep_redelivered_total").increment(swept);
        Ok(swept)
    }

    /// Deletes read notifications older than the retention window.
    /// Unread notifications are kept regardless of age.
    #[tracing::instrument(skip(self))]
    pub async fn run_retention_cleanup(&self) -> Result<u64> {
        let cutoff = Utc::now() - chrono::Duration::days(self.retention_days);
        let deleted = self.store.delete_read_older_than(cutoff).await?;
        if deleted > 0 {
            info!(deleted, "retention cleanup removed notifications");
        }
        metrics::counter!("notify_retention_deleted_total").increment(deleted);
        Ok(deleted)
    }

    /// Spawns both jobs on the given schedule. The tasks run for the
    /// life of the process.
    pub fn spawn(self: Arc<Self>, schedule: JobSchedule) {
        let job = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(schedule.sweep_every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(err) = job.run_redelivery_sweep().await {
                    error!(error = %err, "redelivery sweep failed");
                }
            }
        });
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(schedule.cleanup_every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(err) = self.run_retention_cleanup().await {
                    error!(error = %err, "retention cleanup failed");
                }
            }
        });
    }
}
