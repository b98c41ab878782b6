//! Persist-then-dispatch notification pipeline.

use std::sync::Arc;

use chrono::Utc;
use common::{CustomerId, Identity, NotificationId, OrderId};
use datastore::{CustomerStore, NewNotification, NotificationStore};
use serde::Deserialize;
use tracing::{info, warn};

use crate::error::{NotifyError, Result};
use crate::hub::{Audience, SubscriptionRegistry};
use crate::view::NotificationView;

/// Notification as posted by a producer (the orders service, mostly).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomingNotification {
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub order_id: Option<OrderId>,
    #[serde(default)]
    pub customer_id: Option<CustomerId>,
    #[serde(default)]
    pub customer_email: Option<String>,
    /// Producer-side creation time; defaults to the time of persistence.
    #[serde(default)]
    pub created_at: Option<chrono::DateTime<Utc>>,
}

/// Owns the notification lifecycle: persist, fan out, mark attempted.
pub struct NotificationService<S> {
    store: Arc<S>,
    registry: Arc<SubscriptionRegistry>,
}

impl<S> NotificationService<S>
where
    S: NotificationStore + CustomerStore,
{
    pub fn new(store: Arc<S>, registry: Arc<SubscriptionRegistry>) -> Self {
        Self { store, registry }
    }

    pub fn registry(&self) -> &Arc<SubscriptionRegistry> {
        &self.registry
    }

    /// Persists a notification, fans it out to live subscribers, and
    /// stamps `sent_at`.
    ///
    /// The stamp records that a dispatch was attempted, not that anyone
    /// received it; zero live subscribers is still a successful create.
    /// If stamping fails the notification stays unstamped and the
    /// redelivery sweep will push it again.
    #[tracing::instrument(skip(self, incoming), fields(kind = %incoming.kind))]
    pub async fn create(&self, incoming: IncomingNotification) -> Result<NotificationView> {
        let record = self
            .store
            .create_notification(NewNotification {
                kind: incoming.kind,
                title: incoming.title,
                message: incoming.message,
                order_id: incoming.order_id,
                customer_id: incoming.customer_id,
                customer_email: incoming.customer_email,
                created_at: incoming.created_at.unwrap_or_else(Utc::now),
            })
            .await?;

        let mut view = NotificationView::from(record);
        let delivered = self.registry.broadcast(&view);
        info!(id = %view.id, delivered, "notification dispatched");
        metrics::counter!("notify_created_total").increment(1);

        let sent_at = Utc::now();
        if self.store.mark_sent(view.id, sent_at).await? {
            view.sent_at = Some(sent_at);
        } else {
            warn!(id = %view.id, "notification vanished before sent stamp");
        }
        Ok(view)
    }

    /// Fetches one notification.
    pub async fn get(&self, id: NotificationId) -> Result<NotificationView> {
        self.store
            .get_notification(id)
            .await?
            .map(NotificationView::from)
            .ok_or(NotifyError::NotFound { id })
    }

    /// Lists notifications for the caller: everything for admins, own
    /// notifications for customers. A customer without a profile has
    /// nothing addressed to them.
    pub async fn list(&self, identity: &Identity) -> Result<Vec<NotificationView>> {
        let records = if identity.is_admin() {
            self.store.list_notifications().await?
        } else {
            match self.store.customer_by_account(identity.account_id).await? {
                Some(customer) => self.store.notifications_for_customer(customer.id).await?,
                None => Vec::new(),
            }
        };
        Ok(records.into_iter().map(NotificationView::from).collect())
    }

    /// Lists unread notifications for the caller, scoped like [`Self::list`].
    pub async fn unread(&self, identity: &Identity) -> Result<Vec<NotificationView>> {
        let records = if identity.is_admin() {
            self.store.unread_notifications(None).await?
        } else {
            match self.store.customer_by_account(identity.account_id).await? {
                Some(customer) => self.store.unread_notifications(Some(customer.id)).await?,
                None => Vec::new(),
            }
        };
        Ok(records.into_iter().map(NotificationView::from).collect())
    }

    /// Lists unread notifications with an explicit customer filter,
    /// for admin queries.
    pub async fn unread_for(&self, customer: Option<CustomerId>) -> Result<Vec<NotificationView>> {
        let records = self.store.unread_notifications(customer).await?;
        Ok(records.into_iter().map(NotificationView::from).collect())
    }

    /// Lists notifications addressed to one customer, newest first.
    pub async fn list_for_customer(&self, customer: CustomerId) -> Result<Vec<NotificationView>> {
        let records = self.store.notifications_for_customer(customer).await?;
        Ok(records.into_iter().map(NotificationView::from).collect())
    }

    /// Total unread count across all notifications.
    pub async fn unread_count(&self) -> Result<i64> {
        Ok(self.store.unread_count().await?)
    }

    /// Marks one notification read. Marking an already-read
    /// notification succeeds and changes nothing.
    pub async fn mark_read(&self, id: NotificationId) -> Result<()> {
        if self.store.mark_read(id).await? {
            Ok(())
        } else {
            Err(NotifyError::NotFound { id })
        }
    }

    /// Marks every notification addressed to one customer read.
    /// Returns the number of notifications that changed state.
    pub async fn mark_all_read_for(&self, customer: CustomerId) -> Result<u64> {
        Ok(self.store.mark_all_read(customer).await?)
    }

    /// Resolves the group a connecting subscriber belongs in.
    pub async fn audience_for(&self, identity: &Identity) -> Result<Audience> {
        if identity.is_admin() {
            return Ok(Audience::Admins);
        }
        match self.store.customer_by_account(identity.account_id).await? {
            Some(customer) => Ok(Audience::Customer(customer.id)),
            None => Ok(Audience::Others),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{AccountId, ConnectionId, Role};
    use datastore::{InMemoryStore, NewCustomer};
    use tokio::sync::mpsc;

    fn incoming(customer: Option<CustomerId>) -> IncomingNotification {
        IncomingNotification {
            kind: "NewOrder".to_string(),
            title: "New Order Received".to_string(),
            message: "Order #1".to_string(),
            order_id: Some(OrderId::new(1)),
            customer_id: customer,
            customer_email: None,
            created_at: None,
        }
    }

    fn service() -> NotificationService<InMemoryStore> {
        NotificationService::new(
            Arc::new(InMemoryStore::new()),
            Arc::new(SubscriptionRegistry::new()),
        )
    }

    async fn seed_customer(service: &NotificationService<InMemoryStore>, account: i64) -> CustomerId {
        service
            .store
            .insert_customer(NewCustomer {
                account_id: AccountId::new(account),
                first_name: "Ada".to_string(),
                last_name: "Lovelace".to_string(),
                email: "ada@example.com".to_string(),
                address: None,
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn create_persists_dispatches_and_stamps() {
        let service = service();
        let customer = seed_customer(&service, 1).await;
        let (tx, mut rx) = mpsc::channel(8);
        service
            .registry()
            .join("customer:1", ConnectionId::new(), tx);

        let view = service.create(incoming(Some(customer))).await.unwrap();
        assert!(view.sent_at.is_some());
        assert!(!view.is_read);

        let pushed = rx.try_recv().unwrap();
        assert_eq!(pushed.id, view.id);
        // The push happens before the stamp, so the live copy is unsent.
        assert!(pushed.sent_at.is_none());

        let stored = service.get(view.id).await.unwrap();
        assert_eq!(stored.sent_at, view.sent_at);
    }

    #[tokio::test]
    async fn create_with_no_subscribers_still_succeeds() {
        let service = service();
        let view = service.create(incoming(None)).await.unwrap();
        assert!(view.sent_at.is_some());
        assert_eq!(service.unread_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn listing_scopes_by_identity() {
        let service = service();
        let ada = seed_customer(&service, 1).await;
        let bob = seed_customer(&service, 2).await;
        service.create(incoming(Some(ada))).await.unwrap();
        service.create(incoming(Some(bob))).await.unwrap();
        service.create(incoming(None)).await.unwrap();

        let admin = Identity::new(AccountId::new(99), Role::Admin);
        assert_eq!(service.list(&admin).await.unwrap().len(), 3);

        let customer = Identity::new(AccountId::new(1), Role::Customer);
        let mine = service.list(&customer).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].customer_id, Some(ada));

        let profileless = Identity::new(AccountId::new(50), Role::Customer);
        assert!(service.list(&profileless).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn mark_read_paths() {
        let service = service();
        let ada = seed_customer(&service, 1).await;
        let first = service.create(incoming(Some(ada))).await.unwrap();
        service.create(incoming(Some(ada))).await.unwrap();

        service.mark_read(first.id).await.unwrap();
        // Idempotent.
        service.mark_read(first.id).await.unwrap();
        assert!(matches!(
            service.mark_read(NotificationId::new(404)).await,
            Err(NotifyError::NotFound { .. })
        ));

        let customer = Identity::new(AccountId::new(1), Role::Customer);
        assert_eq!(service.unread(&customer).await.unwrap().len(), 1);
        assert_eq!(service.mark_all_read_for(ada).await.unwrap(), 1);
        assert!(service.unread(&customer).await.unwrap().is_empty());
        assert_eq!(service.mark_all_read_for(CustomerId::new(50)).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn audience_resolution() {
        let service = service();
        let ada = seed_customer(&service, 1).await;

        let admin = Identity::new(AccountId::new(99), Role::Admin);
        assert_eq!(service.audience_for(&admin).await.unwrap(), Audience::Admins);

        let customer = Identity::new(AccountId::new(1), Role::Customer);
        assert_eq!(
            service.audience_for(&customer).await.unwrap(),
            Audience::Customer(ada)
        );

        let profileless = Identity::new(AccountId::new(50), Role::Customer);
        assert_eq!(
            service.audience_for(&profileless).await.unwrap(),
            Audience::Others
        );
    }
}
