//! Live subscriber registry.
//!
//! Subscribers are WebSocket connections grouped by audience. A
//! connection always sits in the group its identity resolves to and
//! may additionally join or leave extra groups over the socket.
//! Delivery is best-effort: a full or closed outbound channel never
//! blocks the publisher.

use common::{ConnectionId, CustomerId};
use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::view::NotificationView;

/// Reserved group names.
pub const ADMIN_GROUP: &str = "admin";
pub const OTHERS_GROUP: &str = "others";

/// Who a connection subscribes as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    /// A customer with a profile; sees notifications addressed to them.
    Customer(CustomerId),
    /// Back-office users; see every notification.
    Admins,
    /// Authenticated accounts without a customer profile.
    Others,
}

impl Audience {
    /// The group a subscriber of this audience is placed in.
    pub fn group_name(&self) -> String {
        match self {
            Audience::Customer(id) => format!("customer:{id}"),
            Audience::Admins => ADMIN_GROUP.to_string(),
            Audience::Others => OTHERS_GROUP.to_string(),
        }
    }
}

/// Registry of live subscriber connections, keyed by group name.
#[derive(Default)]
pub struct SubscriptionRegistry {
    groups: DashMap<String, DashMap<ConnectionId, mpsc::Sender<NotificationView>>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a connection to a group. Joining a group the connection is
    /// already in replaces the stored sender, so the call is idempotent.
    pub fn join(&self, group: &str, conn: ConnectionId, tx: mpsc::Sender<NotificationView>) {
        self.groups
            .entry(group.to_string())
            .or_default()
            .insert(conn, tx);
        debug!(%conn, group, "subscriber joined group");
    }

    /// Removes a connection from a group. Leaving a group the
    /// connection is not in is a no-op.
    pub fn leave(&self, group: &str, conn: ConnectionId) {
        let emptied = match self.groups.get(group) {
            Some(members) => {
                members.remove(&conn);
                members.is_empty()
            }
            None => false,
        };
        if emptied {
            self.groups.remove_if(group, |_, members| members.is_empty());
        }
        debug!(%conn, group, "subscriber left group");
    }

    /// Removes a connection from every group it is in.
    pub fn disconnect(&self, conn: ConnectionId) {
        let mut emptied = Vec::new();
        for entry in self.groups.iter() {
            entry.value().remove(&conn);
            if entry.value().is_empty() {
                emptied.push(entry.key().clone());
            }
        }
        for group in emptied {
            self.groups.remove_if(&group, |_, members| members.is_empty());
        }
        debug!(%conn, "subscriber disconnected");
    }

    /// Number of live connections in a group.
    pub fn connection_count(&self, group: &str) -> usize {
        self.groups.get(group).map(|m| m.len()).unwrap_or(0)
    }

    /// Pushes a notification to every live connection in a group.
    ///
    /// Returns the number of connections the message was handed to.
    /// Connections whose channel has closed are dropped from the group.
    pub fn push(&self, group: &str, view: &NotificationView) -> usize {
        // Snapshot the members so no shard lock is held while sending.
        let members: Vec<(ConnectionId, mpsc::Sender<NotificationView>)> = match self
            .groups
            .get(group)
        {
            Some(members) => members
                .iter()
                .map(|e| (*e.key(), e.value().clone()))
                .collect(),
            None => return 0,
        };

        let mut delivered = 0;
        for (conn, tx) in members {
            match tx.try_send(view.clone()) {
                Ok(()) => delivered += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(%conn, group, "subscriber channel full, dropping push");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    self.leave(group, conn);
                }
            }
        }
        delivered
    }

    /// Fans a notification out to its audiences: the addressed
    /// customer's group, if any, and the admin group.
    pub fn broadcast(&self, view: &NotificationView) -> usize {
        let mut delivered = 0;
        if let Some(customer_id) = view.customer_id {
            delivered += self.push(&Audience::Customer(customer_id).group_name(), view);
        }
        delivered += self.push(ADMIN_GROUP, view);
        metrics::counter!("notify_pushes_total").increment(delivered as u64);
        delivered
    }
}
