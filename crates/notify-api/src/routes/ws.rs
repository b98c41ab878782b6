//! Live notification subscriptions over WebSocket.
//!
//! On upgrade the connection is placed in the group its identity
//! resolves to: admins in `admin`, customers with a profile in
//! `customer:<id>`, everyone else in `others`. The client may join or
//! leave additional groups with JSON frames; on disconnect every
//! membership is removed.

use std::sync::Arc;

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use common::ConnectionId;
use datastore::{CustomerStore, NotificationStore};
use futures_util::{SinkExt, StreamExt};
use notify::NotificationView;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::auth::Authenticated;
use crate::error::ApiError;
use crate::routes::notifications::AppState;

/// Outbound channel depth per connection. A subscriber that falls this
/// far behind starts losing pushes rather than backpressuring the hub.
const OUTBOUND_BUFFER: usize = 32;

#[derive(Serialize)]
struct ServerEvent<'a> {
    event: &'static str,
    payload: &'a NotificationView,
}

#[derive(Deserialize)]
#[serde(tag = "action")]
enum ClientFrame {
    JoinGroup { group: String },
    LeaveGroup { group: String },
}

/// GET /notifications/ws — upgrade to a live subscription.
pub async fn subscribe<S>(
    State(state): State<Arc<AppState<S>>>,
    auth: Authenticated,
    ws: WebSocketUpgrade,
) -> Result<Response, ApiError>
where
    S: NotificationStore + CustomerStore + 'static,
{
    let audience = state.notifications.audience_for(&auth.0).await?;
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, audience.group_name())))
}

async fn handle_socket<S>(socket: WebSocket, state: Arc<AppState<S>>, home_group: String)
where
    S: NotificationStore + CustomerStore + 'static,
{
    let conn = ConnectionId::new();
    let registry = state.notifications.registry().clone();
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::channel::<NotificationView>(OUTBOUND_BUFFER);

    registry.join(&home_group, conn, tx.clone());
    info!(%conn, group = %home_group, "subscriber connected");

    loop {
        tokio::select! {
            pushed = rx.recv() => {
                let Some(view) = pushed else { break };
                let frame = ServerEvent {
                    event: "ReceiveNotification",
                    payload: &view,
                };
                let Ok(text) = serde_json::to_string(&frame) else { continue };
                if sink.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
            incoming = stream.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ClientFrame>(&text) {
                            Ok(ClientFrame::JoinGroup { group }) => {
                                registry.join(&group, conn, tx.clone());
                            }
                            Ok(ClientFrame::LeaveGroup { group }) => {
                                registry.leave(&group, conn);
                            }
                            Err(err) => {
                                debug!(%conn, error = %err, "ignoring malformed client frame");
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        debug!(%conn, error = %err, "socket error");
                        break;
                    }
                }
            }
        }
    }

    registry.disconnect(conn);
    info!(%conn, "subscriber disconnected");
}
