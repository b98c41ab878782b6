//! Notification REST endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use common::{CustomerId, NotificationId};
use datastore::{CustomerStore, NotificationStore};
use notify::{Audience, IncomingNotification, NotificationService, NotificationView};
use serde::{Deserialize, Serialize};

use crate::auth::Authenticated;
use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<S> {
    pub notifications: NotificationService<S>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnreadQuery {
    pub customer_id: Option<i64>,
}

#[derive(Serialize)]
pub struct UnreadCountResponse {
    pub count: i64,
}

/// POST /notifications — persist and dispatch a notification.
///
/// Service-to-service endpoint; the orders service is the usual
/// caller. Succeeds with 201 even when nobody is subscribed.
#[tracing::instrument(skip(state, req))]
pub async fn create<S>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<IncomingNotification>,
) -> Result<(StatusCode, Json<NotificationView>), ApiError>
where
    S: NotificationStore + CustomerStore,
{
    let view = state.notifications.create(req).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// GET /notifications — list notifications, scoped to the caller.
pub async fn list<S>(
    State(state): State<Arc<AppState<S>>>,
    auth: Authenticated,
) -> Result<Json<Vec<NotificationView>>, ApiError>
where
    S: NotificationStore + CustomerStore,
{
    Ok(Json(state.notifications.list(&auth.0).await?))
}

/// GET /notifications/customer/{id} — one customer's notifications.
pub async fn for_customer<S>(
    State(state): State<Arc<AppState<S>>>,
    auth: Authenticated,
    Path(id): Path<i64>,
) -> Result<Json<Vec<NotificationView>>, ApiError>
where
    S: NotificationStore + CustomerStore,
{
    let customer = CustomerId::new(id);
    require_self_or_admin(&state, &auth, customer).await?;
    Ok(Json(state.notifications.list_for_customer(customer).await?))
}

/// GET /notifications/unread — unread notifications, scoped to the
/// caller. Admins may filter with `?customerId=`.
pub async fn unread<S>(
    State(state): State<Arc<AppState<S>>>,
    auth: Authenticated,
    Query(query): Query<UnreadQuery>,
) -> Result<Json<Vec<NotificationView>>, ApiError>
where
    S: NotificationStore + CustomerStore,
{
    let views = if auth.0.is_admin() {
        state
            .notifications
            .unread_for(query.customer_id.map(CustomerId::new))
            .await?
    } else {
        state.notifications.unread(&auth.0).await?
    };
    Ok(Json(views))
}

/// GET /notifications/unread-count — total unread count. Admin only.
pub async fn unread_count<S>(
    State(state): State<Arc<AppState<S>>>,
    auth: Authenticated,
) -> Result<Json<UnreadCountResponse>, ApiError>
where
    S: NotificationStore + CustomerStore,
{
    auth.require_admin()?;
    let count = state.notifications.unread_count().await?;
    Ok(Json(UnreadCountResponse { count }))
}

/// PATCH /notifications/{id}/read — mark one notification read.
pub async fn mark_read<S>(
    State(state): State<Arc<AppState<S>>>,
    _auth: Authenticated,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError>
where
    S: NotificationStore + CustomerStore,
{
    state.notifications.mark_read(NotificationId::new(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PATCH /notifications/customer/{id}/read-all — mark a customer's
/// notifications read.
pub async fn read_all<S>(
    State(state): State<Arc<AppState<S>>>,
    auth: Authenticated,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError>
where
    S: NotificationStore + CustomerStore,
{
    let customer = CustomerId::new(id);
    require_self_or_admin(&state, &auth, customer).await?;
    state.notifications.mark_all_read_for(customer).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Admins may act on any customer; customers only on themselves.
async fn require_self_or_admin<S>(
    state: &AppState<S>,
    auth: &Authenticated,
    customer: CustomerId,
) -> Result<(), ApiError>
where
    S: NotificationStore + CustomerStore,
{
    if auth.0.is_admin() {
        return Ok(());
    }
    match state.notifications.audience_for(&auth.0).await? {
        Audience::Customer(own) if own == customer => Ok(()),
        _ => Err(ApiError::Forbidden(
            "cannot act on another customer's notifications".to_string(),
        )),
    }
}
