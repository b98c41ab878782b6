//! Order endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use checkout::{CheckoutService, NotificationSender, OrderView, PlaceOrderRequest};
use common::OrderId;
use datastore::{CatalogStore, CustomerStore, OrderStatus, OrderStore};
use serde::Deserialize;

use crate::auth::Authenticated;
use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<S, N> {
    pub checkout: CheckoutService<S, N>,
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

/// POST /orders — place an order from the caller's cart.
#[tracing::instrument(skip(state, auth, req))]
pub async fn place<S, N>(
    State(state): State<Arc<AppState<S, N>>>,
    auth: Authenticated,
    Json(req): Json<PlaceOrderRequest>,
) -> Result<(StatusCode, Json<OrderView>), ApiError>
where
    S: CatalogStore + CustomerStore + OrderStore,
    N: NotificationSender,
{
    if auth.0.is_admin() {
        return Err(ApiError::Forbidden(
            "orders are placed by customers".to_string(),
        ));
    }
    let order = state.checkout.place_order(auth.0.account_id, req).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// GET /orders — list every order. Admin only.
pub async fn list<S, N>(
    State(state): State<Arc<AppState<S, N>>>,
    auth: Authenticated,
) -> Result<Json<Vec<OrderView>>, ApiError>
where
    S: CatalogStore + CustomerStore + OrderStore,
    N: NotificationSender,
{
    let identity = auth.require_admin()?;
    Ok(Json(state.checkout.list_orders(identity).await?))
}

/// GET /orders/my-orders — list the caller's own orders.
pub async fn my_orders<S, N>(
    State(state): State<Arc<AppState<S, N>>>,
    auth: Authenticated,
) -> Result<Json<Vec<OrderView>>, ApiError>
where
    S: CatalogStore + CustomerStore + OrderStore,
    N: NotificationSender,
{
    if auth.0.is_admin() {
        return Err(ApiError::Forbidden(
            "my-orders is a customer endpoint".to_string(),
        ));
    }
    Ok(Json(state.checkout.list_orders(&auth.0).await?))
}

/// GET /orders/{id} — fetch one order, scoped to the caller.
pub async fn get<S, N>(
    State(state): State<Arc<AppState<S, N>>>,
    auth: Authenticated,
    Path(id): Path<i64>,
) -> Result<Json<OrderView>, ApiError>
where
    S: CatalogStore + CustomerStore + OrderStore,
    N: NotificationSender,
{
    let order = state.checkout.get_order(&auth.0, OrderId::new(id)).await?;
    Ok(Json(order))
}

/// PATCH /orders/{id}/status — move an order to a new status. Admin only.
#[tracing::instrument(skip(state, auth, req))]
pub async fn update_status<S, N>(
    State(state): State<Arc<AppState<S, N>>>,
    auth: Authenticated,
    Path(id): Path<i64>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<OrderView>, ApiError>
where
    S: CatalogStore + CustomerStore + OrderStore,
    N: NotificationSender,
{
    auth.require_admin()?;
    let status = OrderStatus::parse(&req.status)
        .ok_or_else(|| ApiError::BadRequest(format!("unknown order status: {}", req.status)))?;
    let order = state.checkout.update_status(OrderId::new(id), status).await?;
    Ok(Json(order))
}

/// DELETE /orders/{id} — remove an order. Admin only.
pub async fn remove<S, N>(
    State(state): State<Arc<AppState<S, N>>>,
    auth: Authenticated,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError>
where
    S: CatalogStore + CustomerStore + OrderStore,
    N: NotificationSender,
{
    auth.require_admin()?;
    state.checkout.delete_order(OrderId::new(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
