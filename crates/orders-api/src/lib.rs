//! HTTP API for order placement and management.
//!
//! Exposes the checkout pipeline over REST with structured logging
//! (tracing) and Prometheus metrics. Callers arrive pre-authenticated:
//! the upstream edge resolves credentials and forwards the account id
//! and role as headers.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, patch, post};
use checkout::NotificationSender;
use datastore::{CatalogStore, CustomerStore, OrderStore};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::orders::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S, N>(state: Arc<AppState<S, N>>, metrics_handle: PrometheusHandle) -> Router
where
    S: CatalogStore + CustomerStore + OrderStore + 'static,
    N: NotificationSender + 'static,
{
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/orders", post(routes::orders::place::<S, N>))
        .route("/orders", get(routes::orders::list::<S, N>))
        .route("/orders/my-orders", get(routes::orders::my_orders::<S, N>))
        .route("/orders/{id}", get(routes::orders::get::<S, N>))
        .route(
            "/orders/{id}/status",
            patch(routes::orders::update_status::<S, N>),
        )
        .route("/orders/{id}", delete(routes::orders::remove::<S, N>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
