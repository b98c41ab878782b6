//! HTTP and WebSocket API for the notification service.
//!
//! REST endpoints cover creation (service-to-service), listing, and
//! read-state changes; the WebSocket endpoint streams live pushes to
//! group subscribers. Structured logging and Prometheus metrics follow
//! the same conventions as the orders API.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, patch, post};
use datastore::{CustomerStore, NotificationStore};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::notifications::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S>(state: Arc<AppState<S>>, metrics_handle: PrometheusHandle) -> Router
where
    S: NotificationStore + CustomerStore + 'static,
{
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/notifications", post(routes::notifications::create::<S>))
        .route("/notifications", get(routes::notifications::list::<S>))
        .route(
            "/notifications/unread",
            get(routes::notifications::unread::<S>),
        )
        .route(
            "/notifications/unread-count",
            get(routes::notifications::unread_count::<S>),
        )
        .route(
            "/notifications/customer/{id}",
            get(routes::notifications::for_customer::<S>),
        )
        .route(
            "/notifications/customer/{id}/read-all",
            patch(routes::notifications::read_all::<S>),
        )
        .route(
            "/notifications/{id}/read",
            patch(routes::notifications::mark_read::<S>),
        )
        .route("/notifications/ws", get(routes::ws::subscribe::<S>))
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
