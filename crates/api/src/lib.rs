//! HTTP API server with observability for the game store back office.
//!
//! Provides REST endpoints for cart editing, payment, and order
//! fulfillment, with structured logging (tracing) and Prometheus
//! metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, patch, post};
use domain::{LineManager, MockPaymentGateway, OrderLifecycle, PaymentGateway};
use metrics_exporter_prometheus::PrometheusHandle;
use store::MemoryStore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::cart::{AppState, StoreBound};

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: StoreBound, P: PaymentGateway + 'static>(
    state: Arc<AppState<S, P>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/cart/{customer_id}", get(routes::cart::get::<S, P>))
        .route(
            "/cart/{customer_id}/games/{game}",
            post(routes::cart::add_game::<S, P>).delete(routes::cart::remove_game::<S, P>),
        )
        .route("/cart/{customer_id}/pay", post(routes::cart::pay::<S, P>))
        .route(
            "/lines/{line_id}",
            patch(routes::cart::update_line::<S, P>).delete(routes::cart::delete_line::<S, P>),
        )
        .route("/orders", get(routes::orders::list::<S, P>))
        .route("/orders/{id}", get(routes::orders::get::<S, P>))
        .route("/orders/{id}/details", get(routes::orders::details::<S, P>))
        .route("/orders/{id}/ship", post(routes::orders::ship::<S, P>))
        .route(
            "/payment-methods",
            get(routes::orders::payment_methods::<S, P>),
        )
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

/// Creates application state over a shared store and payment gateway.
pub fn create_state<S: StoreBound, P: PaymentGateway + 'static>(
    store: Arc<S>,
    gateway: Arc<P>,
) -> Arc<AppState<S, P>> {
    Arc::new(AppState {
        lines: LineManager::new(store.clone()),
        lifecycle: OrderLifecycle::new(store, gateway),
    })
}

/// Creates in-memory application state with a mock payment gateway.
pub fn create_memory_state() -> Arc<AppState<MemoryStore, MockPaymentGateway>> {
    create_state(
        Arc::new(MemoryStore::new()),
        Arc::new(MockPaymentGateway::new()),
    )
}
