//! API server entry point.

use std::sync::Arc;

use axum::Router;
use domain::{HttpPaymentGateway, MockPaymentGateway};
use metrics_exporter_prometheus::PrometheusHandle;
use store::{MemoryStore, PostgresStore};
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use api::config::Config;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

/// Builds the router for the store/gateway pair the environment selects.
async fn build_app(config: &Config, metrics_handle: PrometheusHandle) -> Router {
    match &config.database_url {
        Some(url) => {
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(5)
                .connect(url)
                .await
                .expect("failed to connect to Postgres");
            let store = PostgresStore::new(pool);
            store.run_migrations().await.expect("migrations failed");
            let store = Arc::new(store);

            match &config.payment_url {
                Some(payment_url) => {
                    let gateway = HttpPaymentGateway::new(payment_url.clone())
                        .expect("failed to build payment client");
                    let state = api::create_state(store, Arc::new(gateway));
                    api::create_app(state, metrics_handle)
                }
                None => {
                    let state = api::create_state(store, Arc::new(MockPaymentGateway::new()));
                    api::create_app(state, metrics_handle)
                }
            }
        }
        None => match &config.payment_url {
            Some(payment_url) => {
                let gateway = HttpPaymentGateway::new(payment_url.clone())
                    .expect("failed to build payment client");
                let state = api::create_state(Arc::new(MemoryStore::new()), Arc::new(gateway));
                api::create_app(state, metrics_handle)
            }
            None => api::create_app(api::create_memory_state(), metrics_handle),
        },
    }
}

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    // 1. Initialize tracing
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone())),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Install Prometheus metrics recorder
    let prometheus_builder = metrics_exporter_prometheus::PrometheusBuilder::new();
    let metrics_handle = prometheus_builder
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Build the application over the configured store and gateway
    let app = build_app(&config, metrics_handle).await;

    // 4. Start server
    let addr = config.addr();
    tracing::info!(%addr, "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("server shut down gracefully");
}
