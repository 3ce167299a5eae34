mod api;
mod cache;
mod cms;
mod config;
mod content;
mod error;
mod ratings;
mod web_ui;

#[cfg(test)]
mod test_support;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{middleware, Router};
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api::AppState;
use config::Config;

/// Full application: JSON API, pages, and the page middleware
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        // JSON API and health probe
        .merge(api::router())
        // Server-rendered pages, sitemaps, 404 fallback
        .merge(web_ui::router())
        .layer(middleware::from_fn_with_state(state.clone(), web_ui::cms_redirects))
        .layer(middleware::from_fn(web_ui::session_gate))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "casino_site=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };
    let addr = config.bind_addr;

    let state = Arc::new(
        AppState::new(config)
            .await
            .expect("Failed to create application state"),
    );

    let app = build_router(state.clone());

    tracing::info!("Casino site starting on http://{}", addr);
    tracing::info!("CMS: {}", state.cms.base_url());
    tracing::info!("Cache: {}", state.cache.backend().mode());
    if state.config.revalidate_secret.is_none() {
        tracing::warn!("REVALIDATE_SECRET not set; /api/revalidate will reject every request");
    }

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listener");
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    tracing::info!("Server stopped");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
        tracing::info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
        tracing::info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
