//! Web server module.
//!
//! Exposes the dashboard's read surface as JSON and turns user interactions into
//! coordinator actions.

mod handlers;

pub use handlers::*;

use crate::config::ServerConfig;
use crate::dashboard::Dashboard;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: ServerConfig,
    pub dashboard: Arc<Dashboard>,
}

/// Web server for the dashboard.
pub struct Server {
    state: AppState,
}

impl Server {
    /// Create a new server with the given dependencies.
    pub fn new(config: ServerConfig, dashboard: Arc<Dashboard>) -> Self {
        Self {
            state: AppState { config, dashboard },
        }
    }

    /// Build the router with all routes.
    pub fn routes(&self) -> Router {
        let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

        Router::new()
            // Read surface
            .route("/api/view", get(handlers::handle_view))
            .route("/api/activity", get(handlers::handle_activity))
            .route("/api/metrics", get(handlers::handle_metrics))
            // Actions
            .route("/api/actions/connect", post(handlers::handle_connect))
            .route("/api/actions/disconnect", post(handlers::handle_disconnect))
            .route("/api/actions/rotate", post(handlers::handle_rotate))
            .route("/api/actions/speed-test", post(handlers::handle_speed_test))
            .route("/api/actions/auto-rotation", post(handlers::handle_auto_rotation))
            .layer(cors)
            .layer(TraceLayer::new_for_http())
            .layer(DefaultBodyLimit::max(64 * 1024))
            .with_state(self.state.clone())
    }

    /// Start the server on the configured port.
    pub async fn start(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.state.config.http_port));
        let router = self.routes();

        tracing::info!("Web server listening on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, router).await?;

        Ok(())
    }
}
