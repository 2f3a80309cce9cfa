//! HTTP server for the document Q&A system

pub mod routes;
pub mod session;
pub mod state;

use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::RagConfig;
use crate::error::{Error, Result};
pub use session::{Session, SessionManager};
pub use state::AppState;

/// Document Q&A HTTP server
pub struct DocQaServer {
    state: AppState,
}

impl DocQaServer {
    /// Create a server over the on-disk store with cloud providers
    pub fn new(config: RagConfig) -> Result<Self> {
        Ok(Self::with_state(AppState::new(config)?))
    }

    /// Create a server around prepared state
    pub fn with_state(state: AppState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Build the router with all routes
    pub fn router(&self) -> Router {
        build_router(self.state.clone())
    }

    /// Start the server
    pub async fn start(self) -> Result<()> {
        let addr: SocketAddr = self
            .address()
            .parse()
            .map_err(|e| Error::Config(format!("Invalid address: {}", e)))?;

        let router = self.router();
        spawn_session_sweeper(self.state.clone());

        tracing::info!("Starting document Q&A server on http://{}", addr);
        tracing::info!("API documentation: http://{}/api/info", addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| Error::Config(format!("Failed to bind: {}", e)))?;

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal(self.state.clone()))
            .await
            .map_err(|e| Error::Internal(format!("Server error: {}", e)))?;

        Ok(())
    }

    /// Get the server address
    pub fn address(&self) -> String {
        let server = &self.state.config().server;
        format!("{}:{}", server.host, server.port)
    }
}

/// Router over the given state
pub fn build_router(state: AppState) -> Router {
    let server = state.config().server.clone();

    let router = Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness))
        .nest("/api", routes::api_routes(server.max_upload_size))
        .with_state(state)
        // applied bottom to top
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new());

    if server.enable_cors {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        router.layer(cors)
    } else {
        router
    }
}

/// Periodically drop idle sessions
fn spawn_session_sweeper(state: AppState) {
    let ttl = state.sessions().idle_ttl();
    let period = (ttl / 4).clamp(Duration::from_secs(1), Duration::from_secs(60));

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            state.sessions().sweep_idle();
        }
    });
}

/// Resolves on Ctrl-C; readiness drops while in-flight requests finish
async fn shutdown_signal(state: AppState) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    state.set_ready(false);
    tracing::info!("Shutdown signal received, draining requests");
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

/// Readiness check endpoint
async fn readiness(state: axum::extract::State<AppState>) -> axum::http::StatusCode {
    if state.is_ready() {
        axum::http::StatusCode::OK
    } else {
        axum::http::StatusCode::SERVICE_UNAVAILABLE
    }
}
