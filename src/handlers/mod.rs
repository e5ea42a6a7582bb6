//! HTTP handlers for the local bridge
//!
//! A desktop or browser UI talks to the core through these JSON endpoints:
//! - `GET /health` - bridge status and cached endpoint
//! - `GET /models?refresh=bool` - resolve and list the catalog
//! - `POST /analyze` - run an image analysis
//! - `GET /metrics` - Prometheus text format

use crate::config::Config;
use crate::error::AppResult;
use crate::metrics::Metrics;
use crate::middleware::request_id_middleware;
use crate::session::Session;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;

pub mod analyze;
pub mod health;
pub mod metrics;
pub mod models;

/// Largest accepted request body (base64 images are about 4/3 of the file size)
pub const MAX_BODY_BYTES: usize = 32 * 1024 * 1024;

/// Application state shared across all handlers
///
/// The session sits behind a mutex so refreshes are serialized: only one
/// resolution can read or update the cached endpoint at a time.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    session: Arc<Mutex<Session>>,
    metrics: Arc<Metrics>,
}

impl AppState {
    /// Create a new AppState talking to Ollama over HTTP
    pub fn new(config: Arc<Config>) -> AppResult<Self> {
        let metrics = Arc::new(Metrics::new().map_err(|e| {
            crate::error::AppError::Internal(format!("Failed to initialize metrics: {}", e))
        })?);
        let session = Session::from_config(&config, metrics.clone())?;
        Ok(Self::with_session(config, session))
    }

    /// Create an AppState around an existing session
    pub fn with_session(config: Arc<Config>, session: Session) -> Self {
        let metrics = session.metrics().clone();
        Self {
            config,
            session: Arc::new(Mutex::new(session)),
            metrics,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn session(&self) -> &Arc<Mutex<Session>> {
        &self.session
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }
}

/// Build the bridge router with tracing and request-id layers
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::handler))
        .route("/models", get(models::handler))
        .route("/analyze", post(analyze::handler))
        .route("/metrics", get(metrics::handler))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
