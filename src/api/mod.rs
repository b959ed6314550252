//! HTTP transport.
//!
//! - `POST /api/store-data`: upload a dataset for a session
//! - `POST /api/query`: dispatch a query, reply with a response envelope
//! - `GET /api/datasets`: datasets stored for a session
//! - `GET /health`: liveness plus model endpoint reachability

pub mod handlers;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::agent_core::{DatasetStore, Dispatcher};
use crate::config::ServerConfig;
use crate::inference::LlmGenerator;

/// Shared state behind every route.
pub struct ApiState {
    pub dispatcher: Dispatcher,
    pub store: Arc<dyn DatasetStore>,
    /// Checked by `/health`; absent when no model is configured.
    pub model: Option<LlmGenerator>,
    pub server: ServerConfig,
}

impl ApiState {
    pub fn new(dispatcher: Dispatcher, model: Option<LlmGenerator>, server: ServerConfig) -> Self {
        Self {
            store: Arc::clone(dispatcher.store()),
            dispatcher,
            model,
            server,
        }
    }
}

pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/api/store-data", post(handlers::store_data))
        .route("/api/query", post(handlers::query))
        .route("/api/datasets", get(handlers::list_datasets))
        .route("/health", get(handlers::health))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}
