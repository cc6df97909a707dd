//! netscope Agent - Local measurement service
//!
//! Runs the probe families on request from the machine it is installed
//! on, keeps the latest report of each, and serves recommendations, a
//! connection architecture and a parameter template derived from them.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        NETSCOPE AGENT                        │
//! │                                                              │
//! │   JSON API (axum)                                            │
//! │     │  POST /api/<family>        GET /api/<generator>        │
//! │     ▼                                 ▲                      │
//! │   Probe families ──► SnapshotStore ───┘                      │
//! │   network | ping | dns | cdn | protocol | ports              │
//! └──────────────────────────────────────────────────────────────┘
//! ```

pub mod api;
pub mod config;
pub mod store;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use netscope_common::NetscopeError;
use parking_lot::RwLock;
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;

pub use config::{AgentConfig, Family};
pub use store::SnapshotStore;

/// Agent error types
#[derive(Debug, Error)]
pub enum AgentError {
    /// Bad request body or parameters
    #[error("{0}")]
    InvalidRequest(String),
    /// A measurement family failed
    #[error("probe error: {0}")]
    Probe(NetscopeError),
    /// Listener or socket failure
    #[error("network error: {0}")]
    Network(String),
    /// JSON encoding failure
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<NetscopeError> for AgentError {
    fn from(err: NetscopeError) -> Self {
        match err {
            NetscopeError::InvalidRequest(msg) => AgentError::InvalidRequest(msg),
            other => AgentError::Probe(other),
        }
    }
}

impl IntoResponse for AgentError {
    fn into_response(self) -> Response {
        let status = match &self {
            AgentError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            other => {
                tracing::error!(error = %other, "request failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Shared handler state
pub struct AgentState {
    /// Loaded configuration
    pub config: AgentConfig,
    restricted: RwLock<bool>,
    /// Latest results
    pub store: SnapshotStore,
}

impl AgentState {
    /// State seeded from the loaded config
    pub fn new(config: AgentConfig) -> Self {
        Self {
            restricted: RwLock::new(config.restricted_mode),
            config,
            store: SnapshotStore::new(),
        }
    }

    /// Current restricted mode
    pub fn restricted(&self) -> bool {
        *self.restricted.read()
    }

    /// Switch restricted mode
    pub fn set_restricted(&self, restricted: bool) {
        *self.restricted.write() = restricted;
    }
}

/// The agent process
pub struct NetscopeAgent {
    state: Arc<AgentState>,
}

impl NetscopeAgent {
    /// Agent with the given config
    pub fn new(config: AgentConfig) -> Self {
        Self {
            state: Arc::new(AgentState::new(config)),
        }
    }

    /// Serve the API until the listener fails
    pub async fn run(&self) -> Result<(), AgentError> {
        let addr = self.state.config.listen_addr.clone();
        tracing::info!(
            addr = %addr,
            restricted = self.state.restricted(),
            "netscope agent listening"
        );

        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| AgentError::Network(e.to_string()))?;

        axum::serve(listener, api::build_router(Arc::clone(&self.state)))
            .await
            .map_err(|e| AgentError::Network(e.to_string()))
    }
}
