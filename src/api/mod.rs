//! HTTP server module
//!
//! Serves the organization pages and the login/logout endpoints.

pub mod auth;
pub mod handlers;
mod routes;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::cache::FragmentCache;
use crate::config::ServerConfig;
use crate::data::{DynOrganizationRepository, DynProfileRepository};
use crate::data_impl::jsonl::{JsonlDatabase, JsonlOrganizationRepository, JsonlProfileRepository};

use auth::SessionStore;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub organizations: DynOrganizationRepository,
    pub profiles: DynProfileRepository,
    /// Rendered fragments such as per-organization member counts
    pub fragments: FragmentCache,
    /// Login sessions (in-memory, cleared on restart)
    pub sessions: SessionStore,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(db: Arc<JsonlDatabase>, config: ServerConfig) -> Self {
        Self {
            organizations: Arc::new(JsonlOrganizationRepository::new(db.clone())),
            profiles: Arc::new(JsonlProfileRepository::new(db)),
            fragments: FragmentCache::new(config.fragment_cache_ttl()),
            sessions: SessionStore::new(config.session_ttl()),
            config: Arc::new(config),
        }
    }
}

/// Build the full application router
pub fn build_app(state: AppState) -> Router {
    // Configure CORS for cross-origin requests
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    routes::create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Start the HTTP server
///
/// SECURITY: binding to anything but loopback exposes the login form to
/// the network; put the server behind TLS before doing so.
pub async fn start_server(state: AppState) -> std::io::Result<()> {
    let config = state.config.clone();

    let addr: SocketAddr = config.bind_address().parse().map_err(|e| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("Invalid bind address {}: {}", config.bind_address(), e),
        )
    })?;

    if config.is_network_exposed() {
        tracing::warn!(%addr, "server binding to a non-loopback address - accessible from network");
    }

    let app = build_app(state);

    tracing::info!("HTTP server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await
}
