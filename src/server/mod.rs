//! Distribution server (`perplan serve`)
//!
//! Publishes the current version, its changelog and its package to update
//! clients, and accepts new packages from administrators.
//!
//! | Route | Purpose |
//! |-------|---------|
//! | `GET /` | Service information and available packages |
//! | `GET /api/version` | `{"version": ...}` |
//! | `GET /api/update` | Update descriptor (`version`, `changelog`, `download_url`, `sha256`) |
//! | `GET /api/download` | Package bytes, a placeholder if nothing was published |
//! | `POST /api/upload` | Multipart `file` + `changelog`, replaces the published package |

pub mod errors;
pub mod handlers;
pub mod store;

use crate::config::ServerConfig;
use crate::utils::get_data_dir;
use anyhow::{Context, Result};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

pub use store::PackageStore;

/// Shared state of all handlers.
#[derive(Debug, Clone)]
pub struct ServerState {
    pub store: Arc<PackageStore>,
    /// Externally reachable base URL, without a trailing slash.
    pub public_url: String,
}

impl ServerState {
    pub fn new(store: PackageStore, public_url: &str) -> Self {
        Self {
            store: Arc::new(store),
            public_url: public_url.trim_end_matches('/').to_string(),
        }
    }

    /// Open the store described by `config`.
    pub fn from_config(config: &ServerConfig) -> Result<Self> {
        let root = data_dir(config)?;
        let store = PackageStore::open(&root, config.initial_version.clone())
            .with_context(|| format!("Failed to open server data at {}", root.display()))?;
        Ok(Self::new(store, &config.public_url))
    }
}

/// Server data directory from config, defaulting under the user data dir.
pub fn data_dir(config: &ServerConfig) -> Result<PathBuf> {
    match &config.data_dir {
        Some(dir) => Ok(dir.clone()),
        None => Ok(get_data_dir()?.join("server")),
    }
}

/// Build the router.
pub fn router(state: ServerState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/api/version", get(handlers::version))
        .route("/api/update", get(handlers::update))
        .route("/api/download", get(handlers::download))
        .route("/api/upload", post(handlers::upload))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `config.bind` and serve until Ctrl-C.
pub async fn serve(config: &ServerConfig) -> Result<()> {
    let state = ServerState::from_config(config)?;
    let listener = TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind))?;

    let (version, _) = state.store.current();
    info!("Serving version {version} from {}", state.store.root().display());
    info!("Listening on {}", listener.local_addr()?);

    serve_on(listener, state, config.max_upload_bytes).await
}

/// Serve on an already bound listener until Ctrl-C.
pub async fn serve_on(listener: TcpListener, state: ServerState, max_upload_bytes: usize) -> Result<()> {
    axum::serve(listener, router(state, max_upload_bytes))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await
        .context("Server error")
}
