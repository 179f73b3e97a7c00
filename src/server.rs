//! Static file server for the built web bundle.
//!
//! Files under the document root are served as they are; directories serve
//! their `index.html`; any other path falls back to the root `index.html` so
//! client-side routes resolve.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use axum::Router;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

pub const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    #[error("failed to bind port {port}")]
    Bind {
        port: u16,
        #[source]
        source: std::io::Error,
    },
    #[error("server stopped")]
    Serve(#[source] std::io::Error),
    #[error("document root {0} has no index.html")]
    MissingIndex(PathBuf),
}

/// Router serving `root` with the single-page fallback.
pub fn router(root: impl AsRef<Path>) -> Router {
    let root = root.as_ref();
    let index = ServeFile::new(root.join("index.html"));

    Router::new()
        .fallback_service(
            ServeDir::new(root)
                .append_index_html_on_directories(true)
                .fallback(index),
        )
        .layer(TraceLayer::new_for_http())
}

/// Bind every interface on `port` and serve until the process is killed.
pub async fn serve(port: u16, root: PathBuf) -> Result<(), ServeError> {
    if !root.join("index.html").is_file() {
        return Err(ServeError::MissingIndex(root));
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| ServeError::Bind { port, source })?;

    tracing::info!("App listening to {port}....");
    tracing::info!("Press Ctrl+C to quit.");

    axum::serve(listener, router(&root))
        .await
        .map_err(ServeError::Serve)
}
