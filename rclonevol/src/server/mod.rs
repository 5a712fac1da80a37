//! Docker plugin API over a Unix socket.
//!
//! Thin adapter: every endpoint maps onto one [`VolumeRegistry`] operation.

mod error;
mod handlers;

use std::future::Future;
use std::path::Path;

use axum::Router;
use axum::http::HeaderValue;
use axum::http::header::CONTENT_TYPE;
use axum::routing::post;
use rclonevol_shared::errors::{VolumeError, VolumeResult};
use tokio::net::UnixListener;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::volumes::VolumeRegistry;

pub use error::ApiError;

/// Content type Docker plugin responses are tagged with.
pub const PLUGIN_CONTENT_TYPE: &str = "application/vnd.docker.plugins.v1+json";

/// Build the plugin router.
pub fn router(registry: VolumeRegistry) -> Router {
    Router::new()
        .route("/Plugin.Activate", post(handlers::activate))
        .route("/VolumeDriver.Create", post(handlers::create))
        .route("/VolumeDriver.Remove", post(handlers::remove))
        .route("/VolumeDriver.Path", post(handlers::path))
        .route("/VolumeDriver.Mount", post(handlers::mount))
        .route("/VolumeDriver.Unmount", post(handlers::unmount))
        .route("/VolumeDriver.Get", post(handlers::get))
        .route("/VolumeDriver.List", post(handlers::list))
        .route("/VolumeDriver.Capabilities", post(handlers::capabilities))
        .layer(SetResponseHeaderLayer::overriding(
            CONTENT_TYPE,
            HeaderValue::from_static(PLUGIN_CONTENT_TYPE),
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(registry)
}

/// Bind `socket_path`, replacing a stale socket file left by a previous run.
pub fn bind(socket_path: &Path) -> VolumeResult<UnixListener> {
    if let Some(parent) = socket_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            VolumeError::Storage(format!(
                "failed to create socket dir {}: {}",
                parent.display(),
                e
            ))
        })?;
    }

    match std::fs::remove_file(socket_path) {
        Ok(()) => tracing::debug!(socket = %socket_path.display(), "Removed stale socket"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            return Err(VolumeError::Storage(format!(
                "failed to remove stale socket {}: {}",
                socket_path.display(),
                e
            )));
        }
    }

    UnixListener::bind(socket_path).map_err(|e| {
        VolumeError::Storage(format!(
            "failed to bind socket {}: {}",
            socket_path.display(),
            e
        ))
    })
}

/// Serve the plugin API until `shutdown` resolves, then remove the socket.
pub async fn serve<F>(
    registry: VolumeRegistry,
    socket_path: &Path,
    shutdown: F,
) -> VolumeResult<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = bind(socket_path)?;
    tracing::info!(socket = %socket_path.display(), "listening");

    let result = axum::serve(listener, router(registry))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| VolumeError::Internal(format!("server error: {e}")));

    if let Err(e) = std::fs::remove_file(socket_path) {
        tracing::debug!(socket = %socket_path.display(), error = %e, "Socket already gone");
    }

    result
}
