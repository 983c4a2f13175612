//! HTTP server startup.

use std::future::Future;

use tokio::net::TcpListener;
use tracing::info;

use crate::routes::create_router;
use crate::state::AppState;

/// Bind the listener and serve the API until `shutdown` resolves.
///
/// In-flight requests are drained before this returns; stopping the
/// engine itself is the caller's job.
pub async fn start_server(
    state: AppState,
    host: &str,
    port: u16,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let listener = TcpListener::bind((host, port)).await?;
    info!(host, port, "HTTP facade listening");
    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown)
        .await
}
