//! HTTP surface of the event server.
//!
//! Routes event stream requests to the `sse` crate's `Manager` and serves a
//! few informational endpoints alongside them.

use log::*;
use service::AppState;
use std::sync::Arc;
use tokio::net::TcpListener;

mod controller;
pub mod error;
mod params;
mod router;
mod sse;

pub use router::define_routes;

pub async fn init_server(app_state: AppState) -> std::io::Result<()> {
    let server_url = format!(
        "{}:{}",
        app_state.config.interface(),
        app_state.config.port
    );
    let listener = TcpListener::bind(&server_url).await?;
    info!("Server starting... listening for connections on http://{server_url}");

    let sse_manager = Arc::clone(&app_state.sse_manager);
    let app = define_routes(app_state);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(sse_manager))
        .await
}

// Event streams never end on their own, so the manager is shut down as part
// of the signal: that closes every stream and lets in-flight responses finish.
async fn shutdown_signal(sse_manager: Arc<::sse::Manager>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received, closing event streams");
    sse_manager.shutdown().await;
}
