use axum::extract::State;
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};
use service::AppState;

pub(crate) const SERVER_NAME: &str = "repo-pulse";
pub(crate) const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Serialize)]
pub(crate) struct HomeResponse {
    name: &'static str,
    version: &'static str,
    status: &'static str,
}

#[derive(Debug, Serialize)]
pub(crate) struct StatusResponse {
    status: &'static str,
    version: &'static str,
    github_token: &'static str,
    channels: usize,
    connections: usize,
}

/// GET /
pub async fn home() -> Json<HomeResponse> {
    Json(HomeResponse {
        name: SERVER_NAME,
        version: VERSION,
        status: "running",
    })
}

/// GET /api/status
pub async fn status(State(app_state): State<AppState>) -> Json<StatusResponse> {
    let github_token = if app_state.github_token_configured() {
        "configured"
    } else {
        "missing"
    };

    Json(StatusResponse {
        status: "UP",
        version: VERSION,
        github_token,
        channels: app_state.sse_manager.channel_count(),
        connections: app_state.sse_manager.connection_count(),
    })
}

/// GET /api/info
///
/// Describes which streams exist and which methods they can carry.
pub async fn info() -> Json<Value> {
    Json(json!({
        "name": SERVER_NAME,
        "version": VERSION,
        "capabilities": {
            "streams": {
                "global": "/api/events",
                "repository": "/api/repos/{owner}/{repo}/events"
            },
            "methods": ["open", "ready", "ping", "repo_update", "error"]
        }
    }))
}
