use crate::error::Error;
use crate::params::repository::RepositoryParams;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::header::{CACHE_CONTROL, CONNECTION, CONTENT_TYPE};
use axum::http::{HeaderName, HeaderValue};
use axum::response::Response;
use log::*;
use service::config::STREAM_PROTOCOL_VERSION;
use service::AppState;
use sse::{ChannelKey, Subscription};

const X_ACCEL_BUFFERING: HeaderName = HeaderName::from_static("x-accel-buffering");
const X_MCP_PROTOCOL_VERSION: HeaderName = HeaderName::from_static("x-mcp-protocol-version");

/// Stream of server-wide events: greeting and heartbeat only.
pub(crate) async fn global_events(State(app_state): State<AppState>) -> Result<Response, Error> {
    open_stream(&app_state, ChannelKey::Global)
}

/// Stream of events for one repository: greeting, heartbeat and change notifications.
pub(crate) async fn repo_events(
    State(app_state): State<AppState>,
    Path(params): Path<RepositoryParams>,
) -> Result<Response, Error> {
    let key = params.into_channel_key()?;
    open_stream(&app_state, key)
}

fn open_stream(app_state: &AppState, key: ChannelKey) -> Result<Response, Error> {
    let subscription = app_state.sse_manager.subscribe(key)?;

    debug!(
        "Established SSE connection {} on {}",
        subscription.id(),
        subscription.key()
    );

    Ok(stream_response(subscription))
}

// The subscription moves into the body stream; when the client goes away the
// body is dropped and the subscription detaches.
fn stream_response(subscription: Subscription) -> Response {
    let mut response = Response::new(Body::from_stream(subscription.into_stream()));

    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/event-stream"));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
    headers.insert(X_ACCEL_BUFFERING, HeaderValue::from_static("no"));
    headers.insert(
        X_MCP_PROTOCOL_VERSION,
        HeaderValue::from_static(STREAM_PROTOCOL_VERSION),
    );

    response
}
