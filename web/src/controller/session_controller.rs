use axum::Json;
use log::*;
use serde::Serialize;
use serde_json::Value;
use service::config::STREAM_PROTOCOL_VERSION;
use uuid::Uuid;

/// Stream a client should open after initializing.
pub(crate) const MESSAGE_ENDPOINT: &str = "/message/stream";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct InitializeResponse {
    id: String,
    message_endpoint: &'static str,
    status: &'static str,
    protocol_version: &'static str,
}

#[derive(Debug, Serialize)]
pub(crate) struct SendResponse {
    id: Value,
    status: &'static str,
    /// Receipt time in Unix milliseconds.
    time: i64,
}

/// POST /initialize
///
/// Hands out a session id and points the client at the message stream.
pub async fn initialize() -> Json<InitializeResponse> {
    let id = Uuid::new_v4().to_string();
    debug!("Initialized session {id}");

    Json(InitializeResponse {
        id,
        message_endpoint: MESSAGE_ENDPOINT,
        status: "ready",
        protocol_version: STREAM_PROTOCOL_VERSION,
    })
}

/// POST /send
///
/// Acknowledges a client message. Nothing is routed onward; the reply echoes
/// the message `id`, or a fresh one when the message has none.
pub async fn send(Json(message): Json<Value>) -> Json<SendResponse> {
    info!("Received message: {message}");

    let id = message
        .get("id")
        .filter(|id| !id.is_null())
        .cloned()
        .unwrap_or_else(|| Value::String(Uuid::new_v4().to_string()));

    Json(SendResponse {
        id,
        status: "received",
        time: chrono::Utc::now().timestamp_millis(),
    })
}
