use crate::error::Error;
use bytes::Bytes;
use serde::Serialize;
use serde_json::{json, Map, Value};
use upstream::{RepoKey, RepoSnapshot};

/// Protocol version carried in every envelope.
pub const JSONRPC_VERSION: &str = "2.0";

/// SSE event name used for every frame; clients dispatch on `method` instead.
pub const SSE_EVENT_NAME: &str = "message";

/// Event methods understood by subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Open,
    Ready,
    Ping,
    RepoUpdate,
    Error,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Open => "open",
            Method::Ready => "ready",
            Method::Ping => "ping",
            Method::RepoUpdate => "repo_update",
            Method::Error => "error",
        }
    }
}

/// One JSON-RPC framed notification. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    method: Method,
    id: String,
    params: Map<String, Value>,
}

impl Event {
    /// Builds an event from raw parts. A `time` param is added when missing.
    pub fn new(method: Method, id: impl Into<String>, mut params: Map<String, Value>) -> Self {
        params
            .entry("time")
            .or_insert_with(|| Value::from(now_millis()));
        Self {
            method,
            id: id.into(),
            params,
        }
    }

    /// The `open` and `ready` pair sent to every newly attached connection.
    ///
    /// Both share one base id and timestamp; `ready` carries the `-ready` suffix
    /// and, for repository channels, the `owner/repo` being watched.
    pub fn open_pair(repository: Option<&RepoKey>) -> (Event, Event) {
        let base_id = uuid::Uuid::new_v4().to_string();
        let time = now_millis();

        let open = Event::new(Method::Open, base_id.clone(), params(json!({ "time": time })));

        let mut ready_params = params(json!({ "time": time }));
        if let Some(repository) = repository {
            ready_params.insert("repository".to_string(), Value::from(repository.full_name()));
        }
        let ready = Event::new(Method::Ready, format!("{base_id}-ready"), ready_params);

        (open, ready)
    }

    pub fn ping(counter: u64) -> Self {
        Event::new(
            Method::Ping,
            prefixed_id("ping"),
            params(json!({ "counter": counter })),
        )
    }

    pub fn repo_update(snapshot: &RepoSnapshot, changed: &[&str]) -> Self {
        Event::new(
            Method::RepoUpdate,
            prefixed_id("update"),
            params(json!({
                "repository": snapshot.full_name,
                "stars": snapshot.stars,
                "forks": snapshot.forks,
                "open_issues": snapshot.open_issues,
                "watchers": snapshot.watchers,
                "changed": changed,
            })),
        )
    }

    pub fn error(message: impl Into<String>) -> Self {
        Event::new(
            Method::Error,
            prefixed_id("error"),
            params(json!({ "message": message.into() })),
        )
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn params(&self) -> &Map<String, Value> {
        &self.params
    }

    pub fn time(&self) -> Option<i64> {
        self.params.get("time").and_then(Value::as_i64)
    }
}

#[derive(Serialize)]
struct Envelope<'a> {
    jsonrpc: &'static str,
    method: &'static str,
    id: &'a str,
    params: &'a Map<String, Value>,
}

/// Serializes an event into its SSE frame:
///
/// ```text
/// event: message
/// data: {"jsonrpc":"2.0","method":"ping","id":"...","params":{...}}
///
/// ```
pub fn encode(event: &Event) -> Result<Bytes, Error> {
    let data = serde_json::to_string(&Envelope {
        jsonrpc: JSONRPC_VERSION,
        method: event.method.as_str(),
        id: &event.id,
        params: &event.params,
    })?;

    Ok(Bytes::from(format!(
        "event: {SSE_EVENT_NAME}\ndata: {data}\n\n"
    )))
}

pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn prefixed_id(prefix: &str) -> String {
    format!("{prefix}-{}", uuid::Uuid::new_v4())
}

fn params(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_produces_exact_frame() {
        let event = Event::new(
            Method::Ping,
            "ping-1",
            params(json!({ "time": 1700000000000_i64, "counter": 1 })),
        );

        let frame = encode(&event).unwrap();

        assert_eq!(
            frame,
            Bytes::from(
                "event: message\ndata: {\"jsonrpc\":\"2.0\",\"method\":\"ping\",\"id\":\"ping-1\",\"params\":{\"counter\":1,\"time\":1700000000000}}\n\n"
            )
        );
    }

    #[test]
    fn test_encode_keeps_data_on_a_single_line() {
        let event = Event::error("line one\nline two");
        let frame = encode(&event).unwrap();
        let text = std::str::from_utf8(&frame).unwrap();

        let lines: Vec<&str> = text.split('\n').collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "event: message");
        assert!(lines[1].starts_with("data: {"));
        assert_eq!(lines[2], "");
        assert_eq!(lines[3], "");
    }

    #[test]
    fn test_new_adds_time_when_missing() {
        let event = Event::new(Method::Open, "abc", Map::new());
        assert!(event.time().is_some());
    }

    #[test]
    fn test_new_keeps_supplied_time() {
        let event = Event::new(Method::Open, "abc", params(json!({ "time": 42 })));
        assert_eq!(event.time(), Some(42));
    }

    #[test]
    fn test_open_pair_shares_base_id_and_time() {
        let (open, ready) = Event::open_pair(None);

        assert_eq!(open.method(), Method::Open);
        assert_eq!(ready.method(), Method::Ready);
        assert_eq!(ready.id(), format!("{}-ready", open.id()));
        assert_eq!(open.time(), ready.time());
        assert!(ready.params().get("repository").is_none());
    }

    #[test]
    fn test_open_pair_names_repository_in_ready() {
        let key = RepoKey::new("acme", "widget");
        let (_, ready) = Event::open_pair(Some(&key));

        assert_eq!(ready.params()["repository"], json!("acme/widget"));
    }

    #[test]
    fn test_repo_update_carries_counters_and_changed_fields() {
        let snapshot = RepoSnapshot {
            full_name: "acme/widget".to_string(),
            stars: 11,
            forks: 2,
            open_issues: 0,
            watchers: 11,
        };

        let event = Event::repo_update(&snapshot, &["stars"]);

        assert_eq!(event.method(), Method::RepoUpdate);
        assert!(event.id().starts_with("update-"));
        assert_eq!(event.params()["repository"], json!("acme/widget"));
        assert_eq!(event.params()["stars"], json!(11));
        assert_eq!(event.params()["forks"], json!(2));
        assert_eq!(event.params()["changed"], json!(["stars"]));
        assert!(event.time().is_some());
    }

    #[test]
    fn test_event_ids_are_unique() {
        assert_ne!(Event::ping(1).id(), Event::ping(1).id());
        assert_ne!(Event::error("x").id(), Event::error("x").id());
    }
}
