use crate::controller::{health_check_controller, info_controller, session_controller};
use crate::sse::handler;
use axum::{
    routing::{get, post},
    Router,
};
use service::AppState;

/// Paths that all stream the global channel. Only `/api/events` is documented;
/// the rest are kept for older clients.
const GLOBAL_EVENT_PATHS: &[&str] = &[
    "/api/events",
    "/events",
    "/sse",
    "/messages",
    "/message/stream",
];

pub fn define_routes(app_state: AppState) -> Router {
    Router::new()
        .merge(event_routes(app_state.clone()))
        .merge(info_routes(app_state))
        .merge(session_routes())
        .merge(health_routes())
}

fn event_routes(app_state: AppState) -> Router {
    GLOBAL_EVENT_PATHS
        .iter()
        .fold(Router::<AppState>::new(), |router, path| {
            router.route(path, get(handler::global_events))
        })
        .route("/api/repos/:owner/:repo/events", get(handler::repo_events))
        .with_state(app_state)
}

fn info_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(info_controller::home))
        .route("/api/status", get(info_controller::status))
        .route("/api/info", get(info_controller::info))
        .with_state(app_state)
}

fn session_routes() -> Router {
    Router::new()
        .route("/initialize", post(session_controller::initialize))
        .route("/send", post(session_controller::send))
}

fn health_routes() -> Router {
    Router::new().route("/health", get(health_check_controller::health_check))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use axum::response::Response;
    use clap::Parser;
    use futures::StreamExt;
    use serde_json::Value;
    use service::config::Config;
    use sse::{ChannelKey, Manager, Settings};
    use std::sync::Arc;
    use tower::ServiceExt;
    use upstream::{RepoKey, RepoSnapshot, ResourceSource};

    struct FixedSource;

    #[async_trait]
    impl ResourceSource for FixedSource {
        async fn fetch_repository(&self, key: &RepoKey) -> Result<RepoSnapshot, upstream::Error> {
            Ok(RepoSnapshot {
                full_name: key.full_name(),
                stars: 1,
                ..Default::default()
            })
        }
    }

    fn test_state() -> AppState {
        let config = Config::try_parse_from(["repo_pulse"]).unwrap();
        let manager = Arc::new(Manager::new(Settings::default(), Arc::new(FixedSource)));
        AppState::new(config, &manager)
    }

    async fn get(app_state: &AppState, uri: &str) -> Response {
        define_routes(app_state.clone())
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn post_json(app_state: &AppState, uri: &str, body: &str) -> Response {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_owned()))
            .unwrap();
        define_routes(app_state.clone())
            .oneshot(request)
            .await
            .unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn next_event(body: &mut axum::body::BodyDataStream) -> Value {
        let chunk = body.next().await.unwrap().unwrap();
        let text = std::str::from_utf8(&chunk).unwrap();
        let data = text
            .strip_prefix("event: message\ndata: ")
            .and_then(|rest| rest.strip_suffix("\n\n"))
            .unwrap();
        serde_json::from_str(data).unwrap()
    }

    #[tokio::test]
    async fn test_health_check() {
        let response = get(&test_state(), "/health").await;
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"healthy");
    }

    #[tokio::test]
    async fn test_status_reports_missing_token() {
        let state = test_state();
        let state = AppState::new(state.config.set_github_token(None), &state.sse_manager);

        let body = json_body(get(&state, "/api/status").await).await;
        assert_eq!(body["status"], "UP");
        assert_eq!(body["github_token"], "missing");
        assert_eq!(body["connections"], 0);
    }

    #[tokio::test]
    async fn test_home_and_info() {
        let state = test_state();

        let home = json_body(get(&state, "/").await).await;
        assert_eq!(home["status"], "running");
        assert_eq!(home["version"], env!("CARGO_PKG_VERSION"));

        let info = json_body(get(&state, "/api/info").await).await;
        assert_eq!(info["name"], "repo-pulse");
        assert!(info["capabilities"]["methods"]
            .as_array()
            .unwrap()
            .contains(&Value::from("repo_update")));
    }

    #[tokio::test]
    async fn test_initialize_points_at_message_stream() {
        let state = test_state();
        let response = post_json(&state, "/initialize", "{}").await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["messageEndpoint"], "/message/stream");
        assert_eq!(body["status"], "ready");
        assert_eq!(body["protocolVersion"], "1.0");
        assert!(uuid::Uuid::parse_str(body["id"].as_str().unwrap()).is_ok());

        // The advertised endpoint really streams.
        let stream = get(&state, body["messageEndpoint"].as_str().unwrap()).await;
        assert_eq!(stream.headers()["content-type"], "text/event-stream");
    }

    #[tokio::test]
    async fn test_initialize_issues_distinct_ids() {
        let state = test_state();
        let first = json_body(post_json(&state, "/initialize", "{}").await).await;
        let second = json_body(post_json(&state, "/initialize", "{}").await).await;
        assert_ne!(first["id"], second["id"]);
    }

    #[tokio::test]
    async fn test_send_echoes_message_id() {
        let state = test_state();
        let response = post_json(
            &state,
            "/send",
            r#"{"jsonrpc":"2.0","id":"msg-7","method":"subscribe"}"#,
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["id"], "msg-7");
        assert_eq!(body["status"], "received");
        assert!(body["time"].as_i64().unwrap() > 0);
    }

    #[tokio::test]
    async fn test_send_without_id_gets_generated_one() {
        let state = test_state();
        let body = json_body(post_json(&state, "/send", r#"{"method":"hello"}"#).await).await;

        assert_eq!(body["status"], "received");
        assert!(uuid::Uuid::parse_str(body["id"].as_str().unwrap()).is_ok());
    }

    #[tokio::test]
    async fn test_send_rejects_malformed_json() {
        let state = test_state();
        let response = post_json(&state, "/send", "not json").await;
        assert!(response.status().is_client_error());
    }

    #[tokio::test]
    async fn test_session_endpoints_are_post_only() {
        let state = test_state();
        let response = get(&state, "/initialize").await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_global_stream_sets_headers_and_greets() {
        let state = test_state();
        let response = get(&state, "/api/events").await;

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers["content-type"], "text/event-stream");
        assert_eq!(headers["cache-control"], "no-cache");
        assert_eq!(headers["connection"], "keep-alive");
        assert_eq!(headers["x-accel-buffering"], "no");
        assert_eq!(headers["x-mcp-protocol-version"], "1.0");

        let mut body = response.into_body().into_data_stream();
        let open = next_event(&mut body).await;
        let ready = next_event(&mut body).await;

        assert_eq!(open["jsonrpc"], "2.0");
        assert_eq!(open["method"], "open");
        assert_eq!(ready["method"], "ready");
        assert_eq!(state.sse_manager.connection_count(), 1);
    }

    #[tokio::test]
    async fn test_dropping_the_stream_detaches_the_connection() {
        let state = test_state();
        let response = get(&state, "/api/events").await;
        assert!(state.sse_manager.has_channel(&ChannelKey::Global));

        drop(response);

        assert_eq!(state.sse_manager.connection_count(), 0);
        assert!(!state.sse_manager.has_channel(&ChannelKey::Global));
    }

    #[tokio::test]
    async fn test_legacy_paths_stream_the_global_channel() {
        let state = test_state();
        for path in ["/events", "/sse", "/messages", "/message/stream"] {
            let response = get(&state, path).await;
            assert_eq!(response.status(), StatusCode::OK, "{path}");
            assert_eq!(response.headers()["content-type"], "text/event-stream");
            assert!(state.sse_manager.has_channel(&ChannelKey::Global));
        }
    }

    #[tokio::test]
    async fn test_repository_stream_opens_repository_channel() {
        let state = test_state();
        let response = get(&state, "/api/repos/acme/widget/events").await;
        assert_eq!(response.status(), StatusCode::OK);

        let mut body = response.into_body().into_data_stream();
        next_event(&mut body).await;
        let ready = next_event(&mut body).await;

        assert_eq!(ready["params"]["repository"], "acme/widget");
        assert!(state
            .sse_manager
            .has_channel(&ChannelKey::repository("acme", "widget")));
        assert!(!state.sse_manager.has_channel(&ChannelKey::Global));
    }

    #[tokio::test]
    async fn test_invalid_repository_path_is_rejected() {
        let state = test_state();
        let response = get(&state, "/api/repos/-acme/widget/events").await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(state.sse_manager.channel_count(), 0);
    }

    #[tokio::test]
    async fn test_streams_are_refused_after_shutdown() {
        let state = test_state();
        state.sse_manager.shutdown().await;

        let response = get(&state, "/api/events").await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
