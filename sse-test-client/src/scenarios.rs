use crate::output::{print_step, print_success, TestResult};
use crate::sse_client::{Connection, Event};
use anyhow::Result;
use serde_json::Value;
use std::time::{Duration, Instant};

const GREETING_TIMEOUT: Duration = Duration::from_secs(5);

/// Query `/api/status` and report whether the server is up.
pub async fn test_server_status(client: &reqwest::Client, base_url: &str) -> Result<TestResult> {
    let started = Instant::now();
    print_step("Checking server status...");

    let response = client
        .get(format!("{}/api/status", base_url))
        .send()
        .await?;

    if !response.status().is_success() {
        return Ok(TestResult::fail(
            "Server status",
            format!("unexpected status code {}", response.status()),
            started.elapsed(),
        ));
    }

    let body: Value = response.json().await?;
    if body["status"] != "UP" {
        return Ok(TestResult::fail(
            "Server status",
            format!("server reported {}", body["status"]),
            started.elapsed(),
        ));
    }

    print_success(&format!(
        "Server {} is UP (GitHub token {})",
        body["version"], body["github_token"]
    ));
    Ok(TestResult::pass("Server status", started.elapsed()))
}

/// Connect to the global stream and check the greeting and the first ping.
pub async fn test_global_stream(base_url: &str, ping_timeout: Duration) -> Result<TestResult> {
    let url = format!("{}/api/events", base_url);
    run_stream_scenario("Global stream", &url, None, ping_timeout).await
}

/// Connect to a repository stream and check the greeting names the repository.
pub async fn test_repository_stream(
    base_url: &str,
    repository: &str,
    ping_timeout: Duration,
) -> Result<TestResult> {
    let url = format!("{}/api/repos/{}/events", base_url, repository);
    run_stream_scenario("Repository stream", &url, Some(repository), ping_timeout).await
}

async fn run_stream_scenario(
    name: &str,
    url: &str,
    repository: Option<&str>,
    ping_timeout: Duration,
) -> Result<TestResult> {
    let started = Instant::now();
    print_step(&format!("Connecting to {}...", url));

    let mut connection = Connection::establish(url, name.to_string()).await?;

    match check_stream(&mut connection, repository, ping_timeout).await {
        Ok(()) => Ok(TestResult::pass(name, started.elapsed())),
        Err(e) => Ok(TestResult::fail(name, e.to_string(), started.elapsed())),
    }
}

async fn check_stream(
    connection: &mut Connection,
    repository: Option<&str>,
    ping_timeout: Duration,
) -> Result<()> {
    let open = connection.next_event(GREETING_TIMEOUT).await?;
    expect_envelope(&open, "open")?;
    print_success("Received open");

    let ready = connection.next_event(GREETING_TIMEOUT).await?;
    expect_envelope(&ready, "ready")?;
    if let Some(repository) = repository {
        if ready.data["params"]["repository"] != repository {
            anyhow::bail!(
                "ready names {} instead of {}",
                ready.data["params"]["repository"],
                repository
            );
        }
    }
    print_success("Received ready");

    let ping = connection.wait_for_method("ping", ping_timeout).await?;
    print_success(&format!(
        "Received ping #{} after {:.1}s",
        ping.data["params"]["counter"],
        ping.timestamp.duration_since(ready.timestamp).as_secs_f64()
    ));

    Ok(())
}

fn expect_envelope(event: &Event, method: &str) -> Result<()> {
    if event.event_type != "message" {
        anyhow::bail!("expected SSE event name message, got {}", event.event_type);
    }
    if event.data["jsonrpc"] != "2.0" {
        anyhow::bail!("missing jsonrpc 2.0 envelope in {}", event.data);
    }
    if event.method != method {
        anyhow::bail!("expected {} but received {}", method, event.method);
    }
    if event.data["params"]["time"].as_i64().is_none() {
        anyhow::bail!("{} is missing params.time", method);
    }
    Ok(())
}
