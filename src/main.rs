use domain::gateway::github::GitHubClient;
use log::*;
use service::{config::Config, logging::Logger, AppState};
use sse::Manager;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    let config = Config::new();

    Logger::init_logger(&config);

    info!(
        "Starting repo_pulse {} ({} environment)",
        env!("CARGO_PKG_VERSION"),
        config.runtime_env
    );

    if config.github_token().is_none() {
        warn!("GITHUB_TOKEN is not set, GitHub requests are unauthenticated and heavily rate limited");
    }

    let github = match GitHubClient::from_config(&config) {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to create GitHub client: {e}");
            std::process::exit(1);
        }
    };

    let settings = service::sse_settings(&config);
    debug!(
        "Event settings: heartbeat {:?}, poll {:?}, fetch timeout {:?}, buffer {}",
        settings.heartbeat_interval,
        settings.poll_interval,
        settings.fetch_timeout,
        settings.buffer_capacity
    );
    let sse_manager = Arc::new(Manager::new(settings, Arc::new(github)));

    let app_state = AppState::new(config, &sse_manager);

    if let Err(e) = web::init_server(app_state).await {
        error!("Server error: {e}");
        std::process::exit(1);
    }

    info!("Server stopped");
}
