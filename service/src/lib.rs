use config::Config;
use sse::{Manager, Settings};
use std::sync::Arc;

pub mod config;
pub mod logging;

/// Broadcast settings derived from the command line and environment.
pub fn sse_settings(config: &Config) -> Settings {
    Settings::default()
        .with_heartbeat_interval(config.heartbeat_interval())
        .with_poll_interval(config.poll_interval())
        .with_fetch_timeout(config.fetch_timeout())
        .with_buffer_capacity(config.connection_buffer_capacity)
}

// Service-level state containing only infrastructure concerns
// Needs to implement Clone to be able to be passed into Router as State
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub sse_manager: Arc<Manager>,
}

impl AppState {
    pub fn new(app_config: Config, sse_manager: &Arc<Manager>) -> Self {
        Self {
            config: app_config,
            sse_manager: Arc::clone(sse_manager),
        }
    }

    pub fn github_token_configured(&self) -> bool {
        self.config.github_token().is_some()
    }
}
