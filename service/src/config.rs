use clap::builder::TypedValueParser as _;
use clap::Parser;
use dotenvy::dotenv;
use log::LevelFilter;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Default GitHub REST API base URL used when `GITHUB_API_URL` is not set.
pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";

/// Protocol version advertised in the `X-MCP-Protocol-Version` header of every stream.
pub const STREAM_PROTOCOL_VERSION: &str = "1.0";

#[derive(Clone, Debug, PartialEq)]
pub enum RustEnv {
    Development,
    Production,
    Staging,
}

#[derive(Debug, PartialEq, Eq)]
pub struct RustEnvParseError;

impl FromStr for RustEnv {
    type Err = RustEnvParseError;
    fn from_str(level: &str) -> Result<RustEnv, Self::Err> {
        match level.to_lowercase().as_str() {
            "development" => Ok(RustEnv::Development),
            "production" => Ok(RustEnv::Production),
            "staging" => Ok(RustEnv::Staging),
            _ => Err(RustEnvParseError),
        }
    }
}

impl fmt::Display for RustEnv {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RustEnv::Development => write!(f, "development"),
            RustEnv::Production => write!(f, "production"),
            RustEnv::Staging => write!(f, "staging"),
        }
    }
}

#[derive(Clone, Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// The host interface to listen for incoming connections
    #[arg(short, long, env, default_value = "127.0.0.1")]
    pub interface: Option<String>,

    /// The host TCP port to listen for incoming connections
    #[arg(short, long, env, default_value_t = 8080)]
    pub port: u16,

    /// Set the log level verbosity threshold (level) to control what gets displayed on console output
    #[arg(
        short,
        long,
        env,
        default_value_t = LevelFilter::Info,
        value_parser = clap::builder::PossibleValuesParser::new(["OFF", "ERROR", "WARN", "INFO", "DEBUG", "TRACE"])
            .map(|s| s.parse::<LevelFilter>().unwrap()),
        )]
    pub log_level_filter: LevelFilter,

    /// Set the Rust runtime environment to use.
    #[arg(
    short,
    long,
    env,
    default_value_t = RustEnv::Development,
    value_parser = clap::builder::PossibleValuesParser::new([
        "DEVELOPMENT", "PRODUCTION", "STAGING",
        "development", "production", "staging"
    ])
        .map(|s| s.parse::<RustEnv>().unwrap()),
    )]
    pub runtime_env: RustEnv,

    /// Personal access token used for GitHub API requests. Without it requests are
    /// unauthenticated and subject to a much lower rate limit.
    #[arg(long, env, hide_env_values = true)]
    github_token: Option<String>,

    /// The base URL of the GitHub REST API.
    /// Override in tests to point at a mock server.
    #[arg(long, env, default_value = DEFAULT_GITHUB_API_URL)]
    github_api_url: String,

    /// Seconds between heartbeat pings on every event stream
    #[arg(long, env, default_value_t = 10)]
    pub heartbeat_interval_secs: u64,

    /// Seconds between upstream polls for each watched repository
    #[arg(long, env, default_value_t = 60)]
    pub poll_interval_secs: u64,

    /// Timeout in seconds for a single upstream repository fetch
    #[arg(long, env, default_value_t = 10)]
    pub fetch_timeout_secs: u64,

    /// Events buffered per connection before the oldest is dropped
    #[arg(long, env, default_value_t = 64)]
    pub connection_buffer_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        // Load .env file first
        dotenv().ok();
        // Then parse the command line parameters and flags
        Config::parse()
    }

    pub fn interface(&self) -> &str {
        self.interface.as_deref().unwrap_or("127.0.0.1")
    }

    pub fn github_token(&self) -> Option<String> {
        self.github_token.clone()
    }

    pub fn set_github_token(mut self, github_token: Option<String>) -> Self {
        self.github_token = github_token;
        self
    }

    pub fn github_api_url(&self) -> &str {
        &self.github_api_url
    }

    pub fn set_github_api_url(mut self, github_api_url: String) -> Self {
        self.github_api_url = github_api_url;
        self
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}
