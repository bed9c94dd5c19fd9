//! GitHub REST API client used to poll watched repositories.
//!
//! Only the repository endpoint is needed: each poll fetches
//! `GET /repos/{owner}/{repo}` and reduces the response to a
//! [`RepoSnapshot`]. Non-success responses are classified into
//! [`ExternalErrorKind`]s the way GitHub documents them.

use crate::error::{
    DomainErrorKind, Error, ExternalErrorKind, GitHubApiError, InternalErrorKind,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::*;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::StatusCode;
use serde::Deserialize;
use service::config::Config;
use std::time::Duration;
use upstream::{RepoKey, RepoSnapshot, ResourceSource};

const GITHUB_ACCEPT: &str = "application/vnd.github.v3+json";
const RATE_LIMIT_RESET_HEADER: &str = "x-ratelimit-reset";
const DEFAULT_ERROR_MESSAGE: &str = "GitHub API error";

/// The subset of the repository resource the server tracks.
#[derive(Debug, Clone, Deserialize)]
pub struct Repository {
    pub full_name: String,
    pub stargazers_count: u64,
    pub forks_count: u64,
    pub open_issues_count: u64,
    pub watchers_count: u64,
}

impl From<Repository> for RepoSnapshot {
    fn from(repository: Repository) -> Self {
        RepoSnapshot {
            full_name: repository.full_name,
            stars: repository.stargazers_count,
            forks: repository.forks_count,
            open_issues: repository.open_issues_count,
            watchers: repository.watchers_count,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// GitHub API client
pub struct GitHubClient {
    client: reqwest::Client,
    base_url: String,
}

impl GitHubClient {
    /// Create a client for the API at `base_url`. Without a token requests are
    /// sent unauthenticated.
    pub fn new(base_url: &str, token: Option<&str>, timeout: Duration) -> Result<Self, Error> {
        let headers = build_headers(token)?;

        let client = reqwest::Client::builder()
            .use_rustls_tls()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, Error> {
        let token = config.github_token();
        Self::new(
            config.github_api_url(),
            token.as_deref(),
            config.fetch_timeout(),
        )
    }

    /// Fetch `GET /repos/{owner}/{repo}`.
    pub async fn get_repository(&self, owner: &str, repo: &str) -> Result<Repository, Error> {
        let url = format!("{}/repos/{}/{}", self.base_url, owner, repo);

        debug!("Fetching GitHub repository {owner}/{repo}");

        let response = self.client.get(&url).send().await.map_err(|e| {
            warn!("Failed to fetch GitHub repository {owner}/{repo}: {e:?}");
            Error::from(e)
        })?;

        let status = response.status();
        if status.is_success() {
            let repository: Repository = response.json().await.map_err(|e| {
                warn!("Failed to parse GitHub repository response: {e:?}");
                Error {
                    source: Some(Box::new(e)),
                    error_kind: DomainErrorKind::External(ExternalErrorKind::Other(
                        "Invalid response from GitHub".to_string(),
                    )),
                }
            })?;
            Ok(repository)
        } else {
            let headers = response.headers().clone();
            let body = response.text().await.unwrap_or_default();
            let err = classify(status, &headers, &body);
            warn!("GitHub API error for {owner}/{repo}: {err}");
            Err(err)
        }
    }
}

#[async_trait]
impl ResourceSource for GitHubClient {
    async fn fetch_repository(&self, key: &RepoKey) -> Result<RepoSnapshot, upstream::Error> {
        let repository = self.get_repository(key.owner(), key.name()).await?;
        Ok(repository.into())
    }
}

fn build_headers(token: Option<&str>) -> Result<HeaderMap, Error> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(GITHUB_ACCEPT));
    headers.insert(
        USER_AGENT,
        HeaderValue::from_static(concat!("repo-pulse/", env!("CARGO_PKG_VERSION"))),
    );

    if let Some(token) = token {
        let mut auth_value = HeaderValue::from_str(&format!("token {token}")).map_err(|e| {
            warn!("Failed to create auth header: {e:?}");
            Error {
                source: Some(Box::new(e)),
                error_kind: DomainErrorKind::Internal(InternalErrorKind::Config),
            }
        })?;
        auth_value.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth_value);
    }

    Ok(headers)
}

/// Map a non-success response to a domain error.
fn classify(status: StatusCode, headers: &HeaderMap, body: &str) -> Error {
    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|body| body.message)
        .unwrap_or_else(|| DEFAULT_ERROR_MESSAGE.to_string());

    let error_kind = match status.as_u16() {
        400 => ExternalErrorKind::Validation,
        401 => ExternalErrorKind::Authentication,
        403 if message.to_lowercase().contains("rate limit") => ExternalErrorKind::RateLimit {
            reset_at: rate_limit_reset(headers),
        },
        403 => ExternalErrorKind::Permission,
        404 => ExternalErrorKind::NotFound,
        409 => ExternalErrorKind::Conflict,
        429 => ExternalErrorKind::RateLimit {
            reset_at: rate_limit_reset(headers),
        },
        code => ExternalErrorKind::Other(format!("{message} (status code: {code})")),
    };

    Error {
        source: Some(Box::new(GitHubApiError {
            status: status.as_u16(),
            message,
        })),
        error_kind: DomainErrorKind::External(error_kind),
    }
}

fn rate_limit_reset(headers: &HeaderMap) -> Option<DateTime<Utc>> {
    headers
        .get(RATE_LIMIT_RESET_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<i64>().ok())
        .and_then(|seconds| DateTime::from_timestamp(seconds, 0))
}
