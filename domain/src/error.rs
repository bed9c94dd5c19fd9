//! Error types for the `domain` layer.
use chrono::{DateTime, Utc};
use std::error::Error as StdError;
use std::fmt;
use upstream::{Error as UpstreamError, ErrorKind as UpstreamErrorKind};

/// Top-level domain error type.
/// Errors in the Domain layer are modeled as a tree structure
/// with `domain::error::Error` as the root type holding a tree of `error_kind`
/// enums. The `source` field holds the original error that caused the domain
/// error. Errors are translated between layers: `reqwest` errors become domain
/// errors here, and domain errors become `upstream::Error` at the
/// `ResourceSource` boundary so the `sse` crate never sees GitHub specifics.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: DomainErrorKind,
}

/// Enum representing the major categories of errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum DomainErrorKind {
    Internal(InternalErrorKind),
    External(ExternalErrorKind),
}

/// Enum representing the various kinds of internal errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum InternalErrorKind {
    Config,
    Other(String),
}

/// Enum representing the various kinds of errors returned by, or on the way to, GitHub.
#[derive(Debug, PartialEq)]
pub enum ExternalErrorKind {
    Network,
    Timeout,
    Validation,
    Authentication,
    Permission,
    RateLimit { reset_at: Option<DateTime<Utc>> },
    NotFound,
    Conflict,
    Other(String),
}

/// Non-success response from the GitHub API.
#[derive(Debug, Clone, PartialEq)]
pub struct GitHubApiError {
    pub status: u16,
    pub message: String,
}

impl fmt::Display for GitHubApiError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} (status code: {})", self.message, self.status)
    }
}

impl StdError for GitHubApiError {}

impl Error {
    pub fn external(error_kind: ExternalErrorKind) -> Self {
        Error {
            source: None,
            error_kind: DomainErrorKind::External(error_kind),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Domain Error: {self:?}")
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        // Errors that result from issues building the reqwest::Client instance. This
        // type of error will occur prior to any network calls being made.
        if err.is_builder() {
            Error {
                source: Some(Box::new(err)),
                error_kind: DomainErrorKind::Internal(InternalErrorKind::Other(
                    "Failed to build reqwest client".to_string(),
                )),
            }
        } else if err.is_timeout() {
            Error {
                source: Some(Box::new(err)),
                error_kind: DomainErrorKind::External(ExternalErrorKind::Timeout),
            }
        // Errors that result from issues with the network call itself.
        } else {
            Error {
                source: Some(Box::new(err)),
                error_kind: DomainErrorKind::External(ExternalErrorKind::Network),
            }
        }
    }
}

// This is where domain errors are reduced to what the broadcast core needs to
// tell subscribers.
impl From<Error> for UpstreamError {
    fn from(err: Error) -> Self {
        let error_kind = match err.error_kind {
            DomainErrorKind::External(external) => match external {
                ExternalErrorKind::Network => UpstreamErrorKind::Network,
                ExternalErrorKind::Timeout => UpstreamErrorKind::Timeout,
                ExternalErrorKind::Authentication => UpstreamErrorKind::Unauthorized,
                ExternalErrorKind::Permission => UpstreamErrorKind::Forbidden,
                ExternalErrorKind::RateLimit { reset_at } => {
                    UpstreamErrorKind::RateLimited { reset_at }
                }
                ExternalErrorKind::NotFound => UpstreamErrorKind::NotFound,
                ExternalErrorKind::Validation => {
                    UpstreamErrorKind::Other("invalid request".to_string())
                }
                ExternalErrorKind::Conflict => UpstreamErrorKind::Other("conflict".to_string()),
                // Already carries the full upstream message.
                ExternalErrorKind::Other(message) => {
                    return UpstreamError::new(UpstreamErrorKind::Other(message))
                }
            },
            DomainErrorKind::Internal(InternalErrorKind::Config) => {
                UpstreamErrorKind::Other("configuration error".to_string())
            }
            DomainErrorKind::Internal(InternalErrorKind::Other(message)) => {
                UpstreamErrorKind::Other(message)
            }
        };

        match err.source {
            Some(source) => UpstreamError::new(error_kind).with_source(source),
            None => UpstreamError::new(error_kind),
        }
    }
}
