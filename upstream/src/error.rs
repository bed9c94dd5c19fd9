//! Error type returned by a [`crate::ResourceSource`].
//!
//! Follows the same pattern as `domain::error`: a root `Error` holding an
//! `error_kind` and the optional error that caused it. The `Display` output
//! is what subscribers see in the `message` of an `error` event, so it stays
//! short and human-readable.

use chrono::{DateTime, Utc};
use std::error::Error as StdError;
use std::fmt;

#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: ErrorKind,
}

/// Categories of upstream fetch failures.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorKind {
    /// The repository does not exist or is not visible to the configured token.
    NotFound,
    /// Upstream refused the request because the rate limit is exhausted.
    RateLimited { reset_at: Option<DateTime<Utc>> },
    /// Missing or invalid credentials.
    Unauthorized,
    /// Credentials are valid but lack access.
    Forbidden,
    /// The fetch did not complete within the configured timeout.
    Timeout,
    /// Connection, TLS or protocol failure before a response was read.
    Network,
    Other(String),
}

impl Error {
    pub fn new(error_kind: ErrorKind) -> Self {
        Self {
            source: None,
            error_kind,
        }
    }

    pub fn with_source(mut self, source: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn timeout() -> Self {
        Self::new(ErrorKind::Timeout)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ErrorKind::NotFound => write!(f, "repository not found"),
            ErrorKind::RateLimited {
                reset_at: Some(reset_at),
            } => write!(f, "rate limit exceeded, resets at {}", reset_at.to_rfc3339()),
            ErrorKind::RateLimited { reset_at: None } => write!(f, "rate limit exceeded"),
            ErrorKind::Unauthorized => write!(f, "authentication failed"),
            ErrorKind::Forbidden => write!(f, "access forbidden"),
            ErrorKind::Timeout => write!(f, "request timed out"),
            ErrorKind::Network => write!(f, "network error"),
            ErrorKind::Other(message) => write!(f, "{message}"),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.source {
            Some(source) => write!(f, "{}: {}", self.error_kind, source),
            None => write!(f, "{}", self.error_kind),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}
