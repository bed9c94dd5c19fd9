//! Error types for the `sse` crate.
//!
//! Follows the same pattern as domain::error with a root Error struct and an error kind enum.

use std::error::Error as StdError;
use std::fmt;

#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: ErrorKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The channel was torn down between lookup and attach.
    ChannelClosed,
    /// The connection's stream is gone and no longer accepts frames.
    ConnectionClosed,
    /// The manager has been shut down and refuses new subscriptions.
    ShuttingDown,
    /// An event could not be serialized to its wire form.
    Encode,
}

impl Error {
    pub fn new(error_kind: ErrorKind) -> Self {
        Self {
            source: None,
            error_kind,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let description = match self.error_kind {
            ErrorKind::ChannelClosed => "channel closed",
            ErrorKind::ConnectionClosed => "connection closed",
            ErrorKind::ShuttingDown => "server is shutting down",
            ErrorKind::Encode => "failed to encode event",
        };
        match &self.source {
            Some(source) => write!(f, "{description}: {source}"),
            None => write!(f, "{description}"),
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

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error {
            source: Some(Box::new(err)),
            error_kind: ErrorKind::Encode,
        }
    }
}
