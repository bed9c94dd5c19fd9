use std::error::Error as StdError;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use log::*;

use sse::{Error as SseError, ErrorKind as SseErrorKind};

#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: WebErrorKind,
}

/// What went wrong while handling a request, in terms of the HTTP response it becomes.
#[derive(Debug, PartialEq)]
pub enum WebErrorKind {
    /// A path segment is not a valid GitHub owner or repository name.
    InvalidPath(String),
    /// The server is shutting down and refuses new streams.
    Unavailable,
    Internal,
}

impl Error {
    pub fn invalid_path(message: impl Into<String>) -> Self {
        Error {
            source: None,
            error_kind: WebErrorKind::InvalidPath(message.into()),
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

impl std::fmt::Display for Error {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> core::result::Result<(), std::fmt::Error> {
        write!(fmt, "{self:?}")
    }
}

// List of possible StatusCode variants https://docs.rs/http/latest/http/status/struct.StatusCode.html#associatedconstant.UNPROCESSABLE_ENTITY
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self.error_kind {
            WebErrorKind::InvalidPath(message) => {
                (StatusCode::BAD_REQUEST, message).into_response()
            }
            WebErrorKind::Unavailable => {
                (StatusCode::SERVICE_UNAVAILABLE, "SERVICE UNAVAILABLE").into_response()
            }
            WebErrorKind::Internal => {
                if let Some(source) = &self.source {
                    error!("Internal error while handling request: {source}");
                }
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL SERVER ERROR").into_response()
            }
        }
    }
}

impl From<SseError> for Error {
    fn from(err: SseError) -> Self {
        let error_kind = match err.error_kind {
            SseErrorKind::ShuttingDown | SseErrorKind::ChannelClosed => WebErrorKind::Unavailable,
            SseErrorKind::ConnectionClosed | SseErrorKind::Encode => WebErrorKind::Internal,
        };
        Error {
            source: Some(Box::new(err)),
            error_kind,
        }
    }
}
