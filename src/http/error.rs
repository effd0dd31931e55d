//! Error taxonomy for dispatches and envelope construction.

use reqwest::StatusCode;
use thiserror::Error;

use super::response::Response;

/// Coarse classification of a transport-level failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NetworkErrorKind {
    /// Connection refused, reset, or DNS failure.
    Connect,
    /// The request or response timed out.
    Timeout,
    /// The response body could not be read.
    Body,
    /// The response could not be decoded.
    Decode,
    /// The request could not be sent.
    Request,
    Other,
}

impl std::fmt::Display for NetworkErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            NetworkErrorKind::Connect => "connect",
            NetworkErrorKind::Timeout => "timeout",
            NetworkErrorKind::Body => "body",
            NetworkErrorKind::Decode => "decode",
            NetworkErrorKind::Request => "request",
            NetworkErrorKind::Other => "other",
        };
        f.write_str(name)
    }
}

/// The failure side of an [`Outcome`](super::Outcome).
#[derive(Debug, Clone, Error)]
pub enum DispatchError {
    /// The transport could not complete the exchange.
    #[error("network error ({kind}): {message}")]
    Network {
        kind: NetworkErrorKind,
        message: String,
    },

    /// The server answered with a non-2xx status.
    #[error("HTTP {} error", .response.status().as_u16())]
    Http { response: Response },

    /// The caller aborted the dispatch.
    #[error("dispatch cancelled")]
    Cancelled,

    /// Invalid client options, reported at construction time.
    #[error("invalid configuration: {0}")]
    Configuration(String),
}

impl DispatchError {
    pub fn network(kind: NetworkErrorKind, message: impl Into<String>) -> Self {
        DispatchError::Network {
            kind,
            message: message.into(),
        }
    }

    /// Status code of an HTTP failure, `None` for every other kind.
    pub fn status_code(&self) -> Option<StatusCode> {
        match self {
            DispatchError::Http { response } => Some(response.status()),
            _ => None,
        }
    }

    /// The response carried by an HTTP failure.
    pub fn response(&self) -> Option<&Response> {
        match self {
            DispatchError::Http { response } => Some(response),
            _ => None,
        }
    }

    pub fn is_network(&self) -> bool {
        matches!(self, DispatchError::Network { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, DispatchError::Cancelled)
    }
}

impl From<reqwest::Error> for DispatchError {
    fn from(error: reqwest::Error) -> Self {
        let kind = if error.is_timeout() {
            NetworkErrorKind::Timeout
        } else if error.is_connect() {
            NetworkErrorKind::Connect
        } else if error.is_body() {
            NetworkErrorKind::Body
        } else if error.is_decode() {
            NetworkErrorKind::Decode
        } else if error.is_request() {
            NetworkErrorKind::Request
        } else {
            NetworkErrorKind::Other
        };
        // reqwest's message embeds the request URL, which may carry a password.
        DispatchError::network(kind, error.without_url().to_string())
    }
}

/// Errors raised while building a [`RequestEnvelope`](super::RequestEnvelope).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvelopeError {
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("unsupported URL scheme '{0}' (expected http or https)")]
    UnsupportedScheme(String),

    #[error("unsupported HTTP method '{0}'")]
    UnsupportedMethod(String),

    #[error("credentials must have a non-empty username")]
    EmptyUsername,

    #[error("invalid header '{name}': {reason}")]
    InvalidHeader { name: String, reason: String },
}
