//! Buffered HTTP responses and the dispatch outcome type.

use anyhow::{Context, Result};
use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use serde::de::DeserializeOwned;

use super::error::DispatchError;

/// The single resolved result of a dispatch.
pub type Outcome = std::result::Result<Response, DispatchError>;

/// A fully buffered HTTP response.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl Response {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Vec::new(),
        }
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Builds a response whose body is the serialized JSON value.
    pub fn json_body(status: StatusCode, value: &serde_json::Value) -> Self {
        Self::new(status).with_body(value.to_string())
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Body decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).context("Failed to parse JSON response body")
    }

    /// 2xx responses are successes; everything else becomes [`DispatchError::Http`].
    pub fn into_outcome(self) -> Outcome {
        if self.status.is_success() {
            Ok(self)
        } else {
            Err(DispatchError::Http { response: self })
        }
    }
}
