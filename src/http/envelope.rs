//! Immutable description of one outbound request.

use reqwest::Url;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::error::EnvelopeError;

/// HTTP verbs the client can send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Head,
    Post,
    Put,
    Patch,
    Delete,
    Options,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
            Method::Options => "OPTIONS",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = EnvelopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "HEAD" => Ok(Method::Head),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "PATCH" => Ok(Method::Patch),
            "DELETE" => Ok(Method::Delete),
            "OPTIONS" => Ok(Method::Options),
            _ => Err(EnvelopeError::UnsupportedMethod(s.to_string())),
        }
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Head => reqwest::Method::HEAD,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
            Method::Options => reqwest::Method::OPTIONS,
        }
    }
}

/// Username/password pair for basic authentication.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: Option<String>,
}

impl Credentials {
    pub fn new(
        username: impl Into<String>,
        password: Option<String>,
    ) -> Result<Self, EnvelopeError> {
        let username = username.into();
        if username.is_empty() {
            return Err(EnvelopeError::EmptyUsername);
        }
        Ok(Self { username, password })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Request payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Bytes(Vec<u8>),
    Json(serde_json::Value),
}

impl Body {
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Body::Bytes(bytes) => bytes.clone(),
            Body::Json(value) => value.to_string().into_bytes(),
        }
    }
}

/// An outbound request. Fields are fixed at construction; stages derive
/// modified copies instead of mutating the caller's envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestEnvelope {
    method: Method,
    url: Url,
    headers: HeaderMap,
    auth: Option<Credentials>,
    body: Option<Body>,
}

impl RequestEnvelope {
    pub fn builder(method: Method, url: &str) -> EnvelopeBuilder {
        EnvelopeBuilder::new(method, url)
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// The URL with any embedded password replaced by `***`, for logging.
    pub fn redacted_url(&self) -> Url {
        let mut url = self.url.clone();
        if url.password().is_some() {
            let _ = url.set_password(Some("***"));
        }
        url
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn auth(&self) -> Option<&Credentials> {
        self.auth.as_ref()
    }

    pub fn body(&self) -> Option<&Body> {
        self.body.as_ref()
    }

    /// Returns a copy that also carries every value of each header in
    /// `defaults` whose name the envelope does not set already.
    pub fn with_default_headers(mut self, defaults: &HeaderMap) -> Self {
        for name in defaults.keys() {
            if self.headers.contains_key(name) {
                continue;
            }
            for value in defaults.get_all(name) {
                self.headers.append(name.clone(), value.clone());
            }
        }
        self
    }
}

/// Builder for [`RequestEnvelope`]. The first invalid input is kept and
/// reported by [`EnvelopeBuilder::build`].
#[derive(Debug)]
pub struct EnvelopeBuilder {
    method: Method,
    url: Result<Url, EnvelopeError>,
    headers: HeaderMap,
    auth: Option<Credentials>,
    body: Option<Body>,
    error: Option<EnvelopeError>,
}

impl EnvelopeBuilder {
    fn new(method: Method, url: &str) -> Self {
        Self {
            method,
            url: parse_url(url),
            headers: HeaderMap::new(),
            auth: None,
            body: None,
            error: None,
        }
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        match parse_header(name, value) {
            Ok((name, value)) => {
                self.headers.append(name, value);
            }
            Err(e) => self.record(e),
        }
        self
    }

    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers.extend(headers);
        self
    }

    pub fn basic_auth(mut self, username: &str, password: Option<&str>) -> Self {
        match Credentials::new(username, password.map(str::to_string)) {
            Ok(credentials) => self.auth = Some(credentials),
            Err(e) => self.record(e),
        }
        self
    }

    pub fn body(mut self, bytes: impl Into<Vec<u8>>) -> Self {
        self.body = Some(Body::Bytes(bytes.into()));
        self
    }

    pub fn json(mut self, value: serde_json::Value) -> Self {
        self.headers
            .entry(CONTENT_TYPE)
            .or_insert(HeaderValue::from_static("application/json"));
        self.body = Some(Body::Json(value));
        self
    }

    pub fn build(self) -> Result<RequestEnvelope, EnvelopeError> {
        let url = self.url?;
        if let Some(e) = self.error {
            return Err(e);
        }
        Ok(RequestEnvelope {
            method: self.method,
            url,
            headers: self.headers,
            auth: self.auth,
            body: self.body,
        })
    }

    fn record(&mut self, error: EnvelopeError) {
        self.error.get_or_insert(error);
    }
}

fn parse_url(url: &str) -> Result<Url, EnvelopeError> {
    let parsed = Url::parse(url).map_err(|e| EnvelopeError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    match parsed.scheme() {
        "http" | "https" => {}
        other => return Err(EnvelopeError::UnsupportedScheme(other.to_string())),
    }

    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(EnvelopeError::InvalidUrl {
            url: url.to_string(),
            reason: "missing host".to_string(),
        });
    }

    Ok(parsed)
}

pub(crate) fn parse_header(
    name: &str,
    value: &str,
) -> Result<(HeaderName, HeaderValue), EnvelopeError> {
    let invalid = |reason: String| EnvelopeError::InvalidHeader {
        name: name.to_string(),
        reason,
    };
    let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| invalid(e.to_string()))?;
    let header_value = HeaderValue::from_str(value).map_err(|e| invalid(e.to_string()))?;
    Ok((header_name, header_value))
}
