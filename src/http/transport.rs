//! The network boundary of the pipeline.

use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use reqwest::header::AUTHORIZATION;

use super::envelope::RequestEnvelope;
use super::response::{Outcome, Response};

/// Performs one physical HTTP exchange. Implementations must resolve every
/// call to exactly one [`Outcome`]; failures to reach the server are
/// [`DispatchError::Network`](super::DispatchError::Network).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, envelope: &RequestEnvelope) -> Outcome;
}

/// [`Transport`] backed by a `reqwest::Client`.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    #[tracing::instrument(skip(self, envelope), fields(method = %envelope.method(), url = %envelope.redacted_url()))]
    async fn send(&self, envelope: &RequestEnvelope) -> Outcome {
        let mut request = self
            .client
            .request(envelope.method().into(), envelope.url().clone())
            .headers(envelope.headers().clone());

        if let Some(credentials) = envelope.auth() {
            // An explicit authorization header takes precedence.
            if !envelope.headers().contains_key(AUTHORIZATION) {
                request = request.basic_auth(credentials.username(), credentials.password());
            }
        }

        if let Some(body) = envelope.body() {
            request = request.body(body.to_bytes());
        }

        let response = request.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;

        debug!("{} {} -> {}", envelope.method(), envelope.redacted_url(), status);

        Response::new(status)
            .with_headers(headers)
            .with_body(body.to_vec())
            .into_outcome()
    }
}
