//! Command implementations behind the `reqpipe` binary.

use anyhow::{Context, Result, bail};
use log::{debug, info};
use std::io::Write;
use std::path::Path;
use tokio_util::sync::CancellationToken;

use crate::config::{ClientOptions, split_plugins};
use crate::http::{DispatchError, HttpClient, Method, RequestEnvelope, Response};

/// Option values given on the command line; each one overrides the
/// corresponding value from the config file.
#[derive(Debug, Default, Clone)]
pub struct OptionOverrides {
    pub plugins: Option<String>,
    pub max_attempts: Option<u32>,
    pub base_delay_ms: Option<u64>,
    pub max_delay_ms: Option<u64>,
    pub timeout_ms: Option<u64>,
}

/// What to send.
#[derive(Debug, Default, Clone)]
pub struct RequestSpec {
    pub method: String,
    pub url: String,
    pub headers: Vec<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub data: Option<String>,
}

/// Loads options from `config` (if any) and applies `overrides`.
pub fn resolve_options(config: Option<&Path>, overrides: &OptionOverrides) -> Result<ClientOptions> {
    let mut options = match config {
        Some(path) => ClientOptions::from_path(path)?,
        None => ClientOptions::default(),
    };

    if let Some(plugins) = &overrides.plugins {
        options.plugins = split_plugins(plugins);
    }
    if let Some(max_attempts) = overrides.max_attempts {
        options.max_attempts = max_attempts;
    }
    if let Some(base_delay_ms) = overrides.base_delay_ms {
        options.base_delay_ms = base_delay_ms;
    }
    if let Some(max_delay_ms) = overrides.max_delay_ms {
        options.max_delay_ms = max_delay_ms;
    }
    if let Some(timeout_ms) = overrides.timeout_ms {
        options.timeout_ms = Some(timeout_ms);
    }

    options.validate()?;
    Ok(options)
}

/// Builds an envelope from command line values.
pub fn build_envelope(spec: &RequestSpec) -> Result<RequestEnvelope> {
    let method: Method = spec.method.parse()?;
    let mut builder = RequestEnvelope::builder(method, &spec.url);

    for header in &spec.headers {
        let (name, value) = header
            .split_once(':')
            .with_context(|| format!("Invalid header '{}', expected 'name: value'", header))?;
        builder = builder.header(name.trim(), value.trim());
    }

    if let Some(username) = &spec.username {
        builder = builder.basic_auth(username, spec.password.as_deref());
    }

    if let Some(data) = &spec.data {
        let value: serde_json::Value =
            serde_json::from_str(data).context("Request data is not valid JSON")?;
        builder = builder.json(value);
    }

    Ok(builder.build()?)
}

/// Sends one request and writes the status line and body to `out`.
/// HTTP failures still print the response before the error is returned.
#[tracing::instrument(skip(options, spec, cancel, out))]
pub async fn request<W: Write>(
    options: &ClientOptions,
    spec: &RequestSpec,
    cancel: &CancellationToken,
    out: &mut W,
) -> Result<()> {
    let client = HttpClient::from_config(options)?;
    let envelope = build_envelope(spec)?;

    info!("{} {}", envelope.method(), envelope.redacted_url());
    match client.dispatch_with_cancel(&envelope, cancel).await {
        Ok(response) => {
            print_response(&response, out)?;
            Ok(())
        }
        Err(DispatchError::Http { response }) => {
            print_response(&response, out)?;
            bail!("Request failed with HTTP {}", response.status().as_u16())
        }
        Err(e) => Err(e).context("Request failed"),
    }
}

fn print_response<W: Write>(response: &Response, out: &mut W) -> Result<()> {
    debug!("Received {} bytes", response.body().len());
    writeln!(out, "{}", response.status().as_u16())?;
    let body = response.text();
    if !body.is_empty() {
        writeln!(out, "{}", body.trim_end())?;
    }
    Ok(())
}

/// Writes the effective options as pretty JSON.
pub fn show_config<W: Write>(options: &ClientOptions, out: &mut W) -> Result<()> {
    let json = serde_json::to_string_pretty(options).context("Failed to serialize options")?;
    writeln!(out, "{}", json)?;
    Ok(())
}
