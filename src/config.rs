//! Client options: parsing, validation, and translation into pipeline stages.

use anyhow::{Context, Result};
use log::debug;
use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::http::envelope::parse_header;
use crate::http::retry::{
    DEFAULT_BASE_DELAY_MS, DEFAULT_JITTER_RATIO, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_DELAY_MS,
    RetryPolicy, RetryStage,
};
use crate::http::stage::{HeadersStage, Stage};
use crate::http::DispatchError;

/// User agent sent when the options do not name one.
pub const DEFAULT_USER_AGENT: &str = concat!("reqpipe/", env!("REQPIPE_VERSION"));

/// Stages that can be named in the `plugins` option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Plugin {
    Retry,
    Headers,
}

impl FromStr for Plugin {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "retry" => Ok(Plugin::Retry),
            "headers" => Ok(Plugin::Headers),
            other => Err(DispatchError::Configuration(format!(
                "unknown plugin '{}' (expected one of: retry, headers)",
                other
            ))),
        }
    }
}

/// Options recognised by [`HttpClient`](crate::http::HttpClient).
///
/// Field names follow the JSON form, e.g. `{"plugins": "retry", "maxAttempts": 5}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientOptions {
    /// Stage names in registration order. Accepts `"retry"`,
    /// `"retry,headers"` or `["retry", "headers"]`.
    #[serde(deserialize_with = "deserialize_plugins")]
    pub plugins: Vec<String>,
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub jitter_ratio: f64,
    pub retry_status_codes: Vec<u16>,
    pub timeout_ms: Option<u64>,
    pub user_agent: Option<String>,
    pub default_headers: BTreeMap<String, String>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            plugins: Vec::new(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay_ms: DEFAULT_BASE_DELAY_MS,
            max_delay_ms: DEFAULT_MAX_DELAY_MS,
            jitter_ratio: DEFAULT_JITTER_RATIO,
            retry_status_codes: crate::http::retry::default_retryable_status_codes()
                .into_iter()
                .collect(),
            timeout_ms: None,
            user_agent: None,
            default_headers: BTreeMap::new(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PluginList {
    One(String),
    Many(Vec<String>),
}

fn deserialize_plugins<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match PluginList::deserialize(deserializer)? {
        PluginList::One(list) => split_plugins(&list),
        PluginList::Many(names) => names,
    })
}

/// Splits a comma separated plugin list, dropping empty entries.
pub fn split_plugins(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

impl ClientOptions {
    /// Options with the given plugins installed and defaults elsewhere.
    pub fn with_plugins(plugins: &[&str]) -> Self {
        Self {
            plugins: plugins.iter().map(|p| p.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse client options")
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        debug!("Loading client options from {:?}...", path);
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read client options from {:?}", path))?;
        Self::from_json_str(&content)
            .with_context(|| format!("Invalid client options in {:?}", path))
    }

    /// Checks every option; the first problem is reported as
    /// [`DispatchError::Configuration`].
    pub fn validate(&self) -> Result<(), DispatchError> {
        let invalid = |msg: String| Err(DispatchError::Configuration(msg));

        self.plugins()?;

        if self.max_attempts < 1 {
            return invalid("maxAttempts must be at least 1".to_string());
        }
        if self.max_delay_ms < self.base_delay_ms {
            return invalid(format!(
                "maxDelayMs ({}) must not be smaller than baseDelayMs ({})",
                self.max_delay_ms, self.base_delay_ms
            ));
        }
        if !self.jitter_ratio.is_finite() || !(0.0..=1.0).contains(&self.jitter_ratio) {
            return invalid(format!(
                "jitterRatio must be between 0 and 1, got {}",
                self.jitter_ratio
            ));
        }
        for code in &self.retry_status_codes {
            if StatusCode::from_u16(*code).is_err() {
                return invalid(format!("retryStatusCodes contains invalid status {}", code));
            }
        }
        if self.timeout_ms == Some(0) {
            return invalid("timeoutMs must be greater than 0".to_string());
        }
        self.default_header_map()?;
        Ok(())
    }

    /// Plugins in registration order; unknown or repeated names are rejected.
    pub fn plugins(&self) -> Result<Vec<Plugin>, DispatchError> {
        let mut plugins = Vec::with_capacity(self.plugins.len());
        for name in &self.plugins {
            let plugin: Plugin = name.parse()?;
            if plugins.contains(&plugin) {
                return Err(DispatchError::Configuration(format!(
                    "plugin '{}' is listed more than once",
                    name
                )));
            }
            plugins.push(plugin);
        }
        Ok(plugins)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::standard()
            .max_attempts(self.max_attempts)
            .base_delay(Duration::from_millis(self.base_delay_ms))
            .max_delay(Duration::from_millis(self.max_delay_ms))
            .jitter_ratio(self.jitter_ratio)
            .retryable_status_codes(self.retry_status_codes.iter().copied())
    }

    pub fn default_header_map(&self) -> Result<HeaderMap, DispatchError> {
        let mut headers = HeaderMap::new();
        for (name, value) in &self.default_headers {
            let (name, value) =
                parse_header(name, value).map_err(|e| DispatchError::Configuration(e.to_string()))?;
            headers.insert(name, value);
        }
        Ok(headers)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    pub fn user_agent(&self) -> &str {
        self.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT)
    }

    /// Validates the options and builds the stages they name.
    pub fn stages(&self) -> Result<Vec<Stage>, DispatchError> {
        self.validate()?;
        self.plugins()?
            .into_iter()
            .map(|plugin| -> Result<Stage, DispatchError> {
                Ok(match plugin {
                    Plugin::Retry => Stage::Retry(RetryStage::new(self.retry_policy())),
                    Plugin::Headers => Stage::Headers(HeadersStage::new(self.default_header_map()?)),
                })
            })
            .collect()
    }
}
