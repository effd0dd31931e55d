//! `reqpipe` sends HTTP requests through a pipeline of stages.
//!
//! ```no_run
//! use reqpipe::config::ClientOptions;
//! use reqpipe::http::{HttpClient, Method, RequestEnvelope};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let client = HttpClient::from_config(&ClientOptions::from_json_str(r#"{"plugins": "retry"}"#)?)?;
//!
//! let envelope = RequestEnvelope::builder(Method::Put, "https://example.cloudant.com/animaldb")
//!     .basic_auth("nodejs", Some("secret"))
//!     .build()?;
//!
//! let response = client.dispatch(&envelope).await?;
//! assert_eq!(response.status().as_u16(), 201);
//! # Ok(())
//! # }
//! ```

pub mod commands;
pub mod config;
pub mod http;

#[cfg(test)]
mod test_logs;
