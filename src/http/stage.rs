//! Pipeline stages.
//!
//! A [`Stage`] is installed once on a client and shared by every dispatch.
//! Each dispatch calls [`Stage::start`] to obtain an [`ActiveStage`], which
//! pairs the stage with the state it needs for that dispatch only.

use log::debug;
use reqwest::header::HeaderMap;
use std::time::Duration;

use super::envelope::RequestEnvelope;
use super::response::Outcome;
use super::retry::{RetryStage, RetryState};

/// What a stage decided after seeing an outcome.
#[derive(Debug)]
pub enum Verdict {
    /// Hand this outcome to the next stage (or to the caller).
    Resolve(Outcome),
    /// Run the whole chain again once `delay` has elapsed.
    Retry { delay: Duration },
}

/// The stages a client knows how to install.
#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    Retry(RetryStage),
    Headers(HeadersStage),
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Retry(_) => "retry",
            Stage::Headers(_) => "headers",
        }
    }

    pub fn start(&self) -> ActiveStage<'_> {
        match self {
            Stage::Retry(stage) => ActiveStage::Retry(stage, stage.start()),
            Stage::Headers(stage) => ActiveStage::Headers(stage),
        }
    }
}

/// A stage bound to the state of one dispatch.
#[derive(Debug)]
pub enum ActiveStage<'a> {
    Retry(&'a RetryStage, RetryState),
    Headers(&'a HeadersStage),
}

impl ActiveStage<'_> {
    pub fn before_send(&mut self, envelope: RequestEnvelope) -> RequestEnvelope {
        match self {
            ActiveStage::Retry(stage, state) => stage.before_send(state, envelope),
            ActiveStage::Headers(stage) => stage.before_send(envelope),
        }
    }

    pub fn after_receive(&mut self, outcome: Outcome) -> Verdict {
        match self {
            ActiveStage::Retry(stage, state) => stage.after_receive(state, outcome),
            ActiveStage::Headers(_) => Verdict::Resolve(outcome),
        }
    }
}

/// Adds default headers to every envelope that does not set them itself.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeadersStage {
    defaults: HeaderMap,
}

impl HeadersStage {
    pub fn new(defaults: HeaderMap) -> Self {
        Self { defaults }
    }

    pub fn defaults(&self) -> &HeaderMap {
        &self.defaults
    }

    fn before_send(&self, envelope: RequestEnvelope) -> RequestEnvelope {
        for name in self.defaults.keys() {
            if envelope.headers().contains_key(name) {
                debug!("headers: keeping caller's '{}'", name);
            }
        }
        envelope.with_default_headers(&self.defaults)
    }
}
