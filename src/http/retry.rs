//! Retry stage: outcome classification, exponential backoff and the
//! per-dispatch retry state machine.

use log::{debug, warn};
use rand::Rng;
use reqwest::StatusCode;
use std::collections::BTreeSet;
use std::time::Duration;

use super::envelope::RequestEnvelope;
use super::error::DispatchError;
use super::response::Outcome;
use super::stage::Verdict;

/// Default number of physical attempts per dispatch.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default delay before the first retry, in milliseconds.
pub const DEFAULT_BASE_DELAY_MS: u64 = 250;

/// Default upper bound for a single backoff delay, in milliseconds.
pub const DEFAULT_MAX_DELAY_MS: u64 = 30_000;

/// Default jitter, as a fraction of the computed delay.
pub const DEFAULT_JITTER_RATIO: f64 = 0.1;

pub fn default_retryable_status_codes() -> BTreeSet<u16> {
    [429_u16, 500, 502, 503, 504].into_iter().collect()
}

/// Which outcomes are retried, how often, and how long to wait in between.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
    jitter_ratio: f64,
    retryable_status_codes: BTreeSet<u16>,
}

impl RetryPolicy {
    pub fn standard() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: Duration::from_millis(DEFAULT_BASE_DELAY_MS),
            max_delay: Duration::from_millis(DEFAULT_MAX_DELAY_MS),
            jitter_ratio: DEFAULT_JITTER_RATIO,
            retryable_status_codes: default_retryable_status_codes(),
        }
    }

    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        if self.max_delay < self.base_delay {
            self.max_delay = self.base_delay;
        }
        self
    }

    pub fn max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay.max(self.base_delay);
        self
    }

    pub fn jitter_ratio(mut self, jitter_ratio: f64) -> Self {
        self.jitter_ratio = if jitter_ratio.is_finite() {
            jitter_ratio.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self
    }

    pub fn retryable_status_codes(mut self, codes: impl IntoIterator<Item = u16>) -> Self {
        self.retryable_status_codes = codes.into_iter().collect();
        self
    }

    pub fn configured_max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn configured_max_delay(&self) -> Duration {
        self.max_delay
    }

    fn is_retryable_status(&self, status: StatusCode) -> bool {
        self.retryable_status_codes.contains(&status.as_u16())
    }

    /// Network failures and the configured statuses are retryable; every
    /// other failure is terminal.
    pub fn is_retryable(&self, error: &DispatchError) -> bool {
        match error {
            DispatchError::Network { .. } => true,
            DispatchError::Http { response } => self.is_retryable_status(response.status()),
            DispatchError::Cancelled | DispatchError::Configuration(_) => false,
        }
    }

    /// Delay before retry number `retry_index` (0 for the first retry),
    /// without jitter: `min(max_delay, base_delay * 2^retry_index)`.
    pub fn base_backoff(&self, retry_index: u32) -> Duration {
        let multiplier = 1_u128 << retry_index.min(31);
        let delay_ms = self
            .base_delay
            .as_millis()
            .saturating_mul(multiplier)
            .min(self.max_delay.as_millis())
            .min(u64::MAX as u128) as u64;
        Duration::from_millis(delay_ms)
    }

    /// [`base_backoff`](Self::base_backoff) with jitter applied, never above `max_delay`.
    pub fn backoff(&self, retry_index: u32) -> Duration {
        self.apply_jitter(self.base_backoff(retry_index))
    }

    fn apply_jitter(&self, delay: Duration) -> Duration {
        if self.jitter_ratio <= f64::EPSILON {
            return delay;
        }

        let delay_ms = delay.as_millis().min(u64::MAX as u128) as u64;
        let span = ((delay_ms as f64) * self.jitter_ratio).round() as u64;
        if span == 0 {
            return delay;
        }

        let low = delay_ms.saturating_sub(span);
        let high = delay_ms.saturating_add(span);
        let max_ms = self.max_delay.as_millis().min(u64::MAX as u128) as u64;
        let sampled = rand::thread_rng().gen_range(low..=high).min(max_ms);
        Duration::from_millis(sampled)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::standard()
    }
}

/// Lifecycle of one logical dispatch as seen by the retry stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryPhase {
    Idle,
    Attempting,
    WaitingBackoff,
    Exhausted,
    Done,
}

/// Per-dispatch retry bookkeeping. Created when a dispatch starts and
/// dropped when it resolves.
#[derive(Debug, Clone)]
pub struct RetryState {
    phase: RetryPhase,
    attempts: u32,
    max_attempts: u32,
    next_delay: Option<Duration>,
}

impl RetryState {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            phase: RetryPhase::Idle,
            attempts: 0,
            max_attempts: max_attempts.max(1),
            next_delay: None,
        }
    }

    pub fn phase(&self) -> RetryPhase {
        self.phase
    }

    /// Physical attempts started so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn remaining(&self) -> u32 {
        self.max_attempts.saturating_sub(self.attempts)
    }

    pub fn next_delay(&self) -> Option<Duration> {
        self.next_delay
    }

    fn transition(&mut self, from: &[RetryPhase], to: RetryPhase) -> bool {
        if !from.contains(&self.phase) {
            debug!("retry: ignoring transition {:?} -> {:?}", self.phase, to);
            return false;
        }
        debug!("retry: {:?} -> {:?}", self.phase, to);
        self.phase = to;
        true
    }

    /// Idle or WaitingBackoff -> Attempting.
    pub fn begin_attempt(&mut self) {
        if self.transition(
            &[RetryPhase::Idle, RetryPhase::WaitingBackoff],
            RetryPhase::Attempting,
        ) {
            self.attempts += 1;
            self.next_delay = None;
        }
    }

    /// Attempting -> WaitingBackoff.
    pub fn back_off(&mut self, delay: Duration) {
        if self.transition(&[RetryPhase::Attempting], RetryPhase::WaitingBackoff) {
            self.next_delay = Some(delay);
        }
    }

    /// Attempting -> Exhausted -> Done.
    pub fn exhaust(&mut self) {
        if self.transition(&[RetryPhase::Attempting], RetryPhase::Exhausted) {
            self.transition(&[RetryPhase::Exhausted], RetryPhase::Done);
        }
    }

    /// Attempting -> Done.
    pub fn finish(&mut self) {
        self.transition(&[RetryPhase::Attempting], RetryPhase::Done);
    }
}

/// Pipeline stage that re-runs the dispatch on retryable failures.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RetryStage {
    policy: RetryPolicy,
}

impl RetryStage {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn start(&self) -> RetryState {
        RetryState::new(self.policy.max_attempts)
    }

    pub fn before_send(&self, state: &mut RetryState, envelope: RequestEnvelope) -> RequestEnvelope {
        state.begin_attempt();
        envelope
    }

    pub fn after_receive(&self, state: &mut RetryState, outcome: Outcome) -> Verdict {
        let error = match &outcome {
            Ok(_) => {
                state.finish();
                return Verdict::Resolve(outcome);
            }
            Err(error) => error,
        };

        if !self.policy.is_retryable(error) {
            debug!("non-retryable failure: {}", error);
            state.finish();
            return Verdict::Resolve(outcome);
        }

        if state.remaining() == 0 {
            warn!(
                "attempt {}/{} failed ({}), giving up",
                state.attempts(),
                state.max_attempts,
                error
            );
            state.exhaust();
            return Verdict::Resolve(outcome);
        }

        let delay = self.policy.backoff(state.attempts().saturating_sub(1));
        warn!(
            "attempt {}/{} failed ({}), retrying in {}ms...",
            state.attempts(),
            state.max_attempts,
            error,
            delay.as_millis()
        );
        state.back_off(delay);
        Verdict::Retry { delay }
    }
}
