//! Request pipeline: envelopes, stages, the retry stage, and the transport boundary.

mod client;
pub mod envelope;
mod error;
mod response;
pub mod retry;
pub mod stage;
mod transport;

pub use client::{DispatchHandle, HttpClient};
pub use envelope::{Body, Credentials, EnvelopeBuilder, Method, RequestEnvelope};
pub use error::{DispatchError, EnvelopeError, NetworkErrorKind};
pub use response::{Outcome, Response};
pub use retry::{RetryPhase, RetryPolicy, RetryStage, RetryState};
pub use stage::{ActiveStage, HeadersStage, Stage, Verdict};
pub use transport::{ReqwestTransport, Transport};
