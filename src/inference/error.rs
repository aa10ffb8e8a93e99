//! Inference error taxonomy.

use thiserror::Error;

/// Why a backend interaction did not produce usable text.
///
/// These never escape the client or the orchestrator; each one is turned
/// into a retry, a breaker failure or a fallback answer.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum InferenceError {
    /// Connection refused, DNS failure, reset.
    #[error("backend unreachable: {0}")]
    NetworkUnavailable(String),

    /// The call exceeded its deadline.
    #[error("backend call timed out: {0}")]
    Timeout(String),

    /// Non-success HTTP status.
    #[error("backend returned status {0}")]
    BadStatus(u16),

    /// Body was not the JSON shape we expect.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// Text was empty, too short or boilerplate.
    #[error("response rejected: {0}")]
    EmptyOrRejectedContent(String),

    /// The requested model is missing on the backend.
    #[error("model '{0}' is not ready")]
    ModelNotReady(String),

    #[error("initialization still in progress")]
    InitializationPending,

    #[error("initialization failed")]
    InitializationFailed,

    /// The operation's circuit breaker refused the call.
    #[error("circuit open for {0}")]
    CircuitOpen(&'static str),
}

impl InferenceError {
    /// Transient failures worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            InferenceError::NetworkUnavailable(_) | InferenceError::Timeout(_) => true,
            InferenceError::BadStatus(status) => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Classify a transport error from reqwest.
    pub fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            InferenceError::Timeout(e.to_string())
        } else if let Some(status) = e.status() {
            InferenceError::BadStatus(status.as_u16())
        } else if e.is_decode() {
            InferenceError::MalformedPayload(e.to_string())
        } else {
            InferenceError::NetworkUnavailable(e.to_string())
        }
    }
}

/// Result type for inference operations.
pub type InferenceResult<T> = Result<T, InferenceError>;
