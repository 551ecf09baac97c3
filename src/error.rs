//! Error taxonomy for the Pandora client.
//!
//! Every fallible operation in the library returns [`PandoraError`]. The
//! variants mirror how a failure must be treated by the caller: `Auth` and
//! `PremiumRequired` end the program at startup, `ApiShape` is a logic error
//! that is never retried, `Transient` (and 5xx statuses) may be retried by
//! [`crate::pandora::retry::RetryPolicy`], and `RetryExhausted` is fatal.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PandoraError {
    /// Missing or unobtainable CSRF token, auth token or listener identity.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// A response did not match the shape the caller asked for.
    #[error("Unexpected API response: expected {expected}, found {found}")]
    ApiShape { expected: String, found: String },

    /// Connection, timeout or request failure in the transport.
    #[error("Network error: {0}")]
    Transient(String),

    #[error("Gave up after {attempts} attempts: {last}")]
    RetryExhausted { attempts: u32, last: String },

    /// The account tier cannot use the playback API.
    #[error("Pandora Premium is required: {0}")]
    PremiumRequired(String),

    /// A local lookup (annotation, session, source) found nothing.
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Pandora API error (status {code}): {message}")]
    Status { code: u16, message: String },

    #[error("Audio decode error: {0}")]
    Decode(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Player error: {0}")]
    Player(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PandoraError {
    pub fn shape(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::ApiShape {
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Whether [`crate::pandora::retry::RetryPolicy`] may try again after this error.
    pub fn is_retryable(&self) -> bool {
        match self {
            PandoraError::Transient(_) => true,
            PandoraError::Status { code, .. } => *code >= 500,
            _ => false,
        }
    }

    /// Whether this error should terminate the process with a zero status.
    pub fn is_graceful(&self) -> bool {
        matches!(self, PandoraError::PremiumRequired(_))
    }
}

impl From<reqwest::Error> for PandoraError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return PandoraError::Status {
                code: status.as_u16(),
                message: err.to_string(),
            };
        }
        if err.is_decode() {
            return PandoraError::shape("JSON body", err.to_string());
        }
        PandoraError::Transient(err.to_string())
    }
}
