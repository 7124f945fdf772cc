use thiserror::Error;

use crate::client::ProviderKind;

/// Errors surfaced by the LLM gateway.
///
/// The gateway itself never retries — classification via
/// [`GatewayError::is_transient`] tells the pipeline's retry driver which
/// failures are worth another attempt.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("cannot reach {provider} endpoint: {message}")]
    Unreachable { provider: ProviderKind, message: String },

    #[error("{provider} returned HTTP {status}: {body}")]
    Http {
        provider: ProviderKind,
        status: u16,
        body: String,
    },

    #[error("missing or rejected credentials for {provider}")]
    Auth { provider: ProviderKind },

    #[error("malformed {provider} response: {message}")]
    MalformedResponse { provider: ProviderKind, message: String },
}

impl GatewayError {
    /// Whether a retry could plausibly succeed.
    ///
    /// Network failures, timeouts, rate limits and server errors are
    /// transient; auth failures and malformed response shapes are not.
    pub fn is_transient(&self) -> bool {
        match self {
            GatewayError::Unreachable { .. } => true,
            GatewayError::Http { status, .. } => {
                *status == 408 || *status == 429 || *status >= 500
            }
            GatewayError::Auth { .. } | GatewayError::MalformedResponse { .. } => false,
        }
    }
}

/// Top-level error type for a tutorial generation run.
#[derive(Debug, Error)]
pub enum TutorialError {
    /// LLM output failed schema validation. Always fatal to the current run,
    /// never coerced into a "close enough" value.
    #[error("stage '{stage}' produced invalid output: {message}")]
    Validation { stage: &'static str, message: String },

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// A stage exhausted its retry budget.
    #[error("stage '{stage}' failed after {attempts} attempts: {source}")]
    StageFailed {
        stage: &'static str,
        attempts: u32,
        #[source]
        source: Box<TutorialError>,
    },

    /// A stage's `prepare` read a context field no earlier stage produced.
    #[error("stage '{stage}' requires context field '{key}' which is not set")]
    MissingContext { stage: &'static str, key: &'static str },

    /// One or more chapter items exhausted retries. The run itself completed;
    /// this is only raised by [`RunSummary::ensure_complete`](crate::types::RunSummary::ensure_complete)
    /// for callers that need every chapter.
    #[error("{failed} of {total} chapters failed to generate")]
    PartialBatch { failed: usize, total: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("i/o failure on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl TutorialError {
    pub(crate) fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        TutorialError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, TutorialError>;
