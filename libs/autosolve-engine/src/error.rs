use std::time::Duration;
use thiserror::Error;

/// Failure classes of the solve pipeline.
///
/// None of these cross the item boundary: the pipeline turns each one into
/// an error string stored on the affected item. Every message starts with
/// the failure marker so downstream stages recognise it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SolveError {
    #[error("Error: Generation request failed: {0}")]
    Transport(String),
    #[error("Error: Rate limited by generation service (retry after {}s)", .retry_after.as_secs())]
    RateLimited { retry_after: Duration },
    #[error("Error: Generation service returned HTTP {status}: {body}")]
    Service { status: u16, body: String },
    #[error("Error: Generated code rejected: {0}")]
    GenerationInvalid(String),
    #[error("Error executing code: {0}")]
    ExecutionFault(String),
    #[error("Error: Code execution produced no output.")]
    EmptyOutput,
}

impl SolveError {
    /// Only rate limiting and invalid content are retried
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SolveError::RateLimited { .. } | SolveError::GenerationInvalid(_)
        )
    }
}

impl From<reqwest::Error> for SolveError {
    fn from(err: reqwest::Error) -> Self {
        SolveError::Transport(err.to_string())
    }
}

pub type SolveResult<T> = Result<T, SolveError>;
