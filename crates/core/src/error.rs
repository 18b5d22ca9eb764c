use thiserror::Error;

/// The closed set of error kinds used across the pipeline (spec §7).
///
/// Backend adapters classify every raw error (HTTP status, driver exception,
/// timeout) into one of these before it crosses the adapter boundary; nothing
/// upstream of `crates/backends` ever sees a vendor exception type.
#[derive(Error, Debug, Clone)]
pub enum CoreError {
    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("timeout after {0:?}")]
    Timeout(std::time::Duration),

    #[error("query error: {0}")]
    QueryError(String),

    #[error("circuit open for backend '{0}'")]
    CircuitOpen(String),

    #[error("parse error: {0}")]
    ParseError(String),

    #[error("upstream error: {0}")]
    UpstreamError(String),

    #[error("overload, retry after {retry_after_s}s")]
    Overload { retry_after_s: u64 },

    #[error("cancelled")]
    Cancelled,
}

impl CoreError {
    /// Whether the retry policy (spec §4.2) is allowed to retry this kind.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CoreError::Timeout(_) | CoreError::BackendUnavailable(_)
        )
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
