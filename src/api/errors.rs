use thiserror::Error;

/// Errors surfaced by the triage API boundary.
///
/// Transport problems and non-success statuses both end up here; the
/// workflow layer folds them into its own submission error with the
/// human-readable message preserved.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("server returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("no bearer credential available for {operation}")]
    MissingCredential { operation: &'static str },
}

impl ApiError {
    /// True when retrying the same request could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Transport(err) => err.is_timeout() || err.is_connect(),
            ApiError::Status { status, .. } => *status >= 500,
            ApiError::MissingCredential { .. } => false,
        }
    }
}
