use thiserror::Error;

/// Errors surfaced by the workflow engine.
///
/// None of these are fatal: every variant leaves the workflow in a state
/// the user can act on (fix the input, retry, go back, or cancel).
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// A step gate rejected `advance()`. The workflow state is unchanged.
    #[error("validation failed at {step}: {reason}")]
    Validation { step: &'static str, reason: String },

    /// The remote call failed. The draft is preserved so the user can
    /// retry without re-entering anything.
    #[error("submission failed: {message}")]
    Submission { message: String },

    /// A submission for this workflow instance is already in flight; no
    /// second request was issued.
    #[error("a submission is already in flight")]
    SubmitInFlight,

    /// The server reported success but omitted a field the outcome
    /// cannot be built without.
    #[error("server response is missing {field}")]
    DataIntegrity { field: &'static str },

    /// A finalize was attempted on a draft whose required fields are not
    /// populated. The step gates make this unreachable in normal use.
    #[error("draft is missing {missing}")]
    IncompleteDraft { missing: &'static str },
}

impl WorkflowError {
    pub fn validation(step: &'static str, reason: impl Into<String>) -> Self {
        WorkflowError::Validation {
            step,
            reason: reason.into(),
        }
    }
}
