pub mod assessment;
pub mod booking;
pub mod draft;
pub mod errors;
pub mod events;
pub mod invoker;
pub mod sequencer;

pub use assessment::{AssessmentStep, AssessmentWorkflow};
pub use booking::{BookingStep, BookingWorkflow};
pub use draft::{
    AssessmentDefaults, AssessmentDraft, AssessmentUpdate, BookingDraft, BookingUpdate, GeoPoint,
};
pub use errors::WorkflowError;
pub use events::{EventSink, LogSink, WorkflowEvent};
pub use invoker::{CancelHandle, RemoteInvoker, SingleFlight};
pub use sequencer::{Backstep, Progress, StepCursor, WorkflowStep};

/// Result of `advance()` on a workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance<S> {
    /// Moved forward one step.
    Moved(S),
    /// The final step was reached and the submission completed; the
    /// outcome is available on the workflow.
    Submitted,
    /// The submission completed after the instance was torn down; the
    /// result was discarded unapplied.
    Discarded,
}

/// Result of `retreat()` on a workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetreatSignal<S> {
    /// Moved back one step; draft fields survive.
    Moved(S),
    /// Already at the first step (or leaving a terminal one); the host
    /// should dismiss the workflow.
    Cancelled,
}
