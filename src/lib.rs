// MediAlert Client Core - Triage & Booking Workflows
// This exposes the workflow engine for testing and host integration

pub mod api;
pub mod config;
pub mod telemetry;
pub mod triage;
pub mod workflow;

// Re-export key types for easy access
pub use api::{ApiError, AssessmentRequest, BookingRequest, Doctor, HttpTriageApi, TriageApi};
pub use config::{config, init_config, MediAlertConfig};
pub use telemetry::{generate_correlation_id, init_telemetry};
pub use triage::{
    classify_assessment, classify_booking, AssessmentOutcome, BookingConfirmation, GuidanceDetail,
    SeverityLevel, DEFAULT_EMERGENCY_NUMBER,
};
pub use workflow::{
    Advance, AssessmentDefaults, AssessmentStep, AssessmentUpdate, AssessmentWorkflow,
    BookingStep, BookingUpdate, BookingWorkflow, CancelHandle, EventSink, GeoPoint, LogSink,
    RetreatSignal, WorkflowError, WorkflowEvent,
};
