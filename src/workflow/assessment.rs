use std::sync::Arc;
use tracing::{debug, info};

use crate::api::TriageApi;
use crate::triage::{classify_assessment, AssessmentOutcome};
use crate::workflow::draft::{AssessmentDefaults, AssessmentDraft, AssessmentUpdate, MAX_AGE, MIN_AGE};
use crate::workflow::errors::WorkflowError;
use crate::workflow::events::{EventSink, WorkflowEvent};
use crate::workflow::invoker::{CancelHandle, RemoteInvoker};
use crate::workflow::sequencer::{Backstep, Progress, StepCursor, WorkflowStep};
use crate::workflow::{Advance, RetreatSignal};

/// Stages of the symptom intake, in walking order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssessmentStep {
    Symptoms,
    PersonalInfo,
    AdditionalInfo,
}

impl WorkflowStep for AssessmentStep {
    const ORDER: &'static [Self] = &[
        AssessmentStep::Symptoms,
        AssessmentStep::PersonalInfo,
        AssessmentStep::AdditionalInfo,
    ];

    fn name(&self) -> &'static str {
        match self {
            AssessmentStep::Symptoms => "symptoms",
            AssessmentStep::PersonalInfo => "personal_info",
            AssessmentStep::AdditionalInfo => "additional_info",
        }
    }
}

/// One run of the symptom intake: collect across three steps, submit
/// exactly once, hold the classified result until torn down.
///
/// Advancing from the last step triggers submission instead of moving;
/// a failed submission leaves the workflow at that step with the draft
/// intact so the user can retry.
pub struct AssessmentWorkflow {
    cursor: StepCursor<AssessmentStep>,
    draft: AssessmentDraft,
    invoker: RemoteInvoker,
    events: Box<dyn EventSink>,
    cancel: CancelHandle,
    emergency_number: String,
    outcome: Option<AssessmentOutcome>,
}

impl AssessmentWorkflow {
    pub fn new(
        api: Arc<dyn TriageApi>,
        defaults: AssessmentDefaults,
        emergency_number: impl Into<String>,
        events: Box<dyn EventSink>,
    ) -> Self {
        Self {
            cursor: StepCursor::new(),
            draft: AssessmentDraft::new(defaults),
            invoker: RemoteInvoker::new(api),
            events,
            cancel: CancelHandle::new(),
            emergency_number: emergency_number.into(),
            outcome: None,
        }
    }

    pub fn current_step(&self) -> AssessmentStep {
        self.cursor.current()
    }

    /// One-based position and total, for "Step 2 of 3" displays.
    pub fn step_position(&self) -> (usize, usize) {
        (self.cursor.position(), self.cursor.len())
    }

    pub fn draft(&self) -> &AssessmentDraft {
        &self.draft
    }

    /// True while a submission is in flight. Hosts disable their submit
    /// control on this flag.
    pub fn is_busy(&self) -> bool {
        self.invoker.is_busy()
    }

    pub fn outcome(&self) -> Option<&AssessmentOutcome> {
        self.outcome.as_ref()
    }

    pub fn is_complete(&self) -> bool {
        self.outcome.is_some()
    }

    /// Handle the host keeps to tear the instance down; a submission
    /// that resolves after this fired is discarded.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn toggle_symptom(&mut self, label: &str) {
        self.draft.toggle_symptom(label);
    }

    pub fn merge(&mut self, update: AssessmentUpdate) {
        self.draft.merge(update);
    }

    pub fn can_advance(&self) -> bool {
        self.gate().is_none() && self.outcome.is_none()
    }

    /// Step gates, pure over the current draft.
    fn gate(&self) -> Option<String> {
        match self.cursor.current() {
            AssessmentStep::Symptoms => {
                (!self.draft.has_symptoms()).then(|| "Please select at least one symptom".to_string())
            }
            AssessmentStep::PersonalInfo => match self.draft.age() {
                None => Some("Please enter your age".to_string()),
                Some(age) if !(MIN_AGE..=MAX_AGE).contains(&age) => {
                    Some(format!("Age must be between {MIN_AGE} and {MAX_AGE}"))
                }
                Some(_) => None,
            },
            AssessmentStep::AdditionalInfo => None,
        }
    }

    /// Move to the next step, or submit when already at the last one.
    /// When the current step's gate rejects, the state is unchanged and
    /// the validation reason is surfaced to the host.
    pub async fn advance(&mut self) -> Result<Advance<AssessmentStep>, WorkflowError> {
        if self.outcome.is_some() {
            return Err(WorkflowError::validation(
                self.cursor.current().name(),
                "assessment already completed",
            ));
        }
        if let Some(reason) = self.gate() {
            self.events.notify(WorkflowEvent::ValidationFailed {
                reason: reason.clone(),
            });
            return Err(WorkflowError::Validation {
                step: self.cursor.current().name(),
                reason,
            });
        }

        match self.cursor.advance() {
            Progress::Moved(step) => {
                info!(step = step.name(), "assessment step advanced");
                self.events.notify(WorkflowEvent::StepChanged { step: step.name() });
                Ok(Advance::Moved(step))
            }
            Progress::AtEnd => self.submit().await,
        }
    }

    /// Move back one step without clearing anything already entered.
    /// From the first step this signals "cancel" to the host instead.
    pub fn retreat(&mut self) -> RetreatSignal<AssessmentStep> {
        match self.cursor.retreat() {
            Backstep::Moved(step) => {
                self.events.notify(WorkflowEvent::StepChanged { step: step.name() });
                RetreatSignal::Moved(step)
            }
            Backstep::AtStart => {
                self.cancel();
                RetreatSignal::Cancelled
            }
        }
    }

    /// Abandon the workflow. Valid from any non-terminal state.
    pub fn cancel(&mut self) {
        if self.cancel.is_active() {
            self.cancel.cancel();
            self.events.notify(WorkflowEvent::Cancelled);
        }
    }

    async fn submit(&mut self) -> Result<Advance<AssessmentStep>, WorkflowError> {
        if self.invoker.is_busy() {
            return Err(WorkflowError::SubmitInFlight);
        }
        let request = self.draft.finalize()?;
        self.events.notify(WorkflowEvent::SubmitStarted);

        match self.invoker.submit_assessment(&request).await {
            Ok(response) => {
                if !self.cancel.is_active() {
                    debug!("workflow torn down mid-submission, result discarded");
                    return Ok(Advance::Discarded);
                }
                let outcome = classify_assessment(response, &self.emergency_number);
                info!(
                    assessment_id = outcome.assessment_id,
                    severity = outcome.severity.label(),
                    "assessment classified"
                );
                self.outcome = Some(outcome);
                self.events.notify(WorkflowEvent::SubmitSucceeded);
                Ok(Advance::Submitted)
            }
            Err(err) => {
                if self.cancel.is_active() {
                    self.events.notify(WorkflowEvent::SubmitFailed {
                        message: err.to_string(),
                    });
                }
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::errors::ApiError;
    use crate::api::types::{
        AssessmentRequest, AssessmentResponse, BookingRequest, BookingResponse, Doctor,
    };
    use crate::triage::SeverityLevel;
    use crate::workflow::draft::GeoPoint;
    use crate::workflow::events::recording::RecordingSink;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use serde_json::json;

    struct StubApi {
        severity: &'static str,
        fail: bool,
    }

    #[async_trait]
    impl TriageApi for StubApi {
        async fn assess(
            &self,
            request: &AssessmentRequest,
        ) -> Result<AssessmentResponse, ApiError> {
            if self.fail {
                return Err(ApiError::Status {
                    status: 500,
                    message: "Internal Server Error".to_string(),
                });
            }
            Ok(AssessmentResponse {
                id: 7,
                severity_level: Some(self.severity.to_string()),
                assessment_result: Some(json!({
                    "recommendation": "Visit emergency room immediately.",
                    "action": "Go to nearest hospital urgently",
                    "estimated_response": "10-15 minutes",
                    "phone": "112"
                })),
                age: Some(request.age),
                pain_rating: Some(request.pain_rating),
                symptoms: Some(format!("{:?}", request.symptoms)),
                created_at: None,
            })
        }

        async fn assessment(&self, _id: u64) -> Result<AssessmentResponse, ApiError> {
            unimplemented!("not exercised by these tests")
        }

        async fn available_doctors(
            &self,
            _specialty: Option<&str>,
        ) -> Result<Vec<Doctor>, ApiError> {
            unimplemented!("not exercised by these tests")
        }

        async fn available_slots(
            &self,
            _doctor_id: &str,
            _date: NaiveDate,
        ) -> Result<Vec<String>, ApiError> {
            unimplemented!("not exercised by these tests")
        }

        async fn book_consultation(
            &self,
            _request: &BookingRequest,
        ) -> Result<BookingResponse, ApiError> {
            unimplemented!("not exercised by these tests")
        }
    }

    fn workflow(severity: &'static str, fail: bool) -> (AssessmentWorkflow, RecordingSink) {
        let sink = RecordingSink::default();
        let workflow = AssessmentWorkflow::new(
            Arc::new(StubApi { severity, fail }),
            AssessmentDefaults {
                location: GeoPoint {
                    latitude: 4.8156,
                    longitude: 6.9271,
                },
                location_address: "Current Location".to_string(),
            },
            "112",
            Box::new(sink.clone()),
        );
        (workflow, sink)
    }

    #[test]
    fn advance_blocked_without_symptoms() {
        let (mut workflow, sink) = workflow("GREEN", false);
        let result = tokio_test::block_on(workflow.advance());
        assert!(matches!(result, Err(WorkflowError::Validation { .. })));
        assert_eq!(workflow.current_step(), AssessmentStep::Symptoms);
        assert!(matches!(
            sink.events().as_slice(),
            [WorkflowEvent::ValidationFailed { .. }]
        ));
    }

    #[test]
    fn advance_blocked_without_age() {
        let (mut workflow, _sink) = workflow("GREEN", false);
        workflow.toggle_symptom("Fever");
        tokio_test::block_on(workflow.advance()).unwrap();
        assert_eq!(workflow.current_step(), AssessmentStep::PersonalInfo);

        let result = tokio_test::block_on(workflow.advance());
        assert!(matches!(result, Err(WorkflowError::Validation { .. })));
        assert_eq!(workflow.current_step(), AssessmentStep::PersonalInfo);
    }

    #[test]
    fn full_intake_submits_and_classifies() {
        let (mut workflow, sink) = workflow("RED", false);
        workflow.toggle_symptom("Fever");
        workflow.toggle_symptom("Cough");
        tokio_test::block_on(workflow.advance()).unwrap();
        workflow.merge(AssessmentUpdate {
            age: Some(34),
            pain_rating: Some(6),
            ..Default::default()
        });
        tokio_test::block_on(workflow.advance()).unwrap();
        assert_eq!(workflow.current_step(), AssessmentStep::AdditionalInfo);

        let result = tokio_test::block_on(workflow.advance()).unwrap();
        assert_eq!(result, Advance::Submitted);
        let outcome = workflow.outcome().unwrap();
        assert_eq!(outcome.severity, SeverityLevel::Red);
        assert_eq!(outcome.emergency_phone.as_deref(), Some("112"));
        assert!(sink.events().contains(&WorkflowEvent::SubmitSucceeded));
    }

    #[test]
    fn failed_submission_preserves_step_and_draft() {
        let (mut workflow, sink) = workflow("RED", true);
        workflow.toggle_symptom("Fever");
        tokio_test::block_on(workflow.advance()).unwrap();
        workflow.merge(AssessmentUpdate {
            age: Some(60),
            ..Default::default()
        });
        tokio_test::block_on(workflow.advance()).unwrap();

        let result = tokio_test::block_on(workflow.advance());
        assert!(matches!(result, Err(WorkflowError::Submission { .. })));
        assert_eq!(workflow.current_step(), AssessmentStep::AdditionalInfo);
        assert_eq!(workflow.draft().age(), Some(60));
        assert!(workflow.outcome().is_none());
        assert!(sink
            .events()
            .iter()
            .any(|e| matches!(e, WorkflowEvent::SubmitFailed { .. })));
    }

    #[test]
    fn retreat_from_first_step_signals_cancel() {
        let (mut workflow, sink) = workflow("GREEN", false);
        assert_eq!(workflow.retreat(), RetreatSignal::Cancelled);
        assert!(sink.events().contains(&WorkflowEvent::Cancelled));
    }

    #[test]
    fn retreat_preserves_entered_fields() {
        let (mut workflow, _sink) = workflow("GREEN", false);
        workflow.toggle_symptom("Fever");
        tokio_test::block_on(workflow.advance()).unwrap();
        workflow.merge(AssessmentUpdate {
            age: Some(34),
            ..Default::default()
        });

        assert_eq!(
            workflow.retreat(),
            RetreatSignal::Moved(AssessmentStep::Symptoms)
        );
        assert_eq!(workflow.draft().age(), Some(34));
        assert!(workflow.draft().has_symptoms());
    }

    #[test]
    fn torn_down_workflow_discards_result() {
        let (mut workflow, sink) = workflow("RED", false);
        workflow.toggle_symptom("Fever");
        tokio_test::block_on(workflow.advance()).unwrap();
        workflow.merge(AssessmentUpdate {
            age: Some(34),
            ..Default::default()
        });
        tokio_test::block_on(workflow.advance()).unwrap();

        workflow.cancel_handle().cancel();
        let result = tokio_test::block_on(workflow.advance()).unwrap();
        assert_eq!(result, Advance::Discarded);
        assert!(workflow.outcome().is_none());
        assert!(!sink.events().contains(&WorkflowEvent::SubmitSucceeded));
    }
}
