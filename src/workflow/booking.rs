use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::api::types::Doctor;
use crate::api::TriageApi;
use crate::triage::{classify_booking, BookingConfirmation};
use crate::workflow::draft::{BookingDraft, BookingUpdate};
use crate::workflow::errors::WorkflowError;
use crate::workflow::events::{EventSink, WorkflowEvent};
use crate::workflow::invoker::{CancelHandle, RemoteInvoker};
use crate::workflow::sequencer::{Backstep, Progress, StepCursor, WorkflowStep};
use crate::workflow::{Advance, RetreatSignal};

/// Stages of the consultation booking, in walking order. `Success` is
/// terminal and entered only through a successful submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingStep {
    Browse,
    Schedule,
    Confirm,
    Success,
}

impl WorkflowStep for BookingStep {
    const ORDER: &'static [Self] = &[
        BookingStep::Browse,
        BookingStep::Schedule,
        BookingStep::Confirm,
        BookingStep::Success,
    ];

    fn name(&self) -> &'static str {
        match self {
            BookingStep::Browse => "browse",
            BookingStep::Schedule => "schedule",
            BookingStep::Confirm => "confirm",
            BookingStep::Success => "success",
        }
    }
}

/// One run of the consultation booking: browse providers, pick a date
/// and slot, confirm, submit once.
///
/// The slot list always belongs to the currently selected date;
/// changing the date clears both the list and any chosen slot.
pub struct BookingWorkflow {
    cursor: StepCursor<BookingStep>,
    draft: BookingDraft,
    invoker: RemoteInvoker,
    events: Box<dyn EventSink>,
    cancel: CancelHandle,
    doctors: Vec<Doctor>,
    available_slots: Vec<String>,
    confirmation: Option<BookingConfirmation>,
}

impl BookingWorkflow {
    pub fn new(api: Arc<dyn TriageApi>, events: Box<dyn EventSink>) -> Self {
        Self {
            cursor: StepCursor::new(),
            draft: BookingDraft::default(),
            invoker: RemoteInvoker::new(api),
            events,
            cancel: CancelHandle::new(),
            doctors: Vec::new(),
            available_slots: Vec::new(),
            confirmation: None,
        }
    }

    pub fn current_step(&self) -> BookingStep {
        self.cursor.current()
    }

    pub fn draft(&self) -> &BookingDraft {
        &self.draft
    }

    pub fn is_busy(&self) -> bool {
        self.invoker.is_busy()
    }

    pub fn confirmation(&self) -> Option<&BookingConfirmation> {
        self.confirmation.as_ref()
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn doctors(&self) -> &[Doctor] {
        &self.doctors
    }

    pub fn available_slots(&self) -> &[String] {
        &self.available_slots
    }

    /// Fetch the provider catalog, optionally narrowed by specialty.
    /// Retryable on failure; the previously loaded catalog is kept.
    pub async fn load_doctors(&mut self, specialty: Option<&str>) -> Result<&[Doctor], WorkflowError> {
        match self.invoker.api().available_doctors(specialty).await {
            Ok(doctors) => {
                info!(count = doctors.len(), "provider catalog loaded");
                self.doctors = doctors;
                Ok(&self.doctors)
            }
            Err(err) => {
                warn!(error = %err, "provider catalog fetch failed");
                Err(WorkflowError::Submission {
                    message: err.to_string(),
                })
            }
        }
    }

    /// Select a provider out of the loaded catalog.
    pub fn select_doctor(&mut self, doctor_id: &str) -> Result<(), WorkflowError> {
        let doctor = self
            .doctors
            .iter()
            .find(|d| d.id == doctor_id)
            .cloned()
            .ok_or_else(|| {
                WorkflowError::validation("browse", format!("unknown doctor: {doctor_id}"))
            })?;
        self.draft.select_doctor(doctor);
        Ok(())
    }

    /// Pick a date and fetch the slots offered on it. Any slot chosen
    /// against a previous date is invalidated.
    pub async fn set_date(&mut self, date: NaiveDate) -> Result<&[String], WorkflowError> {
        let doctor_id = self
            .draft
            .doctor()
            .map(|d| d.id.clone())
            .ok_or_else(|| WorkflowError::validation("schedule", "select a doctor first"))?;
        self.draft.set_date(date);
        self.available_slots.clear();

        match self.invoker.api().available_slots(&doctor_id, date).await {
            Ok(slots) => {
                debug!(%date, count = slots.len(), "slots loaded");
                self.available_slots = slots;
                Ok(&self.available_slots)
            }
            Err(err) => {
                warn!(%date, error = %err, "slot fetch failed");
                Err(WorkflowError::Submission {
                    message: err.to_string(),
                })
            }
        }
    }

    /// Drop the selected date, and with it the slot list and any chosen
    /// slot. The schedule gate blocks until both are re-selected.
    pub fn clear_date(&mut self) {
        self.draft.clear_date();
        self.available_slots.clear();
    }

    /// Choose a slot from the list fetched for the selected date.
    pub fn select_time(&mut self, slot: &str) -> Result<(), WorkflowError> {
        if self.draft.date().is_none() {
            return Err(WorkflowError::validation("schedule", "select a date first"));
        }
        if !self.available_slots.iter().any(|s| s == slot) {
            return Err(WorkflowError::validation(
                "schedule",
                format!("slot {slot} is not offered on the selected date"),
            ));
        }
        self.draft.set_time(slot);
        Ok(())
    }

    pub fn annotate(&mut self, update: BookingUpdate) {
        self.draft.merge(update);
    }

    pub fn can_advance(&self) -> bool {
        self.gate().is_none()
    }

    fn gate(&self) -> Option<String> {
        match self.cursor.current() {
            BookingStep::Browse => self
                .draft
                .doctor()
                .is_none()
                .then(|| "Please select a doctor".to_string()),
            BookingStep::Schedule => (!self.draft.is_schedule_complete())
                .then(|| "Please select date and time".to_string()),
            BookingStep::Confirm => None,
            BookingStep::Success => Some("booking already confirmed".to_string()),
        }
    }

    /// Move to the next step; from `Confirm` this submits the booking
    /// and, on success, enters `Success`.
    pub async fn advance(&mut self) -> Result<Advance<BookingStep>, WorkflowError> {
        if let Some(reason) = self.gate() {
            self.events.notify(WorkflowEvent::ValidationFailed {
                reason: reason.clone(),
            });
            return Err(WorkflowError::Validation {
                step: self.cursor.current().name(),
                reason,
            });
        }

        if self.cursor.current() == BookingStep::Confirm {
            return self.submit().await;
        }

        match self.cursor.advance() {
            Progress::Moved(step) => {
                info!(step = step.name(), "booking step advanced");
                self.events.notify(WorkflowEvent::StepChanged { step: step.name() });
                Ok(Advance::Moved(step))
            }
            Progress::AtEnd => Err(WorkflowError::validation(
                "success",
                "booking already confirmed",
            )),
        }
    }

    /// Move back one step; draft fields survive. From `Browse` this
    /// signals "cancel", and leaving the confirmation screen dismisses
    /// the workflow rather than reopening `Confirm`.
    pub fn retreat(&mut self) -> RetreatSignal<BookingStep> {
        if self.cursor.current() == BookingStep::Success {
            self.cancel();
            return RetreatSignal::Cancelled;
        }
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

    pub fn cancel(&mut self) {
        if self.cancel.is_active() {
            self.cancel.cancel();
            self.events.notify(WorkflowEvent::Cancelled);
        }
    }

    /// Begin a fresh booking after a completed one: clears the draft,
    /// slots and confirmation, keeps the loaded catalog.
    pub fn restart(&mut self) {
        self.draft = BookingDraft::default();
        self.available_slots.clear();
        self.confirmation = None;
        self.cursor.reset();
        self.events.notify(WorkflowEvent::StepChanged {
            step: BookingStep::Browse.name(),
        });
    }

    async fn submit(&mut self) -> Result<Advance<BookingStep>, WorkflowError> {
        if self.invoker.is_busy() {
            return Err(WorkflowError::SubmitInFlight);
        }
        let request = self.draft.finalize()?;
        let doctor = self
            .draft
            .doctor()
            .cloned()
            .ok_or(WorkflowError::IncompleteDraft {
                missing: "selected doctor",
            })?;
        self.events.notify(WorkflowEvent::SubmitStarted);

        match self.invoker.submit_booking(&request).await {
            Ok(response) => {
                if !self.cancel.is_active() {
                    debug!("workflow torn down mid-submission, result discarded");
                    return Ok(Advance::Discarded);
                }
                match classify_booking(
                    &response,
                    doctor,
                    request.booking_date,
                    request.booking_time.clone(),
                ) {
                    Ok(confirmation) => {
                        info!(
                            consultation_id = %confirmation.consultation_id,
                            "booking confirmed"
                        );
                        self.confirmation = Some(confirmation);
                        self.events.notify(WorkflowEvent::SubmitSucceeded);
                        if let Progress::Moved(step) = self.cursor.advance() {
                            self.events.notify(WorkflowEvent::StepChanged { step: step.name() });
                        }
                        Ok(Advance::Submitted)
                    }
                    Err(err) => {
                        self.events.notify(WorkflowEvent::SubmitFailed {
                            message: err.to_string(),
                        });
                        Err(err)
                    }
                }
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
