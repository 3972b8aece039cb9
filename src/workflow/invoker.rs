use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

use crate::api::types::{
    AssessmentRequest, AssessmentResponse, BookingRequest, BookingResponse,
};
use crate::api::TriageApi;
use crate::telemetry::generate_correlation_id;
use crate::workflow::errors::WorkflowError;

/// Single-flight guard: at most one in-flight remote call per workflow
/// instance. A second begin while one is held is refused outright, with
/// no queuing and no reordering.
#[derive(Debug, Default)]
pub struct SingleFlight {
    busy: Arc<AtomicBool>,
}

impl SingleFlight {
    pub fn try_begin(&self) -> Option<FlightGuard> {
        if self.busy.swap(true, Ordering::SeqCst) {
            None
        } else {
            Some(FlightGuard {
                busy: Arc::clone(&self.busy),
            })
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }
}

/// Releases the flight on drop, success and failure alike.
pub struct FlightGuard {
    busy: Arc<AtomicBool>,
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::SeqCst);
    }
}

/// Teardown marker for a workflow instance. A submission that completes
/// after the handle fired must have its result discarded, never applied.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    active: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self {
            active: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn cancel(&self) {
        self.active.store(false, Ordering::SeqCst);
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

impl Default for CancelHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Performs the exactly-once submission of a finalized request.
///
/// Owns the single-flight state for one workflow instance; the hosting
/// UI reads `is_busy()` to disable resubmission controls while a call is
/// pending.
pub struct RemoteInvoker {
    api: Arc<dyn TriageApi>,
    flight: SingleFlight,
}

impl RemoteInvoker {
    pub fn new(api: Arc<dyn TriageApi>) -> Self {
        Self {
            api,
            flight: SingleFlight::default(),
        }
    }

    pub fn api(&self) -> &dyn TriageApi {
        self.api.as_ref()
    }

    pub fn is_busy(&self) -> bool {
        self.flight.is_busy()
    }

    pub async fn submit_assessment(
        &self,
        request: &AssessmentRequest,
    ) -> Result<AssessmentResponse, WorkflowError> {
        let _guard = self
            .flight
            .try_begin()
            .ok_or(WorkflowError::SubmitInFlight)?;
        let submission_id = generate_correlation_id();
        info!(%submission_id, symptoms = request.symptoms.len(), "assessment submission started");

        match self.api.assess(request).await {
            Ok(response) => {
                info!(%submission_id, assessment_id = response.id, "assessment submission succeeded");
                Ok(response)
            }
            Err(err) => {
                warn!(%submission_id, error = %err, "assessment submission failed");
                Err(WorkflowError::Submission {
                    message: err.to_string(),
                })
            }
        }
    }

    pub async fn submit_booking(
        &self,
        request: &BookingRequest,
    ) -> Result<BookingResponse, WorkflowError> {
        let _guard = self
            .flight
            .try_begin()
            .ok_or(WorkflowError::SubmitInFlight)?;
        let submission_id = generate_correlation_id();
        info!(%submission_id, doctor_id = %request.doctor_id, "booking submission started");

        match self.api.book_consultation(request).await {
            Ok(response) => {
                info!(%submission_id, "booking submission succeeded");
                Ok(response)
            }
            Err(err) => {
                warn!(%submission_id, error = %err, "booking submission failed");
                Err(WorkflowError::Submission {
                    message: err.to_string(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_begin_is_refused_while_guard_held() {
        let flight = SingleFlight::default();
        let guard = flight.try_begin().expect("first begin");
        assert!(flight.is_busy());
        assert!(flight.try_begin().is_none());
        drop(guard);
        assert!(!flight.is_busy());
        assert!(flight.try_begin().is_some());
    }

    #[test]
    fn cancel_handle_flips_once() {
        let handle = CancelHandle::new();
        assert!(handle.is_active());
        let clone = handle.clone();
        clone.cancel();
        assert!(!handle.is_active());
    }
}
