use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::api::types::{AssessmentResponse, BookingResponse, Doctor};
use crate::workflow::errors::WorkflowError;

/// Number dialled when the server supplies nothing better.
pub const DEFAULT_EMERGENCY_NUMBER: &str = "112";

/// Closed set of severity categories the backend classifies into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeverityLevel {
    Red,
    Yellow,
    Green,
}

impl SeverityLevel {
    /// Unrecognized or missing tags classify as `Yellow`: when the
    /// server's answer is unclear, "urgent, see a doctor" is the safe
    /// reading, and silence would be worse than generic caution.
    pub fn from_tag(tag: Option<&str>) -> Self {
        match tag {
            Some(t) if t.eq_ignore_ascii_case("RED") => SeverityLevel::Red,
            Some(t) if t.eq_ignore_ascii_case("GREEN") => SeverityLevel::Green,
            _ => SeverityLevel::Yellow,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SeverityLevel::Red => "CRITICAL - EMERGENCY",
            SeverityLevel::Yellow => "URGENT - See Doctor Within Hours",
            SeverityLevel::Green => "Low Risk - Monitor at Home",
        }
    }

    pub fn is_emergency(&self) -> bool {
        matches!(self, SeverityLevel::Red)
    }
}

/// Structured guidance attached to an assessment result.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GuidanceDetail {
    #[serde(default = "GuidanceDetail::default_recommendation")]
    pub recommendation: String,
    #[serde(default = "GuidanceDetail::default_action")]
    pub action: String,
    #[serde(default = "GuidanceDetail::default_estimated_response")]
    pub estimated_response: String,
    #[serde(default)]
    pub phone: Option<String>,
}

impl GuidanceDetail {
    fn default_recommendation() -> String {
        "Please consult with a healthcare professional".to_string()
    }

    fn default_action() -> String {
        "Contact your doctor".to_string()
    }

    fn default_estimated_response() -> String {
        "ASAP".to_string()
    }

    /// Fixed payload substituted when the server's detail cannot be
    /// read at all. Generic guidance beats no guidance.
    pub fn safe_default() -> Self {
        Self {
            recommendation: Self::default_recommendation(),
            action: Self::default_action(),
            estimated_response: Self::default_estimated_response(),
            phone: Some(DEFAULT_EMERGENCY_NUMBER.to_string()),
        }
    }
}

/// Terminal result of a completed assessment workflow.
#[derive(Debug, Clone, PartialEq)]
pub struct AssessmentOutcome {
    pub assessment_id: u64,
    pub severity: SeverityLevel,
    pub detail: GuidanceDetail,
    /// Populated only for `Red`: server-provided number, else the
    /// configured fallback.
    pub emergency_phone: Option<String>,
    pub age: Option<u32>,
    pub pain_rating: Option<u8>,
    pub reported_symptoms: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

/// The detail payload arrives either as an already-structured object or
/// as a serialized string. Returns the parsed detail and whether the
/// safe default had to stand in.
fn parse_detail(raw: Option<&serde_json::Value>) -> (GuidanceDetail, bool) {
    match raw {
        None => (GuidanceDetail::safe_default(), true),
        Some(serde_json::Value::String(text)) => match serde_json::from_str(text) {
            Ok(detail) => (detail, false),
            Err(_) => (GuidanceDetail::safe_default(), true),
        },
        Some(value) => match serde_json::from_value(value.clone()) {
            Ok(detail) => (detail, false),
            Err(_) => (GuidanceDetail::safe_default(), true),
        },
    }
}

/// Map a raw assessment response into an outcome. Total: every input,
/// including unrecognized tags and malformed detail payloads, yields a
/// valid outcome. Fallbacks are logged, never surfaced as errors.
pub fn classify_assessment(response: AssessmentResponse, fallback_phone: &str) -> AssessmentOutcome {
    let severity = SeverityLevel::from_tag(response.severity_level.as_deref());
    let (detail, fell_back) = parse_detail(response.assessment_result.as_ref());
    if fell_back {
        warn!(
            assessment_id = response.id,
            "assessment detail unreadable, substituting safe defaults"
        );
    }

    let emergency_phone = severity.is_emergency().then(|| {
        detail
            .phone
            .clone()
            .unwrap_or_else(|| fallback_phone.to_string())
    });

    AssessmentOutcome {
        assessment_id: response.id,
        severity,
        detail,
        emergency_phone,
        age: response.age,
        pain_rating: response.pain_rating,
        reported_symptoms: response.symptoms,
        created_at: response.created_at,
    }
}

/// Terminal result of a completed booking workflow.
#[derive(Debug, Clone, PartialEq)]
pub struct BookingConfirmation {
    pub consultation_id: String,
    pub doctor: Doctor,
    pub date: NaiveDate,
    pub time: String,
}

/// Booking classification is stricter than assessment: the transport
/// succeeded, so a missing consultation id is a data-integrity failure
/// to report, not to paper over.
pub fn classify_booking(
    response: &BookingResponse,
    doctor: Doctor,
    date: NaiveDate,
    time: String,
) -> Result<BookingConfirmation, WorkflowError> {
    let consultation_id = response
        .consultation_id()
        .ok_or(WorkflowError::DataIntegrity {
            field: "consultation_id",
        })?
        .to_string();

    Ok(BookingConfirmation {
        consultation_id,
        doctor,
        date,
        time,
    })
}
