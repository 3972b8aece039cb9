use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Finalized assessment payload, built from a completed draft at submit
/// time and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssessmentRequest {
    pub symptoms: Vec<String>,
    pub age: u32,
    pub pain_rating: u8,
    pub medical_history: String,
    pub current_medications: String,
    pub allergies: String,
    pub latitude: f64,
    pub longitude: f64,
    pub location_address: String,
}

/// Raw server response for an assessment submission.
///
/// `assessment_result` arrives either as a structured object or as a
/// serialized string; the classifier handles both, so it is kept as a
/// raw JSON value here.
#[derive(Debug, Clone, Deserialize)]
pub struct AssessmentResponse {
    pub id: u64,
    #[serde(default)]
    pub severity_level: Option<String>,
    #[serde(default)]
    pub assessment_result: Option<serde_json::Value>,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub pain_rating: Option<u8>,
    #[serde(default)]
    pub symptoms: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Doctor {
    pub id: String,
    pub name: String,
    pub specialty: String,
    pub rating: f64,
    pub experience_years: u32,
    #[serde(default)]
    pub available: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DoctorsResponse {
    #[serde(default)]
    pub doctors: Vec<Doctor>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SlotsResponse {
    #[serde(default)]
    pub available_slots: Vec<String>,
}

/// Finalized booking payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookingRequest {
    pub doctor_id: String,
    pub booking_date: NaiveDate,
    pub booking_time: String,
    pub symptoms: Vec<String>,
    pub notes: String,
}

/// Raw server response for a booking submission.
///
/// Some backend versions return the consultation id at the top level,
/// others nest it under a `consultation` object; both are accepted.
#[derive(Debug, Clone, Deserialize)]
pub struct BookingResponse {
    #[serde(default)]
    pub consultation_id: Option<String>,
    #[serde(default)]
    pub consultation: Option<ConsultationRecord>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Nested consultation object some backend versions wrap the id in.
/// Only the id is read; the rest of the record duplicates draft state
/// the workflow already holds.
#[derive(Debug, Clone, Deserialize)]
pub struct ConsultationRecord {
    #[serde(default)]
    pub consultation_id: Option<String>,
}

impl BookingResponse {
    /// The server-generated consultation id, wherever it was placed.
    pub fn consultation_id(&self) -> Option<&str> {
        self.consultation_id
            .as_deref()
            .or_else(|| self.consultation.as_ref()?.consultation_id.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn consultation_id_found_at_top_level() {
        let response: BookingResponse =
            serde_json::from_value(json!({ "consultation_id": "cons_7" })).unwrap();
        assert_eq!(response.consultation_id(), Some("cons_7"));
    }

    #[test]
    fn consultation_id_found_nested() {
        let response: BookingResponse = serde_json::from_value(json!({
            "status": "success",
            "consultation": { "consultation_id": "cons_12", "doctor_name": "Dr. Ngozi Eze" }
        }))
        .unwrap();
        assert_eq!(response.consultation_id(), Some("cons_12"));
    }

    #[test]
    fn consultation_id_absent() {
        let response: BookingResponse =
            serde_json::from_value(json!({ "status": "success" })).unwrap();
        assert_eq!(response.consultation_id(), None);
    }

    #[test]
    fn assessment_response_tolerates_missing_fields() {
        let response: AssessmentResponse = serde_json::from_value(json!({ "id": 3 })).unwrap();
        assert_eq!(response.id, 3);
        assert!(response.severity_level.is_none());
        assert!(response.assessment_result.is_none());
    }
}
