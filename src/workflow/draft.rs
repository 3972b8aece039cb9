use chrono::NaiveDate;
use std::collections::BTreeSet;
use tracing::debug;

use crate::api::types::{AssessmentRequest, BookingRequest, Doctor};
use crate::workflow::errors::WorkflowError;

pub const MIN_PAIN_RATING: u8 = 1;
pub const MAX_PAIN_RATING: u8 = 10;
pub const DEFAULT_PAIN_RATING: u8 = 5;

pub const MIN_AGE: u32 = 1;
pub const MAX_AGE: u32 = 150;

/// Coordinates the assessment carries to the backend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// Per-instance seed values the draft starts from. Passed explicitly at
/// construction; there is no process-wide state behind this.
#[derive(Debug, Clone)]
pub struct AssessmentDefaults {
    pub location: GeoPoint,
    pub location_address: String,
}

/// Mutable aggregate built up across the assessment steps.
///
/// Fields only ever accumulate: moving backward and forward between steps
/// never drops previously entered values. The draft is consumed read-only
/// by `finalize` and torn down with the workflow.
#[derive(Debug, Clone, PartialEq)]
pub struct AssessmentDraft {
    symptoms: BTreeSet<String>,
    other_symptoms: String,
    age: Option<u32>,
    pain_rating: u8,
    medical_history: String,
    current_medications: String,
    allergies: String,
    location: GeoPoint,
    location_address: String,
}

/// Partial update merged into the draft as the user completes a step.
/// `None` means "not touched", never "clear".
#[derive(Debug, Clone, Default)]
pub struct AssessmentUpdate {
    pub other_symptoms: Option<String>,
    pub age: Option<u32>,
    pub pain_rating: Option<u8>,
    pub medical_history: Option<String>,
    pub current_medications: Option<String>,
    pub allergies: Option<String>,
    pub location: Option<GeoPoint>,
    pub location_address: Option<String>,
}

impl AssessmentDraft {
    pub fn new(defaults: AssessmentDefaults) -> Self {
        Self {
            symptoms: BTreeSet::new(),
            other_symptoms: String::new(),
            age: None,
            pain_rating: DEFAULT_PAIN_RATING,
            medical_history: String::new(),
            current_medications: String::new(),
            allergies: String::new(),
            location: defaults.location,
            location_address: defaults.location_address,
        }
    }

    /// Selecting an already-selected symptom removes it; anything else
    /// adds it. Set semantics, not list-append.
    pub fn toggle_symptom(&mut self, label: &str) {
        if !self.symptoms.remove(label) {
            self.symptoms.insert(label.to_string());
        }
    }

    pub fn selected_symptoms(&self) -> impl Iterator<Item = &str> {
        self.symptoms.iter().map(String::as_str)
    }

    pub fn has_symptoms(&self) -> bool {
        !self.symptoms.is_empty()
    }

    pub fn age(&self) -> Option<u32> {
        self.age
    }

    pub fn pain_rating(&self) -> u8 {
        self.pain_rating
    }

    /// Shallow-merge: fields absent from the update keep their current
    /// values. Pain ratings outside 1..=10 are clamped into range.
    pub fn merge(&mut self, update: AssessmentUpdate) {
        if let Some(text) = update.other_symptoms {
            self.other_symptoms = text;
        }
        if let Some(age) = update.age {
            self.age = Some(age);
        }
        if let Some(rating) = update.pain_rating {
            let clamped = rating.clamp(MIN_PAIN_RATING, MAX_PAIN_RATING);
            if clamped != rating {
                debug!(rating, clamped, "pain rating out of range, clamped");
            }
            self.pain_rating = clamped;
        }
        if let Some(history) = update.medical_history {
            self.medical_history = history;
        }
        if let Some(medications) = update.current_medications {
            self.current_medications = medications;
        }
        if let Some(allergies) = update.allergies {
            self.allergies = allergies;
        }
        if let Some(location) = update.location {
            self.location = location;
        }
        if let Some(address) = update.location_address {
            self.location_address = address;
        }
    }

    /// Immutable snapshot for submission. The free-text "other symptoms"
    /// entry is appended here, not merged into the selection set earlier.
    pub fn finalize(&self) -> Result<AssessmentRequest, WorkflowError> {
        if self.symptoms.is_empty() {
            return Err(WorkflowError::IncompleteDraft {
                missing: "at least one selected symptom",
            });
        }
        let age = self.age.ok_or(WorkflowError::IncompleteDraft { missing: "age" })?;

        let mut symptoms: Vec<String> = self.symptoms.iter().cloned().collect();
        let other = self.other_symptoms.trim();
        if !other.is_empty() {
            symptoms.push(other.to_string());
        }

        Ok(AssessmentRequest {
            symptoms,
            age,
            pain_rating: self.pain_rating,
            medical_history: self.medical_history.clone(),
            current_medications: self.current_medications.clone(),
            allergies: self.allergies.clone(),
            latitude: self.location.latitude,
            longitude: self.location.longitude,
            location_address: self.location_address.clone(),
        })
    }
}

/// Mutable aggregate built up across the booking steps.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookingDraft {
    doctor: Option<Doctor>,
    date: Option<NaiveDate>,
    time: Option<String>,
    symptoms: Vec<String>,
    notes: String,
}

/// Partial update for the optional annotation fields.
#[derive(Debug, Clone, Default)]
pub struct BookingUpdate {
    pub symptoms: Option<Vec<String>>,
    pub notes: Option<String>,
}

impl BookingDraft {
    pub fn select_doctor(&mut self, doctor: Doctor) {
        self.doctor = Some(doctor);
    }

    /// Changing the date invalidates any slot chosen against the old
    /// date, so the time selection is cleared with it.
    pub fn set_date(&mut self, date: NaiveDate) {
        if self.date != Some(date) {
            self.time = None;
        }
        self.date = Some(date);
    }

    pub fn clear_date(&mut self) {
        self.date = None;
        self.time = None;
    }

    pub fn set_time(&mut self, time: impl Into<String>) {
        self.time = Some(time.into());
    }

    pub fn merge(&mut self, update: BookingUpdate) {
        if let Some(symptoms) = update.symptoms {
            self.symptoms = symptoms;
        }
        if let Some(notes) = update.notes {
            self.notes = notes;
        }
    }

    pub fn doctor(&self) -> Option<&Doctor> {
        self.doctor.as_ref()
    }

    pub fn date(&self) -> Option<NaiveDate> {
        self.date
    }

    pub fn time(&self) -> Option<&str> {
        self.time.as_deref()
    }

    pub fn is_schedule_complete(&self) -> bool {
        self.date.is_some() && self.time.is_some()
    }

    pub fn finalize(&self) -> Result<BookingRequest, WorkflowError> {
        let doctor = self.doctor.as_ref().ok_or(WorkflowError::IncompleteDraft {
            missing: "selected doctor",
        })?;
        let date = self.date.ok_or(WorkflowError::IncompleteDraft {
            missing: "booking date",
        })?;
        let time = self.time.clone().ok_or(WorkflowError::IncompleteDraft {
            missing: "time slot",
        })?;

        Ok(BookingRequest {
            doctor_id: doctor.id.clone(),
            booking_date: date,
            booking_time: time,
            symptoms: self.symptoms.clone(),
            notes: self.notes.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn defaults() -> AssessmentDefaults {
        AssessmentDefaults {
            location: GeoPoint {
                latitude: 4.8156,
                longitude: 6.9271,
            },
            location_address: "Current Location".to_string(),
        }
    }

    fn doctor() -> Doctor {
        Doctor {
            id: "doc_001".to_string(),
            name: "Dr. Chioma Okafor".to_string(),
            specialty: "General Practitioner".to_string(),
            rating: 4.8,
            experience_years: 8,
            available: true,
        }
    }

    #[test]
    fn toggle_adds_then_removes() {
        let mut draft = AssessmentDraft::new(defaults());
        draft.toggle_symptom("Fever");
        assert!(draft.has_symptoms());
        draft.toggle_symptom("Fever");
        assert!(!draft.has_symptoms());
    }

    #[test]
    fn merge_keeps_fields_the_update_omits() {
        let mut draft = AssessmentDraft::new(defaults());
        draft.merge(AssessmentUpdate {
            age: Some(34),
            medical_history: Some("asthma".to_string()),
            ..Default::default()
        });
        draft.merge(AssessmentUpdate {
            pain_rating: Some(6),
            ..Default::default()
        });

        assert_eq!(draft.age(), Some(34));
        assert_eq!(draft.pain_rating(), 6);
        assert_eq!(draft.medical_history, "asthma");
    }

    #[test]
    fn merge_clamps_pain_rating() {
        let mut draft = AssessmentDraft::new(defaults());
        draft.merge(AssessmentUpdate {
            pain_rating: Some(14),
            ..Default::default()
        });
        assert_eq!(draft.pain_rating(), MAX_PAIN_RATING);
        draft.merge(AssessmentUpdate {
            pain_rating: Some(0),
            ..Default::default()
        });
        assert_eq!(draft.pain_rating(), MIN_PAIN_RATING);
    }

    #[test]
    fn finalize_appends_other_symptoms_entry() {
        let mut draft = AssessmentDraft::new(defaults());
        draft.toggle_symptom("Fever");
        draft.toggle_symptom("Cough");
        draft.merge(AssessmentUpdate {
            other_symptoms: Some("  ringing in ears  ".to_string()),
            age: Some(34),
            ..Default::default()
        });

        let request = draft.finalize().unwrap();
        assert_eq!(request.symptoms.len(), 3);
        assert!(request.symptoms.contains(&"ringing in ears".to_string()));
    }

    #[test]
    fn finalize_without_other_text_keeps_selection_only() {
        let mut draft = AssessmentDraft::new(defaults());
        draft.toggle_symptom("Fever");
        draft.toggle_symptom("Cough");
        draft.merge(AssessmentUpdate {
            age: Some(34),
            pain_rating: Some(6),
            ..Default::default()
        });

        let request = draft.finalize().unwrap();
        assert_eq!(request.symptoms.len(), 2);
        assert_eq!(request.age, 34);
        assert_eq!(request.pain_rating, 6);
        assert_eq!(request.latitude, 4.8156);
        assert_eq!(request.location_address, "Current Location");
    }

    #[test]
    fn finalize_rejects_empty_selection() {
        let mut draft = AssessmentDraft::new(defaults());
        draft.merge(AssessmentUpdate {
            age: Some(34),
            other_symptoms: Some("headache".to_string()),
            ..Default::default()
        });
        assert!(matches!(
            draft.finalize(),
            Err(WorkflowError::IncompleteDraft { .. })
        ));
    }

    #[test]
    fn finalize_rejects_missing_age() {
        let mut draft = AssessmentDraft::new(defaults());
        draft.toggle_symptom("Fever");
        assert!(matches!(
            draft.finalize(),
            Err(WorkflowError::IncompleteDraft { missing: "age" })
        ));
    }

    #[test]
    fn booking_date_change_clears_time() {
        let mut draft = BookingDraft::default();
        draft.select_doctor(doctor());
        draft.set_date(NaiveDate::from_ymd_opt(2026, 8, 10).unwrap());
        draft.set_time("10:00");
        assert!(draft.is_schedule_complete());

        draft.set_date(NaiveDate::from_ymd_opt(2026, 8, 11).unwrap());
        assert_eq!(draft.time(), None);
        assert!(!draft.is_schedule_complete());
    }

    #[test]
    fn booking_same_date_keeps_time() {
        let mut draft = BookingDraft::default();
        let date = NaiveDate::from_ymd_opt(2026, 8, 10).unwrap();
        draft.set_date(date);
        draft.set_time("10:00");
        draft.set_date(date);
        assert_eq!(draft.time(), Some("10:00"));
    }

    #[test]
    fn booking_finalize_requires_schedule() {
        let mut draft = BookingDraft::default();
        draft.select_doctor(doctor());
        assert!(matches!(
            draft.finalize(),
            Err(WorkflowError::IncompleteDraft { .. })
        ));

        draft.set_date(NaiveDate::from_ymd_opt(2026, 8, 10).unwrap());
        draft.set_time("10:00");
        let request = draft.finalize().unwrap();
        assert_eq!(request.doctor_id, "doc_001");
        assert_eq!(request.booking_time, "10:00");
    }

    proptest! {
        /// Toggling the same label twice always returns the selection to
        /// its prior state.
        #[test]
        fn toggle_is_an_involution(labels in proptest::collection::vec("[A-Za-z ]{1,12}", 0..8), flip in "[A-Za-z ]{1,12}") {
            let mut draft = AssessmentDraft::new(defaults());
            for label in &labels {
                draft.toggle_symptom(label);
            }
            let before: Vec<String> = draft.selected_symptoms().map(str::to_string).collect();
            draft.toggle_symptom(&flip);
            draft.toggle_symptom(&flip);
            let after: Vec<String> = draft.selected_symptoms().map(str::to_string).collect();
            prop_assert_eq!(before, after);
        }

        /// Merging an empty update never changes the draft.
        #[test]
        fn empty_merge_is_identity(age in proptest::option::of(1u32..120), pain in 1u8..=10) {
            let mut draft = AssessmentDraft::new(defaults());
            draft.merge(AssessmentUpdate { age, pain_rating: Some(pain), ..Default::default() });
            let before = draft.clone();
            draft.merge(AssessmentUpdate::default());
            prop_assert_eq!(before, draft);
        }
    }
}
