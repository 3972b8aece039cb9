use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use crate::api::errors::ApiError;
use crate::api::types::{
    AssessmentRequest, AssessmentResponse, BookingRequest, BookingResponse, Doctor,
    DoctorsResponse, SlotsResponse,
};

/// Supplies the bearer credential for authenticated endpoints.
///
/// The credential itself is owned by an external auth collaborator
/// (login/session handling is out of scope here); this trait is the seam
/// through which it reaches the API client.
pub trait TokenProvider: Send + Sync {
    fn bearer_token(&self) -> Option<String>;
}

/// Fixed token, handed over once at construction.
pub struct StaticToken(pub String);

impl TokenProvider for StaticToken {
    fn bearer_token(&self) -> Option<String> {
        Some(self.0.clone())
    }
}

/// No credential available. Authenticated endpoints fail fast.
pub struct NoCredential;

impl TokenProvider for NoCredential {
    fn bearer_token(&self) -> Option<String> {
        None
    }
}

/// The HTTP boundary to the triage backend.
///
/// Workflows depend on this trait, not on the concrete client, so tests
/// can stand in a mock server or a hand-rolled stub.
#[async_trait]
pub trait TriageApi: Send + Sync {
    async fn assess(&self, request: &AssessmentRequest) -> Result<AssessmentResponse, ApiError>;

    async fn assessment(&self, id: u64) -> Result<AssessmentResponse, ApiError>;

    async fn available_doctors(&self, specialty: Option<&str>) -> Result<Vec<Doctor>, ApiError>;

    async fn available_slots(
        &self,
        doctor_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<String>, ApiError>;

    async fn book_consultation(&self, request: &BookingRequest)
        -> Result<BookingResponse, ApiError>;
}

/// `reqwest`-backed implementation against the MediAlert REST backend.
pub struct HttpTriageApi {
    http: reqwest::Client,
    base_url: String,
    tokens: Box<dyn TokenProvider>,
}

impl HttpTriageApi {
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        tokens: Box<dyn TokenProvider>,
    ) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        let base_url = base_url.into();
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            tokens,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Turn a response into a typed value, folding non-success statuses
    /// into `ApiError::Status` with whatever message the server included.
    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json::<T>().await?);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ApiError::Status {
            status: status.as_u16(),
            message: extract_server_message(status, &body),
        })
    }
}

/// Pull a human-readable message out of an error body. FastAPI puts it
/// under `detail`, the booking service under `message`; fall back to the
/// canonical status text when neither parses.
fn extract_server_message(status: StatusCode, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["message", "detail"] {
            if let Some(text) = value.get(key).and_then(|v| v.as_str()) {
                return text.to_string();
            }
        }
    }
    status
        .canonical_reason()
        .unwrap_or("request rejected")
        .to_string()
}

#[async_trait]
impl TriageApi for HttpTriageApi {
    async fn assess(&self, request: &AssessmentRequest) -> Result<AssessmentResponse, ApiError> {
        debug!(
            symptoms = request.symptoms.len(),
            age = request.age,
            pain_rating = request.pain_rating,
            "submitting assessment"
        );
        let response = self
            .http
            .post(self.url("/api/emergency/assess"))
            .json(request)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn assessment(&self, id: u64) -> Result<AssessmentResponse, ApiError> {
        let response = self
            .http
            .get(self.url(&format!("/api/emergency/assessment/{id}")))
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn available_doctors(&self, specialty: Option<&str>) -> Result<Vec<Doctor>, ApiError> {
        let mut request = self.http.get(self.url("/api/doctors/available"));
        if let Some(specialty) = specialty {
            request = request.query(&[("specialty", specialty)]);
        }
        let response = request.send().await?;
        let doctors: DoctorsResponse = Self::decode(response).await?;
        Ok(doctors.doctors)
    }

    async fn available_slots(
        &self,
        doctor_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<String>, ApiError> {
        let response = self
            .http
            .get(self.url(&format!("/api/doctors/slots/{doctor_id}")))
            .query(&[("date", date.to_string())])
            .send()
            .await?;
        let slots: SlotsResponse = Self::decode(response).await?;
        Ok(slots.available_slots)
    }

    async fn book_consultation(
        &self,
        request: &BookingRequest,
    ) -> Result<BookingResponse, ApiError> {
        let token = self
            .tokens
            .bearer_token()
            .ok_or(ApiError::MissingCredential {
                operation: "book_consultation",
            })?;
        let response = self
            .http
            .post(self.url("/api/doctors/book"))
            .bearer_auth(token)
            .json(request)
            .send()
            .await?;
        Self::decode(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_message_prefers_message_key() {
        let message = extract_server_message(
            StatusCode::BAD_REQUEST,
            r#"{"message": "Doctor not found", "detail": "other"}"#,
        );
        assert_eq!(message, "Doctor not found");
    }

    #[test]
    fn server_message_falls_back_to_detail() {
        let message =
            extract_server_message(StatusCode::UNAUTHORIZED, r#"{"detail": "Invalid token"}"#);
        assert_eq!(message, "Invalid token");
    }

    #[test]
    fn server_message_falls_back_to_status_text() {
        let message = extract_server_message(StatusCode::INTERNAL_SERVER_ERROR, "not json");
        assert_eq!(message, "Internal Server Error");
    }

    #[test]
    fn base_url_trailing_slash_is_normalized() {
        let api = HttpTriageApi::new(
            "http://localhost:8000/",
            Duration::from_secs(5),
            Box::new(NoCredential),
        )
        .unwrap();
        assert_eq!(api.url("/api/health"), "http://localhost:8000/api/health");
    }
}
