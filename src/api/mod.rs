pub mod client;
pub mod errors;
pub mod types;

pub use client::{HttpTriageApi, NoCredential, StaticToken, TokenProvider, TriageApi};
pub use errors::ApiError;
pub use types::{
    AssessmentRequest, AssessmentResponse, BookingRequest, BookingResponse, Doctor,
};
