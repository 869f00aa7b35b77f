//! Error types for the certificate service

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::{EventId, RegistrationId, TemplateId};
use crate::render::RenderError;

/// Errors that can occur while issuing or verifying certificates
#[derive(Error, Debug)]
pub enum CertificateError {
    /// Database error
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Event has not ended yet
    #[error("event {event_id} has not ended yet (ends at {ends_at})")]
    NotYetEligible {
        event_id: EventId,
        ends_at: DateTime<Utc>,
    },

    /// No checked-in registrations matched
    #[error("no eligible participants for event {0}")]
    NoEligibleParticipants(EventId),

    /// Event not found
    #[error("event not found: {0}")]
    EventNotFound(EventId),

    /// Registration not found
    #[error("registration not found: {0}")]
    RegistrationNotFound(RegistrationId),

    /// Template not found, or not owned by the event
    #[error("template not found: {0}")]
    TemplateNotFound(TemplateId),

    /// Artifact rendering failed
    #[error("render error: {0}")]
    Render(#[from] RenderError),

    /// External converter binary could not be located
    #[error("converter unavailable: {0}")]
    ConverterUnavailable(String),

    /// External converter exceeded its time budget
    #[error("converter timed out after {seconds}s")]
    ConverterTimeout { seconds: u64 },

    /// External converter ran but produced no usable output
    #[error("converter failed: {0}")]
    ConverterFailed(String),

    /// Artifact storage could not be reached
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    /// A certificate already exists for the pair
    #[error("certificate already issued for registration {registration_id} of event {event_id}")]
    DuplicateIssuance {
        event_id: EventId,
        registration_id: RegistrationId,
    },

    /// Verification lookup found nothing
    #[error("certificate not found")]
    NotFound,

    /// Invalid registration state transition
    #[error("invalid state transition for registration {registration_id}: {from} -> {to}")]
    InvalidStateTransition {
        registration_id: RegistrationId,
        from: String,
        to: String,
    },

    /// Caller may not act on this resource
    #[error("authorization error: {0}")]
    Unauthorized(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl CertificateError {
    /// Converter failures degrade to raster output instead of failing the item.
    pub fn is_converter_fallback(&self) -> bool {
        matches!(
            self,
            CertificateError::ConverterUnavailable(_)
                | CertificateError::ConverterTimeout { .. }
                | CertificateError::ConverterFailed(_)
        )
    }
}

/// Result type for certificate operations
pub type Result<T> = std::result::Result<T, CertificateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_converter_fallback_classification() {
        assert!(CertificateError::ConverterUnavailable("soffice".into()).is_converter_fallback());
        assert!(CertificateError::ConverterTimeout { seconds: 180 }.is_converter_fallback());
        assert!(CertificateError::ConverterFailed("exit 1".into()).is_converter_fallback());
        assert!(!CertificateError::StorageUnavailable("down".into()).is_converter_fallback());
        assert!(!CertificateError::NotFound.is_converter_fallback());
    }

    #[test]
    fn test_not_yet_eligible_message_carries_end_time() {
        let ends_at = chrono::TimeZone::with_ymd_and_hms(&Utc, 2026, 1, 2, 3, 4, 5).unwrap();
        let err = CertificateError::NotYetEligible {
            event_id: EventId::new(),
            ends_at,
        };
        assert!(err.to_string().contains("2026-01-02 03:04:05"));
    }
}
