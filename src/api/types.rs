//! Shared request and response types for REST API handlers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{
    AttendanceRecord, AttendanceStatus, Certificate, EventId, RegistrationId, TemplateId, UserId,
};

// ============================================================================
// Certificate types
// ============================================================================

/// Request body for batch certificate generation.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub event_id: EventId,
    /// Restrict issuance to these registrations; empty or absent means everyone eligible
    #[serde(default)]
    pub participant_ids: Option<Vec<RegistrationId>>,
    #[serde(default)]
    pub template_id: Option<TemplateId>,
}

/// Certificates issued for one event.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateListResponse {
    pub event_id: EventId,
    pub count: usize,
    pub certificates: Vec<Certificate>,
}

// ============================================================================
// Check-in types
// ============================================================================

/// Request body for recording a check-in.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInRequest {
    pub registration_id: RegistrationId,
}

/// Response for a recorded check-in.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInResponse {
    pub event_id: EventId,
    pub registration_id: RegistrationId,
    pub status: AttendanceStatus,
    pub checked_in_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checked_in_by: Option<UserId>,
}

impl From<AttendanceRecord> for CheckInResponse {
    fn from(record: AttendanceRecord) -> Self {
        Self {
            event_id: record.event_id,
            registration_id: record.registration_id,
            status: record.status,
            checked_in_at: record.checked_in_at,
            checked_in_by: record.checked_in_by,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_request_optional_fields() {
        let event_id = EventId::new();
        let req: GenerateRequest =
            serde_json::from_value(serde_json::json!({ "eventId": event_id })).unwrap();
        assert_eq!(req.event_id, event_id);
        assert!(req.participant_ids.is_none());
        assert!(req.template_id.is_none());

        let reg = RegistrationId::new();
        let req: GenerateRequest = serde_json::from_value(serde_json::json!({
            "eventId": event_id,
            "participantIds": [reg],
        }))
        .unwrap();
        assert_eq!(req.participant_ids, Some(vec![reg]));
    }

    #[test]
    fn test_check_in_response_is_camel_case() {
        let record = AttendanceRecord {
            registration_id: RegistrationId::new(),
            event_id: EventId::new(),
            status: AttendanceStatus::CheckedIn,
            checked_in_at: Utc::now(),
            checked_in_by: None,
        };
        let json = serde_json::to_value(CheckInResponse::from(record)).unwrap();
        assert_eq!(json["status"], "checked_in");
        assert!(json.get("checkedInAt").is_some());
        assert!(json.get("checkedInBy").is_none());
    }
}
