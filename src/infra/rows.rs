//! Database row types shared by the Postgres and SQLite implementations.
//!
//! Column sets are identical across backends; only placeholder syntax differs.

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use crate::domain::{
    ArtifactFormat, AttendanceRecord, AttendanceStatus, Certificate, CertificateCode,
    CertificateId, CertificateTemplate, Event, EventId, EventSummary, ParticipantSummary,
    PlaceholderMapping, Registration, RegistrationId, TemplateId, UserId, VerifiedCertificate,
};

use super::{CertificateError, Result};

pub(crate) const EVENT_COLUMNS: &str = "id, title, description, location, starts_at, ends_at, \
     organizer_id, organizer_name, created_at";

pub(crate) const REGISTRATION_COLUMNS: &str =
    "id, event_id, participant_name, participant_email, status, created_at";

pub(crate) const TEMPLATE_COLUMNS: &str =
    "id, event_id, name, render_mode, asset_key, placeholder_mapping, created_at";

pub(crate) const ATTENDANCE_COLUMNS: &str =
    "registration_id, event_id, status, checked_in_at, checked_in_by";

pub(crate) const CERTIFICATE_COLUMNS: &str = "id, code, event_id, registration_id, artifact_key, \
     artifact_url, artifact_format, artifact_sha256, issued_at, issued_by";

fn corrupt(column: &str, err: String) -> CertificateError {
    CertificateError::Internal(format!("invalid {column} in database: {err}"))
}

#[derive(Debug, FromRow)]
pub(crate) struct EventRow {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub organizer_id: Uuid,
    pub organizer_name: String,
    pub created_at: DateTime<Utc>,
}

impl From<EventRow> for Event {
    fn from(row: EventRow) -> Self {
        Self {
            id: EventId::from_uuid(row.id),
            title: row.title,
            description: row.description,
            location: row.location,
            starts_at: row.starts_at,
            ends_at: row.ends_at,
            organizer_id: UserId::from_uuid(row.organizer_id),
            organizer_name: row.organizer_name,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct RegistrationRow {
    pub id: Uuid,
    pub event_id: Uuid,
    pub participant_name: String,
    pub participant_email: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<RegistrationRow> for Registration {
    type Error = CertificateError;

    fn try_from(row: RegistrationRow) -> Result<Self> {
        Ok(Self {
            id: RegistrationId::from_uuid(row.id),
            event_id: EventId::from_uuid(row.event_id),
            participant_name: row.participant_name,
            participant_email: row.participant_email,
            status: row.status.parse().map_err(|e| corrupt("status", e))?,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct TemplateRow {
    pub id: Uuid,
    pub event_id: Uuid,
    pub name: String,
    pub render_mode: String,
    pub asset_key: Option<String>,
    pub placeholder_mapping: Json<PlaceholderMapping>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<TemplateRow> for CertificateTemplate {
    type Error = CertificateError;

    fn try_from(row: TemplateRow) -> Result<Self> {
        Ok(Self {
            id: TemplateId::from_uuid(row.id),
            event_id: EventId::from_uuid(row.event_id),
            name: row.name,
            mode: row
                .render_mode
                .parse()
                .map_err(|e| corrupt("render_mode", e))?,
            asset_key: row.asset_key,
            mapping: row.placeholder_mapping.0,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct AttendanceRow {
    pub registration_id: Uuid,
    pub event_id: Uuid,
    pub status: String,
    pub checked_in_at: DateTime<Utc>,
    pub checked_in_by: Option<Uuid>,
}

impl TryFrom<AttendanceRow> for AttendanceRecord {
    type Error = CertificateError;

    fn try_from(row: AttendanceRow) -> Result<Self> {
        Ok(Self {
            registration_id: RegistrationId::from_uuid(row.registration_id),
            event_id: EventId::from_uuid(row.event_id),
            status: row
                .status
                .parse::<AttendanceStatus>()
                .map_err(|e| corrupt("attendance status", e))?,
            checked_in_at: row.checked_in_at,
            checked_in_by: row.checked_in_by.map(UserId::from_uuid),
        })
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct CertificateRow {
    pub id: Uuid,
    pub code: String,
    pub event_id: Uuid,
    pub registration_id: Uuid,
    pub artifact_key: String,
    pub artifact_url: String,
    pub artifact_format: String,
    pub artifact_sha256: String,
    pub issued_at: DateTime<Utc>,
    pub issued_by: Option<Uuid>,
}

impl TryFrom<CertificateRow> for Certificate {
    type Error = CertificateError;

    fn try_from(row: CertificateRow) -> Result<Self> {
        Ok(Self {
            id: CertificateId::from_uuid(row.id),
            code: CertificateCode::from_stored(row.code),
            event_id: EventId::from_uuid(row.event_id),
            registration_id: RegistrationId::from_uuid(row.registration_id),
            artifact_key: row.artifact_key,
            artifact_url: row.artifact_url,
            artifact_format: row
                .artifact_format
                .parse::<ArtifactFormat>()
                .map_err(|e| corrupt("artifact_format", e))?,
            artifact_sha256: row.artifact_sha256,
            issued_at: row.issued_at,
            issued_by: row.issued_by.map(UserId::from_uuid),
        })
    }
}

/// Certificate joined with its registration and event.
#[derive(Debug, FromRow)]
pub(crate) struct VerifiedCertificateRow {
    pub code: String,
    pub issued_at: DateTime<Utc>,
    pub artifact_url: String,
    pub artifact_format: String,
    pub artifact_sha256: String,
    pub participant_name: String,
    pub participant_email: String,
    pub event_id: Uuid,
    pub event_title: String,
    pub event_starts_at: DateTime<Utc>,
    pub event_location: Option<String>,
}

pub(crate) const VERIFIED_CERTIFICATE_SELECT: &str = r#"
    SELECT c.code, c.issued_at, c.artifact_url, c.artifact_format, c.artifact_sha256,
           r.participant_name, r.participant_email,
           e.id AS event_id, e.title AS event_title,
           e.starts_at AS event_starts_at, e.location AS event_location
    FROM certificates c
    JOIN registrations r ON r.id = c.registration_id
    JOIN events e ON e.id = c.event_id
"#;

impl TryFrom<VerifiedCertificateRow> for VerifiedCertificate {
    type Error = CertificateError;

    fn try_from(row: VerifiedCertificateRow) -> Result<Self> {
        Ok(Self {
            code: CertificateCode::from_stored(row.code),
            participant: ParticipantSummary {
                name: row.participant_name,
                email: row.participant_email,
            },
            issued_at: row.issued_at,
            artifact_url: row.artifact_url,
            artifact_format: row
                .artifact_format
                .parse::<ArtifactFormat>()
                .map_err(|e| corrupt("artifact_format", e))?,
            artifact_sha256: row.artifact_sha256,
            event: EventSummary {
                id: EventId::from_uuid(row.event_id),
                title: row.event_title,
                starts_at: row.event_starts_at,
                location: row.event_location,
            },
        })
    }
}
