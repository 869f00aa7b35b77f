//! Issued certificates, their codes and the data rendered onto them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{
    ArtifactFormat, CertificateId, Event, EventId, EventSummary, Registration, RegistrationId,
    UserId,
};

/// Literal prefix of every certificate code.
pub const CERTIFICATE_CODE_PREFIX: &str = "CERT-";

/// Number of random bytes behind a code (hex-encoded after the prefix).
pub const CERTIFICATE_CODE_BYTES: usize = 8;

/// Human-verifiable certificate code, e.g. `CERT-3F9A1B2C4D5E6F70`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CertificateCode(String);

impl CertificateCode {
    /// Build a code from raw random bytes.
    pub fn from_random(bytes: [u8; CERTIFICATE_CODE_BYTES]) -> Self {
        Self(format!(
            "{}{}",
            CERTIFICATE_CODE_PREFIX,
            hex::encode_upper(bytes)
        ))
    }

    /// Parse user input. Surrounding whitespace and letter case are normalized.
    pub fn parse(input: &str) -> Option<Self> {
        let normalized = input.trim().to_ascii_uppercase();
        let hex_part = normalized.strip_prefix(CERTIFICATE_CODE_PREFIX)?;
        if hex_part.len() != CERTIFICATE_CODE_BYTES * 2
            || !hex_part.bytes().all(|b| b.is_ascii_hexdigit())
        {
            return None;
        }
        Some(Self(normalized))
    }

    /// Wrap a code read back from storage without re-validating it.
    pub fn from_stored(code: String) -> Self {
        Self(code)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Storage key for the artifact of this certificate.
    pub fn artifact_key(&self, format: ArtifactFormat) -> String {
        format!("certificates/{}.{}", self.0, format.extension())
    }
}

impl fmt::Display for CertificateCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An issued certificate record. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Certificate {
    pub id: CertificateId,
    pub code: CertificateCode,
    pub event_id: EventId,
    pub registration_id: RegistrationId,
    pub artifact_key: String,
    pub artifact_url: String,
    pub artifact_format: ArtifactFormat,
    /// Hex SHA-256 of the stored artifact bytes
    pub artifact_sha256: String,
    pub issued_at: DateTime<Utc>,
    pub issued_by: Option<UserId>,
}

/// Input for inserting a certificate record.
#[derive(Debug, Clone)]
pub struct NewCertificate {
    pub code: CertificateCode,
    pub event_id: EventId,
    pub registration_id: RegistrationId,
    pub artifact_key: String,
    pub artifact_url: String,
    pub artifact_format: ArtifactFormat,
    pub artifact_sha256: String,
    pub issued_at: DateTime<Utc>,
    pub issued_by: Option<UserId>,
}

/// Participant identity as shown to verifiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantSummary {
    pub name: String,
    pub email: String,
}

/// Public projection returned by verification lookups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedCertificate {
    pub code: CertificateCode,
    pub participant: ParticipantSummary,
    pub issued_at: DateTime<Utc>,
    pub artifact_url: String,
    pub artifact_format: ArtifactFormat,
    pub artifact_sha256: String,
    pub event: EventSummary,
}

/// Values available to renderers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CertificateData {
    pub participant_name: String,
    pub participant_email: String,
    pub event_title: String,
    pub event_description: Option<String>,
    pub event_date: String,
    pub event_location: Option<String>,
    pub certificate_code: String,
    pub issue_date: String,
    pub organizer_name: String,
}

/// Date layout used on certificates, e.g. `March 5, 2026`.
pub const CERTIFICATE_DATE_FORMAT: &str = "%B %-d, %Y";

impl CertificateData {
    pub fn new(
        event: &Event,
        registration: &Registration,
        code: &CertificateCode,
        issued_at: DateTime<Utc>,
    ) -> Self {
        Self {
            participant_name: registration.participant_name.clone(),
            participant_email: registration.participant_email.clone(),
            event_title: event.title.clone(),
            event_description: event.description.clone(),
            event_date: event.starts_at.format(CERTIFICATE_DATE_FORMAT).to_string(),
            event_location: event.location.clone(),
            certificate_code: code.to_string(),
            issue_date: issued_at.format(CERTIFICATE_DATE_FORMAT).to_string(),
            organizer_name: event.organizer_name.clone(),
        }
    }

    /// Look up a field by name. Accepts `snake_case` and `camelCase` spellings.
    pub fn field(&self, name: &str) -> Option<&str> {
        let key: String = name
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .map(|c| c.to_ascii_lowercase())
            .collect();

        match key.as_str() {
            "participantname" => Some(&self.participant_name),
            "participantemail" => Some(&self.participant_email),
            "eventtitle" => Some(&self.event_title),
            "eventdescription" => self.event_description.as_deref(),
            "eventdate" => Some(&self.event_date),
            "eventlocation" => self.event_location.as_deref(),
            "certificatecode" => Some(&self.certificate_code),
            "issuedate" => Some(&self.issue_date),
            "organizername" => Some(&self.organizer_name),
            _ => None,
        }
    }
}

/// Result of a single `issue` call.
#[derive(Debug, Clone, PartialEq)]
pub enum IssueOutcome {
    /// A new certificate was created
    Issued(Certificate),
    /// A certificate already existed for the pair; nothing was written
    AlreadyIssued(Certificate),
}

impl IssueOutcome {
    pub fn certificate(&self) -> &Certificate {
        match self {
            IssueOutcome::Issued(c) | IssueOutcome::AlreadyIssued(c) => c,
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, IssueOutcome::Issued(_))
    }
}

/// Per-participant failure collected during batch issuance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuanceFailure {
    pub registration_id: RegistrationId,
    pub participant_name: String,
    pub error: String,
}

/// Summary of a batch issuance run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuanceReport {
    pub generated: usize,
    pub skipped: usize,
    pub total: usize,
    pub certificates: Vec<Certificate>,
    pub errors: Vec<IssuanceFailure>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_code_from_random_bytes() {
        let code = CertificateCode::from_random([0x3f, 0x9a, 0x1b, 0x2c, 0x4d, 0x5e, 0x6f, 0x70]);
        assert_eq!(code.as_str(), "CERT-3F9A1B2C4D5E6F70");
        assert_eq!(
            code.artifact_key(ArtifactFormat::Png),
            "certificates/CERT-3F9A1B2C4D5E6F70.png"
        );
    }

    #[test]
    fn test_code_parse_normalizes() {
        let code = CertificateCode::parse("  cert-3f9a1b2c4d5e6f70 \n").unwrap();
        assert_eq!(code.as_str(), "CERT-3F9A1B2C4D5E6F70");
    }

    #[test]
    fn test_code_parse_rejects_malformed() {
        assert!(CertificateCode::parse("CERT-DOESNOTEXIST").is_none());
        assert!(CertificateCode::parse("CERT-3F9A").is_none());
        assert!(CertificateCode::parse("3F9A1B2C4D5E6F70").is_none());
        assert!(CertificateCode::parse("CERT-3F9A1B2C4D5E6F7G").is_none());
        assert!(CertificateCode::parse("").is_none());
    }

    fn sample_data() -> CertificateData {
        let starts_at = Utc.with_ymd_and_hms(2026, 3, 5, 9, 0, 0).unwrap();
        let event = Event {
            id: EventId::new(),
            title: "Systems Summit".to_string(),
            description: None,
            location: Some("Lisbon".to_string()),
            starts_at,
            ends_at: starts_at + chrono::Duration::hours(8),
            organizer_id: UserId::new(),
            organizer_name: "Ada Org".to_string(),
            created_at: starts_at,
        };
        let registration = Registration {
            id: RegistrationId::new(),
            event_id: event.id,
            participant_name: "Grace Hopper".to_string(),
            participant_email: "grace@example.com".to_string(),
            status: crate::domain::RegistrationStatus::Confirmed,
            created_at: starts_at,
        };
        let code = CertificateCode::from_random([0; 8]);
        CertificateData::new(&event, &registration, &code, starts_at + chrono::Duration::days(2))
    }

    #[test]
    fn test_certificate_data_dates() {
        let data = sample_data();
        assert_eq!(data.event_date, "March 5, 2026");
        assert_eq!(data.issue_date, "March 7, 2026");
    }

    #[test]
    fn test_field_lookup_accepts_both_spellings() {
        let data = sample_data();
        assert_eq!(data.field("participant_name"), Some("Grace Hopper"));
        assert_eq!(data.field("participantName"), Some("Grace Hopper"));
        assert_eq!(data.field("eventLocation"), Some("Lisbon"));
        assert_eq!(data.field("event_description"), None);
        assert_eq!(data.field("favourite_colour"), None);
    }
}
