//! Trait definitions for the persistence, storage and conversion seams

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::domain::{
    ArtifactFormat, AttendanceRecord, Certificate, CertificateCode, CertificateTemplate, Event,
    EventId, NewCertificate, NewEvent, NewRegistration, NewTemplate, Registration,
    RegistrationId, RegistrationStatus, TemplateId, UserId, VerifiedCertificate,
};

use super::Result;

/// Read/write access to events, registrations, attendance and templates.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait EventDirectory: Send + Sync {
    /// Get an event by ID
    async fn get_event(&self, event_id: EventId) -> Result<Option<Event>>;

    /// Registrations of the event that are confirmed and checked in
    async fn eligible_registrations(&self, event_id: EventId) -> Result<Vec<Registration>>;

    /// Get a registration by ID
    async fn get_registration(&self, registration_id: RegistrationId)
        -> Result<Option<Registration>>;

    /// Get a template by ID
    async fn get_template(&self, template_id: TemplateId) -> Result<Option<CertificateTemplate>>;

    /// Create an event
    async fn create_event(&self, event: NewEvent) -> Result<Event>;

    /// Create a registration
    async fn create_registration(&self, registration: NewRegistration) -> Result<Registration>;

    /// Move a registration to a new status
    ///
    /// Fails with `InvalidStateTransition` unless the current status allows it.
    async fn update_registration_status(
        &self,
        registration_id: RegistrationId,
        status: RegistrationStatus,
    ) -> Result<Registration>;

    /// Register a certificate template
    async fn create_template(&self, template: NewTemplate) -> Result<CertificateTemplate>;

    /// Record a check-in
    ///
    /// Idempotent: an existing record for the pair is returned unchanged.
    /// Only confirmed registrations of the event can be checked in.
    async fn check_in(
        &self,
        event_id: EventId,
        registration_id: RegistrationId,
        checked_in_by: Option<UserId>,
    ) -> Result<AttendanceRecord>;
}

/// Certificate records. The `(event_id, registration_id)` uniqueness
/// constraint in the backing table is the sole issuance guard.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait CertificateStore: Send + Sync {
    /// Find the certificate for a pair
    async fn find(
        &self,
        event_id: EventId,
        registration_id: RegistrationId,
    ) -> Result<Option<Certificate>>;

    /// Insert a certificate
    ///
    /// Returns `None` when a row for the pair already exists.
    async fn insert(&self, certificate: NewCertificate) -> Result<Option<Certificate>>;

    /// Find a certificate by code
    async fn find_by_code(&self, code: &CertificateCode) -> Result<Option<Certificate>>;

    /// Resolve a code to its public projection
    async fn verify(&self, code: &CertificateCode) -> Result<Option<VerifiedCertificate>>;

    /// List certificates of an event, newest first
    async fn list_for_event(&self, event_id: EventId) -> Result<Vec<Certificate>>;

    /// Check database connectivity
    async fn ping(&self) -> Result<()>;
}

/// Blob storage for rendered artifacts and template assets.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Store bytes under a key and return the public URL
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<String>;

    /// Read bytes stored under a key
    async fn get(&self, key: &str) -> Result<Vec<u8>>;

    /// Short backend name for logs
    fn backend_tag(&self) -> &'static str;
}

/// External document converter.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Converter: Send + Sync {
    /// Convert a document between formats
    ///
    /// Fails with `ConverterUnavailable`, `ConverterTimeout` or `ConverterFailed`.
    async fn convert(
        &self,
        source: Vec<u8>,
        from: ArtifactFormat,
        to: ArtifactFormat,
    ) -> Result<Vec<u8>>;
}
