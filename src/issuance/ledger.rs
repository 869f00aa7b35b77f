//! Idempotent issuance ledger
//!
//! Per `(event, registration)` pair the only transition is
//! `NoCertificate -> Issued`. The pre-check against existing records is an
//! optimization; the uniqueness constraint behind
//! [`CertificateStore::insert`] decides races. A race loser has already
//! uploaded its artifact, which is then orphaned and recorded in the audit
//! log for reconciliation.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use sha2::{Digest, Sha256};
use tracing::{info, instrument, warn};

use super::code::generate_code;
use super::gate::AttendanceGate;
use crate::domain::{
    Certificate, CertificateData, CertificateTemplate, Event, EventId, IssuanceFailure,
    IssuanceReport, IssueOutcome, NewCertificate, Registration, RegistrationId, TemplateId,
    UserId,
};
use crate::infra::{
    record_audit, ArtifactStore, AuditAction, AuditLog, AuditLogBuilder, CertificateError,
    CertificateStore, EventDirectory, Result,
};
use crate::render::ArtifactRenderer;

/// Issues certificates at most once per registration
#[derive(Clone)]
pub struct IssuanceLedger {
    directory: Arc<dyn EventDirectory>,
    certificates: Arc<dyn CertificateStore>,
    artifacts: Arc<dyn ArtifactStore>,
    renderer: ArtifactRenderer,
    audit: Arc<dyn AuditLog>,
    gate: AttendanceGate,
}

impl IssuanceLedger {
    pub fn new(
        directory: Arc<dyn EventDirectory>,
        certificates: Arc<dyn CertificateStore>,
        artifacts: Arc<dyn ArtifactStore>,
        renderer: ArtifactRenderer,
        audit: Arc<dyn AuditLog>,
    ) -> Self {
        Self {
            gate: AttendanceGate::new(directory.clone()),
            directory,
            certificates,
            artifacts,
            renderer,
            audit,
        }
    }

    /// Ensure a certificate exists for one registration.
    ///
    /// Returns `AlreadyIssued` without writing anything when a record for
    /// the pair exists. Render and storage failures leave no record behind.
    #[instrument(skip_all, fields(event_id = %event.id, registration_id = %registration.id))]
    pub async fn issue(
        &self,
        event: &Event,
        registration: &Registration,
        template: Option<&CertificateTemplate>,
        issued_by: Option<UserId>,
    ) -> Result<IssueOutcome> {
        let now = Utc::now();
        AttendanceGate::ensure_ended(event, now)?;
        if registration.event_id != event.id {
            return Err(CertificateError::RegistrationNotFound(registration.id));
        }

        if let Some(existing) = self.certificates.find(event.id, registration.id).await? {
            self.audit_skipped(&existing, issued_by).await;
            return Ok(IssueOutcome::AlreadyIssued(existing));
        }

        let code = generate_code();
        let data = CertificateData::new(event, registration, &code, now);
        let artifact = self.renderer.render(&data, template).await?;

        if let Some(reason) = &artifact.fallback {
            record_audit(
                self.audit.as_ref(),
                AuditLogBuilder::for_user(AuditAction::ConverterFallback, issued_by)
                    .event(event.id)
                    .resource("registration", registration.id.to_string())
                    .details(json!({ "code": code.as_str(), "reason": reason }))
                    .build(),
            )
            .await;
        }

        let key = code.artifact_key(artifact.format);
        let sha256 = hex::encode(Sha256::digest(&artifact.bytes));
        let url = self.artifacts.put(&key, artifact.bytes).await?;

        let new = NewCertificate {
            code: code.clone(),
            event_id: event.id,
            registration_id: registration.id,
            artifact_key: key.clone(),
            artifact_url: url.clone(),
            artifact_format: artifact.format,
            artifact_sha256: sha256,
            issued_at: now,
            issued_by,
        };

        match self.certificates.insert(new).await {
            Ok(Some(certificate)) => {
                info!(
                    code = %certificate.code,
                    format = %certificate.artifact_format,
                    backend = self.artifacts.backend_tag(),
                    "Certificate issued"
                );
                record_audit(
                    self.audit.as_ref(),
                    AuditLogBuilder::for_user(AuditAction::CertificateIssued, issued_by)
                        .event(event.id)
                        .resource("certificate", certificate.code.as_str())
                        .details(json!({
                            "registration_id": registration.id,
                            "artifact_key": key,
                            "format": certificate.artifact_format,
                        }))
                        .build(),
                )
                .await;
                Ok(IssueOutcome::Issued(certificate))
            }
            Ok(None) => {
                self.audit_orphan(
                    event.id,
                    registration.id,
                    &key,
                    &url,
                    issued_by,
                    "lost issuance race",
                )
                .await;
                let winner = self
                    .certificates
                    .find(event.id, registration.id)
                    .await?
                    .ok_or_else(|| {
                        CertificateError::Internal(format!(
                            "certificate for registration {} vanished after conflict",
                            registration.id
                        ))
                    })?;
                Ok(IssueOutcome::AlreadyIssued(winner))
            }
            Err(e) => {
                self.audit_orphan(event.id, registration.id, &key, &url, issued_by, &e.to_string())
                    .await;
                Err(e)
            }
        }
    }

    /// Issue certificates for every eligible registration of an event.
    ///
    /// Event-level problems (unknown event or template, event not ended,
    /// nobody eligible) fail the whole call. Per-registration failures are
    /// collected in the report and never abort the batch.
    #[instrument(skip(self, participant_ids))]
    pub async fn issue_all(
        &self,
        event_id: EventId,
        participant_ids: Option<&[RegistrationId]>,
        template_id: Option<TemplateId>,
        issued_by: Option<UserId>,
    ) -> Result<IssuanceReport> {
        let event = self
            .directory
            .get_event(event_id)
            .await?
            .ok_or(CertificateError::EventNotFound(event_id))?;

        let template = match template_id {
            Some(id) => Some(
                self.directory
                    .get_template(id)
                    .await?
                    .filter(|t| t.event_id == event_id)
                    .ok_or(CertificateError::TemplateNotFound(id))?,
            ),
            None => None,
        };

        let registrations = self
            .gate
            .eligible(&event, participant_ids, Utc::now())
            .await?;

        let mut report = IssuanceReport {
            total: registrations.len(),
            ..Default::default()
        };

        for registration in &registrations {
            match self
                .issue(&event, registration, template.as_ref(), issued_by)
                .await
            {
                Ok(IssueOutcome::Issued(certificate)) => {
                    report.generated += 1;
                    report.certificates.push(certificate);
                }
                Ok(IssueOutcome::AlreadyIssued(_)) => report.skipped += 1,
                Err(e) => {
                    warn!(
                        registration_id = %registration.id,
                        error = %e,
                        "Certificate issuance failed for participant"
                    );
                    record_audit(
                        self.audit.as_ref(),
                        AuditLogBuilder::for_user(AuditAction::IssuanceFailed, issued_by)
                            .event(event_id)
                            .resource("registration", registration.id.to_string())
                            .failed(e.to_string())
                            .build(),
                    )
                    .await;
                    report.errors.push(IssuanceFailure {
                        registration_id: registration.id,
                        participant_name: registration.participant_name.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            event_id = %event_id,
            generated = report.generated,
            skipped = report.skipped,
            failed = report.errors.len(),
            total = report.total,
            "Batch issuance finished"
        );
        Ok(report)
    }

    async fn audit_skipped(&self, existing: &Certificate, issued_by: Option<UserId>) {
        record_audit(
            self.audit.as_ref(),
            AuditLogBuilder::for_user(AuditAction::CertificateSkipped, issued_by)
                .event(existing.event_id)
                .resource("certificate", existing.code.as_str())
                .details(json!({ "registration_id": existing.registration_id }))
                .build(),
        )
        .await;
    }

    async fn audit_orphan(
        &self,
        event_id: EventId,
        registration_id: RegistrationId,
        key: &str,
        url: &str,
        issued_by: Option<UserId>,
        reason: &str,
    ) {
        warn!(
            target: "audit",
            event_id = %event_id,
            registration_id = %registration_id,
            artifact_key = key,
            "Stored artifact has no certificate record"
        );
        record_audit(
            self.audit.as_ref(),
            AuditLogBuilder::for_user(AuditAction::ArtifactOrphaned, issued_by)
                .event(event_id)
                .resource("artifact", key)
                .details(json!({
                    "registration_id": registration_id,
                    "artifact_url": url,
                    "backend": self.artifacts.backend_tag(),
                }))
                .failed(reason)
                .build(),
        )
        .await;
    }
}
