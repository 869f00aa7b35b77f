//! Audit and reconciliation logging for certificate issuance
//!
//! Every issuance outcome is recorded, including:
//! - certificates issued and pairs skipped as already issued
//! - artifacts uploaded whose record insert failed (orphans)
//! - per-participant failures
//! - converter fallbacks to raster output

use async_trait::async_trait;
use chrono::{DateTime, Utc};
#[cfg(test)]
use mockall::automock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{EventId, UserId};

use super::Result;

/// Audit log action types
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    CertificateIssued,
    CertificateSkipped,
    ArtifactOrphaned,
    IssuanceFailed,
    ConverterFallback,
    CheckInRecorded,
    Custom(String),
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuditAction::CertificateIssued => write!(f, "certificate_issued"),
            AuditAction::CertificateSkipped => write!(f, "certificate_skipped"),
            AuditAction::ArtifactOrphaned => write!(f, "artifact_orphaned"),
            AuditAction::IssuanceFailed => write!(f, "issuance_failed"),
            AuditAction::ConverterFallback => write!(f, "converter_fallback"),
            AuditAction::CheckInRecorded => write!(f, "check_in_recorded"),
            AuditAction::Custom(s) => write!(f, "custom:{}", s),
        }
    }
}

impl AuditAction {
    pub fn parse(s: &str) -> Self {
        match s {
            "certificate_issued" => AuditAction::CertificateIssued,
            "certificate_skipped" => AuditAction::CertificateSkipped,
            "artifact_orphaned" => AuditAction::ArtifactOrphaned,
            "issuance_failed" => AuditAction::IssuanceFailed,
            "converter_fallback" => AuditAction::ConverterFallback,
            "check_in_recorded" => AuditAction::CheckInRecorded,
            s if s.starts_with("custom:") => AuditAction::Custom(s[7..].to_string()),
            _ => AuditAction::Custom(s.to_string()),
        }
    }
}

/// Audit log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub action: AuditAction,
    /// User ID, or `system` for unattended runs
    pub actor: String,
    pub actor_type: String,
    pub event_id: Option<EventId>,
    pub resource_type: Option<String>,
    pub resource_id: Option<String>,
    pub details: Option<serde_json::Value>,
    pub success: bool,
    pub error_message: Option<String>,
}

/// Builder for creating audit log entries
pub struct AuditLogBuilder {
    action: AuditAction,
    actor: String,
    actor_type: String,
    event_id: Option<EventId>,
    resource_type: Option<String>,
    resource_id: Option<String>,
    details: Option<serde_json::Value>,
    success: bool,
    error_message: Option<String>,
}

impl AuditLogBuilder {
    pub fn new(
        action: AuditAction,
        actor: impl Into<String>,
        actor_type: impl Into<String>,
    ) -> Self {
        Self {
            action,
            actor: actor.into(),
            actor_type: actor_type.into(),
            event_id: None,
            resource_type: None,
            resource_id: None,
            details: None,
            success: true,
            error_message: None,
        }
    }

    /// Start an entry attributed to a user, or to `system` when there is none
    pub fn for_user(action: AuditAction, user: Option<UserId>) -> Self {
        match user {
            Some(id) => Self::new(action, id.to_string(), "user"),
            None => Self::new(action, "system", "system"),
        }
    }

    pub fn event(mut self, event_id: EventId) -> Self {
        self.event_id = Some(event_id);
        self
    }

    pub fn resource(
        mut self,
        resource_type: impl Into<String>,
        resource_id: impl Into<String>,
    ) -> Self {
        self.resource_type = Some(resource_type.into());
        self.resource_id = Some(resource_id.into());
        self
    }

    pub fn details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Mark as failed with error message
    pub fn failed(mut self, error: impl Into<String>) -> Self {
        self.success = false;
        self.error_message = Some(error.into());
        self
    }

    pub fn build(self) -> AuditLogEntry {
        AuditLogEntry {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            action: self.action,
            actor: self.actor,
            actor_type: self.actor_type,
            event_id: self.event_id,
            resource_type: self.resource_type,
            resource_id: self.resource_id,
            details: self.details,
            success: self.success,
            error_message: self.error_message,
        }
    }
}

/// Query filters for audit logs
#[derive(Debug, Default, Clone)]
pub struct AuditQueryFilters {
    pub action: Option<AuditAction>,
    pub event_id: Option<EventId>,
    pub failures_only: bool,
}

/// Persistent audit log.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait AuditLog: Send + Sync {
    /// Append an entry
    async fn record(&self, entry: AuditLogEntry) -> Result<()>;

    /// Newest entries first
    async fn query(&self, filters: AuditQueryFilters, limit: i64) -> Result<Vec<AuditLogEntry>>;
}

/// Record an entry and mirror it to tracing. A failed write is logged and
/// never replaces the outcome being audited.
pub async fn record_audit(log: &dyn AuditLog, entry: AuditLogEntry) {
    if entry.success {
        tracing::info!(
            target: "audit",
            action = %entry.action,
            actor = %entry.actor,
            resource_id = ?entry.resource_id,
            "Audit log entry"
        );
    } else {
        tracing::warn!(
            target: "audit",
            action = %entry.action,
            actor = %entry.actor,
            resource_id = ?entry.resource_id,
            details = ?entry.details,
            error = ?entry.error_message,
            "Audit log entry (failed)"
        );
    }

    let action = entry.action.clone();
    if let Err(e) = log.record(entry).await {
        tracing::error!(action = %action, error = %e, "Failed to write audit log entry");
    }
}

/// Database row for audit log, shared by the Postgres and SQLite loggers
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct AuditLogRow {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub action: String,
    pub actor: String,
    pub actor_type: String,
    pub event_id: Option<Uuid>,
    pub resource_type: Option<String>,
    pub resource_id: Option<String>,
    pub details: Option<sqlx::types::Json<serde_json::Value>>,
    pub success: bool,
    pub error_message: Option<String>,
}

impl From<AuditLogRow> for AuditLogEntry {
    fn from(row: AuditLogRow) -> Self {
        Self {
            id: row.id,
            timestamp: row.timestamp,
            action: AuditAction::parse(&row.action),
            actor: row.actor,
            actor_type: row.actor_type,
            event_id: row.event_id.map(EventId::from_uuid),
            resource_type: row.resource_type,
            resource_id: row.resource_id,
            details: row.details.map(|d| d.0),
            success: row.success,
            error_message: row.error_message,
        }
    }
}
