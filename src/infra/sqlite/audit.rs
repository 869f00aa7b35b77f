//! SQLite-backed audit log

use async_trait::async_trait;
use sqlx::sqlite::SqlitePool;
use sqlx::types::Json;

use crate::infra::audit::AuditLogRow;
use crate::infra::{AuditLog, AuditLogEntry, AuditQueryFilters, Result};

/// SQLite-backed audit logger
pub struct SqliteAuditLogger {
    pool: SqlitePool,
}

impl SqliteAuditLogger {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditLog for SqliteAuditLogger {
    async fn record(&self, entry: AuditLogEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO audit_log (
                id, timestamp, action, actor, actor_type,
                event_id, resource_type, resource_id,
                details, success, error_message
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(entry.id)
        .bind(entry.timestamp)
        .bind(entry.action.to_string())
        .bind(&entry.actor)
        .bind(&entry.actor_type)
        .bind(entry.event_id.map(|e| e.0))
        .bind(&entry.resource_type)
        .bind(&entry.resource_id)
        .bind(entry.details.as_ref().map(Json))
        .bind(entry.success)
        .bind(&entry.error_message)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn query(&self, filters: AuditQueryFilters, limit: i64) -> Result<Vec<AuditLogEntry>> {
        let rows = sqlx::query_as::<_, AuditLogRow>(
            r#"
            SELECT id, timestamp, action, actor, actor_type,
                   event_id, resource_type, resource_id,
                   details, success, error_message
            FROM audit_log
            WHERE (?1 IS NULL OR action = ?1)
              AND (?2 IS NULL OR event_id = ?2)
              AND (?3 = 0 OR success = 0)
            ORDER BY timestamp DESC
            LIMIT ?4
            "#,
        )
        .bind(filters.action.as_ref().map(|a| a.to_string()))
        .bind(filters.event_id.map(|e| e.0))
        .bind(filters.failures_only)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(AuditLogEntry::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::EventId;
    use crate::infra::sqlite::open_in_memory;
    use crate::infra::{AuditAction, AuditLogBuilder};

    #[tokio::test]
    async fn test_record_and_query_by_action() {
        let logger = SqliteAuditLogger::new(open_in_memory().await.unwrap());
        let event_id = EventId::new();

        logger
            .record(
                AuditLogBuilder::for_user(AuditAction::CertificateIssued, None)
                    .event(event_id)
                    .resource("certificate", "CERT-0000000000000001")
                    .build(),
            )
            .await
            .unwrap();
        logger
            .record(
                AuditLogBuilder::for_user(AuditAction::ArtifactOrphaned, None)
                    .event(event_id)
                    .resource("artifact", "certificates/CERT-0000000000000002.png")
                    .details(serde_json::json!({"url": "http://localhost/files/x.png"}))
                    .failed("insert conflict")
                    .build(),
            )
            .await
            .unwrap();

        let orphans = logger
            .query(
                AuditQueryFilters {
                    action: Some(AuditAction::ArtifactOrphaned),
                    ..Default::default()
                },
                10,
            )
            .await
            .unwrap();
        assert_eq!(orphans.len(), 1);
        assert_eq!(orphans[0].event_id, Some(event_id));
        assert!(!orphans[0].success);
        assert_eq!(
            orphans[0].details.as_ref().unwrap()["url"],
            "http://localhost/files/x.png"
        );

        let failures = logger
            .query(
                AuditQueryFilters {
                    failures_only: true,
                    ..Default::default()
                },
                10,
            )
            .await
            .unwrap();
        assert_eq!(failures.len(), 1);

        let all = logger.query(AuditQueryFilters::default(), 10).await.unwrap();
        assert_eq!(all.len(), 2);
    }
}
