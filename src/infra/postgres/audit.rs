//! PostgreSQL-backed audit log

use async_trait::async_trait;
use sqlx::postgres::PgPool;
use sqlx::types::Json;

use crate::infra::audit::AuditLogRow;
use crate::infra::{AuditLog, AuditLogEntry, AuditQueryFilters, Result};

/// PostgreSQL-backed audit logger
pub struct PgAuditLogger {
    pool: PgPool,
}

impl PgAuditLogger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditLog for PgAuditLogger {
    async fn record(&self, entry: AuditLogEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO audit_log (
                id, timestamp, action, actor, actor_type,
                event_id, resource_type, resource_id,
                details, success, error_message
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
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
            WHERE ($1::text IS NULL OR action = $1)
              AND ($2::uuid IS NULL OR event_id = $2)
              AND ($3::boolean IS FALSE OR success = FALSE)
            ORDER BY timestamp DESC
            LIMIT $4
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
