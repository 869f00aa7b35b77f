//! PostgreSQL certificate store
//!
//! The `certificates_event_registration_unique` constraint is the only
//! guard against double issuance; inserts that hit it return `None`.

use async_trait::async_trait;
use sqlx::postgres::PgPool;

use crate::domain::{
    Certificate, CertificateCode, EventId, NewCertificate, RegistrationId, VerifiedCertificate,
};
use crate::infra::rows::{
    CertificateRow, VerifiedCertificateRow, CERTIFICATE_COLUMNS, VERIFIED_CERTIFICATE_SELECT,
};
use crate::infra::{CertificateStore, Result};

/// PostgreSQL-based certificate store
pub struct PgCertificateStore {
    pool: PgPool,
}

impl PgCertificateStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl CertificateStore for PgCertificateStore {
    async fn find(
        &self,
        event_id: EventId,
        registration_id: RegistrationId,
    ) -> Result<Option<Certificate>> {
        let row = sqlx::query_as::<_, CertificateRow>(&format!(
            "SELECT {CERTIFICATE_COLUMNS} FROM certificates \
             WHERE event_id = $1 AND registration_id = $2"
        ))
        .bind(event_id.0)
        .bind(registration_id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Certificate::try_from).transpose()
    }

    async fn insert(&self, certificate: NewCertificate) -> Result<Option<Certificate>> {
        let row = sqlx::query_as::<_, CertificateRow>(&format!(
            r#"
            INSERT INTO certificates (
                id, code, event_id, registration_id,
                artifact_key, artifact_url, artifact_format, artifact_sha256,
                issued_at, issued_by
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT ON CONSTRAINT certificates_event_registration_unique DO NOTHING
            RETURNING {CERTIFICATE_COLUMNS}
            "#
        ))
        .bind(uuid::Uuid::new_v4())
        .bind(certificate.code.as_str())
        .bind(certificate.event_id.0)
        .bind(certificate.registration_id.0)
        .bind(&certificate.artifact_key)
        .bind(&certificate.artifact_url)
        .bind(certificate.artifact_format.as_str())
        .bind(&certificate.artifact_sha256)
        .bind(certificate.issued_at)
        .bind(certificate.issued_by.map(|u| u.0))
        .fetch_optional(&self.pool)
        .await?;

        row.map(Certificate::try_from).transpose()
    }

    async fn find_by_code(&self, code: &CertificateCode) -> Result<Option<Certificate>> {
        let row = sqlx::query_as::<_, CertificateRow>(&format!(
            "SELECT {CERTIFICATE_COLUMNS} FROM certificates WHERE code = $1"
        ))
        .bind(code.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Certificate::try_from).transpose()
    }

    async fn verify(&self, code: &CertificateCode) -> Result<Option<VerifiedCertificate>> {
        let row = sqlx::query_as::<_, VerifiedCertificateRow>(&format!(
            "{VERIFIED_CERTIFICATE_SELECT} WHERE c.code = $1"
        ))
        .bind(code.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(VerifiedCertificate::try_from).transpose()
    }

    async fn list_for_event(&self, event_id: EventId) -> Result<Vec<Certificate>> {
        let rows = sqlx::query_as::<_, CertificateRow>(&format!(
            "SELECT {CERTIFICATE_COLUMNS} FROM certificates \
             WHERE event_id = $1 ORDER BY issued_at DESC, code ASC"
        ))
        .bind(event_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Certificate::try_from).collect()
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
