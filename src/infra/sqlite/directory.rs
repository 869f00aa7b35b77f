//! SQLite event directory
//!
//! Events, registrations, check-ins and certificate templates.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::SqlitePool;
use sqlx::types::Json;
use uuid::Uuid;

use crate::domain::{
    AttendanceRecord, AttendanceStatus, CertificateTemplate, Event, EventId, NewEvent,
    NewRegistration, NewTemplate, Registration, RegistrationId, RegistrationStatus, TemplateId,
    UserId,
};
use crate::infra::rows::{
    AttendanceRow, EventRow, RegistrationRow, TemplateRow, ATTENDANCE_COLUMNS, EVENT_COLUMNS,
    REGISTRATION_COLUMNS, TEMPLATE_COLUMNS,
};
use crate::infra::{CertificateError, EventDirectory, Result};

/// SQLite-based event directory
pub struct SqliteEventDirectory {
    pool: SqlitePool,
}

impl SqliteEventDirectory {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create from connection string
    pub async fn from_url(url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(url).await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl EventDirectory for SqliteEventDirectory {
    async fn get_event(&self, event_id: EventId) -> Result<Option<Event>> {
        let row = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE id = ?"
        ))
        .bind(event_id.0)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Event::from))
    }

    async fn eligible_registrations(&self, event_id: EventId) -> Result<Vec<Registration>> {
        let rows = sqlx::query_as::<_, RegistrationRow>(
            r#"
            SELECT r.id, r.event_id, r.participant_name, r.participant_email,
                   r.status, r.created_at
            FROM registrations r
            JOIN attendance a
              ON a.registration_id = r.id AND a.event_id = r.event_id
            WHERE r.event_id = ?
              AND a.status = 'checked_in'
              AND r.status = 'confirmed'
            ORDER BY r.created_at ASC, r.id ASC
            "#,
        )
        .bind(event_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Registration::try_from).collect()
    }

    async fn get_registration(
        &self,
        registration_id: RegistrationId,
    ) -> Result<Option<Registration>> {
        let row = sqlx::query_as::<_, RegistrationRow>(&format!(
            "SELECT {REGISTRATION_COLUMNS} FROM registrations WHERE id = ?"
        ))
        .bind(registration_id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Registration::try_from).transpose()
    }

    async fn get_template(&self, template_id: TemplateId) -> Result<Option<CertificateTemplate>> {
        let row = sqlx::query_as::<_, TemplateRow>(&format!(
            "SELECT {TEMPLATE_COLUMNS} FROM certificate_templates WHERE id = ?"
        ))
        .bind(template_id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(CertificateTemplate::try_from).transpose()
    }

    async fn create_event(&self, event: NewEvent) -> Result<Event> {
        let row = sqlx::query_as::<_, EventRow>(&format!(
            r#"
            INSERT INTO events (
                id, title, description, location, starts_at, ends_at,
                organizer_id, organizer_name, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING {EVENT_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&event.title)
        .bind(&event.description)
        .bind(&event.location)
        .bind(event.starts_at)
        .bind(event.ends_at)
        .bind(event.organizer_id.0)
        .bind(&event.organizer_name)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn create_registration(&self, registration: NewRegistration) -> Result<Registration> {
        let row = sqlx::query_as::<_, RegistrationRow>(&format!(
            r#"
            INSERT INTO registrations (
                id, event_id, participant_name, participant_email, status, created_at
            ) VALUES (?, ?, ?, ?, ?, ?)
            RETURNING {REGISTRATION_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(registration.event_id.0)
        .bind(&registration.participant_name)
        .bind(&registration.participant_email)
        .bind(registration.status.as_str())
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    async fn update_registration_status(
        &self,
        registration_id: RegistrationId,
        status: RegistrationStatus,
    ) -> Result<Registration> {
        let current = self
            .get_registration(registration_id)
            .await?
            .ok_or(CertificateError::RegistrationNotFound(registration_id))?;

        if !current.status.can_transition_to(status) {
            return Err(CertificateError::InvalidStateTransition {
                registration_id,
                from: current.status.to_string(),
                to: status.to_string(),
            });
        }

        // Compare-and-set on the status we validated against
        let row = sqlx::query_as::<_, RegistrationRow>(&format!(
            r#"
            UPDATE registrations SET status = ?
            WHERE id = ? AND status = ?
            RETURNING {REGISTRATION_COLUMNS}
            "#
        ))
        .bind(status.as_str())
        .bind(registration_id.0)
        .bind(current.status.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => row.try_into(),
            None => Err(CertificateError::InvalidStateTransition {
                registration_id,
                from: "concurrently modified".to_string(),
                to: status.to_string(),
            }),
        }
    }

    async fn create_template(&self, template: NewTemplate) -> Result<CertificateTemplate> {
        let row = sqlx::query_as::<_, TemplateRow>(&format!(
            r#"
            INSERT INTO certificate_templates (
                id, event_id, name, render_mode, asset_key, placeholder_mapping, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING {TEMPLATE_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(template.event_id.0)
        .bind(&template.name)
        .bind(template.mode.as_str())
        .bind(&template.asset_key)
        .bind(Json(&template.mapping))
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    async fn check_in(
        &self,
        event_id: EventId,
        registration_id: RegistrationId,
        checked_in_by: Option<UserId>,
    ) -> Result<AttendanceRecord> {
        let registration = self
            .get_registration(registration_id)
            .await?
            .filter(|r| r.event_id == event_id)
            .ok_or(CertificateError::RegistrationNotFound(registration_id))?;

        if registration.status != RegistrationStatus::Confirmed {
            return Err(CertificateError::InvalidStateTransition {
                registration_id,
                from: registration.status.to_string(),
                to: AttendanceStatus::CheckedIn.as_str().to_string(),
            });
        }

        sqlx::query(
            r#"
            INSERT INTO attendance (registration_id, event_id, status, checked_in_at, checked_in_by)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT (event_id, registration_id) DO NOTHING
            "#,
        )
        .bind(registration_id.0)
        .bind(event_id.0)
        .bind(AttendanceStatus::CheckedIn.as_str())
        .bind(Utc::now())
        .bind(checked_in_by.map(|u| u.0))
        .execute(&self.pool)
        .await?;

        let row = sqlx::query_as::<_, AttendanceRow>(&format!(
            "SELECT {ATTENDANCE_COLUMNS} FROM attendance WHERE event_id = ? AND registration_id = ?"
        ))
        .bind(event_id.0)
        .bind(registration_id.0)
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }
}
