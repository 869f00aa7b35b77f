//! SQLite implementations for local development and tests
//!
//! Same schema and semantics as the Postgres backend, selected with a
//! `sqlite:` database URL.

mod audit;
mod certificates;
mod directory;

pub use audit::*;
pub use certificates::*;
pub use directory::*;

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use crate::infra::{CertificateError, Result};

/// Open a SQLite pool, creating the database file if needed.
pub async fn connect_sqlite(url: &str, max_connections: u32) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await?;

    Ok(pool)
}

/// Open a migrated in-memory database.
///
/// A single connection keeps every query on the same in-memory database.
pub async fn open_in_memory() -> Result<SqlitePool> {
    let pool = connect_sqlite("sqlite::memory:", 1).await?;
    crate::migrations::run_sqlite(&pool)
        .await
        .map_err(|e| CertificateError::Internal(format!("sqlite migration failed: {e}")))?;
    Ok(pool)
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::{DateTime, Duration, Utc};

    use crate::domain::{
        Event, NewEvent, NewRegistration, Registration, RegistrationStatus, UserId,
    };
    use crate::infra::EventDirectory;

    pub async fn seed_event(directory: &dyn EventDirectory, ends_at: DateTime<Utc>) -> Event {
        directory
            .create_event(NewEvent {
                title: "Rust Systems Workshop".to_string(),
                description: Some("Hands-on async Rust".to_string()),
                location: Some("Room 4".to_string()),
                starts_at: ends_at - Duration::hours(6),
                ends_at,
                organizer_id: UserId::new(),
                organizer_name: "Systems Guild".to_string(),
            })
            .await
            .unwrap()
    }

    pub async fn seed_registration(
        directory: &dyn EventDirectory,
        event: &Event,
        name: &str,
        status: RegistrationStatus,
    ) -> Registration {
        directory
            .create_registration(NewRegistration {
                event_id: event.id,
                participant_name: name.to_string(),
                participant_email: format!("{}@example.com", name.to_lowercase().replace(' ', ".")),
                status,
            })
            .await
            .unwrap()
    }
}
