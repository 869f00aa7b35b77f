//! Common test utilities and fixtures for integration tests

#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tempfile::TempDir;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use event_certs::auth::{JwtValidator, Role};
use event_certs::domain::{
    CertificateTemplate, Event, NewEvent, NewRegistration, NewTemplate, PlaceholderMapping,
    Registration, RegistrationStatus, RenderMode,
};
use event_certs::infra::sqlite::open_in_memory;
use event_certs::infra::{
    Converter, EventDirectory, LocalArtifactStore, SqliteAuditLogger, SqliteCertificateStore,
    SqliteEventDirectory,
};
use event_certs::server::{AppState, Backends};
use event_certs::UserId;

pub const JWT_SECRET: &[u8] = b"integration-test-secret";
pub const JWT_ISSUER: &str = "event-platform";
pub const JWT_AUDIENCE: &str = "event-certs";
pub const PUBLIC_BASE_URL: &str = "http://certs.test";

/// Application state over an in-memory SQLite database and a temporary
/// local artifact directory.
pub struct TestEnv {
    pub state: AppState,
    pub storage: TempDir,
}

impl TestEnv {
    pub fn directory(&self) -> &dyn EventDirectory {
        self.state.directory.as_ref()
    }
}

pub async fn test_env() -> TestEnv {
    test_env_with_converter(None).await
}

pub async fn test_env_with_converter(converter: Option<Arc<dyn Converter>>) -> TestEnv {
    let pool = open_in_memory().await.unwrap();
    let storage = tempfile::tempdir().unwrap();

    let backends = Backends {
        directory: Arc::new(SqliteEventDirectory::new(pool.clone())),
        certificates: Arc::new(SqliteCertificateStore::new(pool.clone())),
        audit: Arc::new(SqliteAuditLogger::new(pool)),
    };
    let artifacts = Arc::new(LocalArtifactStore::new(
        storage.path().to_path_buf(),
        PUBLIC_BASE_URL.to_string(),
    ));

    TestEnv {
        state: AppState::new(backends, artifacts, converter),
        storage,
    }
}

pub fn yesterday() -> DateTime<Utc> {
    Utc::now() - Duration::days(1)
}

pub fn tomorrow() -> DateTime<Utc> {
    Utc::now() + Duration::days(1)
}

/// Create an event owned by `organizer_id`.
pub async fn seed_event(
    directory: &dyn EventDirectory,
    organizer_id: UserId,
    ends_at: DateTime<Utc>,
) -> Event {
    directory
        .create_event(NewEvent {
            title: "Rust Systems Workshop".to_string(),
            description: Some("Hands-on async Rust".to_string()),
            location: Some("Room 4".to_string()),
            starts_at: ends_at - Duration::hours(6),
            ends_at,
            organizer_id,
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

/// Confirmed registration with a recorded check-in.
pub async fn seed_attendee(
    directory: &dyn EventDirectory,
    event: &Event,
    name: &str,
) -> Registration {
    let registration =
        seed_registration(directory, event, name, RegistrationStatus::Confirmed).await;
    directory
        .check_in(event.id, registration.id, None)
        .await
        .unwrap();
    registration
}

/// Upload a slide-deck template for the event and register it.
pub async fn seed_document_template(
    env: &TestEnv,
    event: &Event,
    slide_xml: &str,
) -> CertificateTemplate {
    let key = format!("templates/{}.pptx", event.id);
    env.state
        .artifacts
        .put(&key, minimal_pptx(slide_xml))
        .await
        .unwrap();

    let mut mapping = PlaceholderMapping::new();
    mapping.insert("name".to_string(), "participant_name".to_string());
    mapping.insert("event".to_string(), "event_title".to_string());

    env.directory()
        .create_template(NewTemplate {
            event_id: event.id,
            name: "Gold".to_string(),
            mode: RenderMode::Document,
            asset_key: Some(key),
            mapping,
        })
        .await
        .unwrap()
}

/// Smallest archive the document renderer accepts: one slide part.
pub fn minimal_pptx(slide_xml: &str) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    writer.start_file("[Content_Types].xml", options).unwrap();
    writer.write_all(b"<Types/>").unwrap();
    writer.start_file("ppt/slides/slide1.xml", options).unwrap();
    writer.write_all(slide_xml.as_bytes()).unwrap();
    writer.finish().unwrap().into_inner()
}

pub fn jwt_validator() -> JwtValidator {
    JwtValidator::new(JWT_SECRET, JWT_ISSUER, JWT_AUDIENCE)
}

/// Bearer token for a user with the given role.
pub fn token_for(user_id: UserId, role: Role) -> String {
    jwt_validator()
        .issue(user_id, "Test User", role, Duration::hours(1))
        .unwrap()
}
