//! Postgres-backed integration tests.
//!
//! These are ignored by default and are intended to run in CI (or locally)
//! with `DATABASE_URL` set.

use std::sync::Arc;

use chrono::{Duration, Utc};

use event_certs::domain::{NewEvent, NewRegistration, RegistrationStatus};
use event_certs::infra::{AuditAction, AuditQueryFilters, LocalArtifactStore};
use event_certs::server::{connect_backends, AppState};
use event_certs::{CertificateError, UserId};

async fn connect_state() -> Option<(AppState, tempfile::TempDir)> {
    let url = std::env::var("DATABASE_URL").ok()?;
    if !url.starts_with("postgres") {
        return None;
    }
    let backends = connect_backends(&url, 20, true).await.ok()?;
    let storage = tempfile::tempdir().ok()?;
    let artifacts = Arc::new(LocalArtifactStore::new(
        storage.path().to_path_buf(),
        "http://certs.test".to_string(),
    ));
    Some((AppState::new(backends, artifacts, None), storage))
}

async fn seed(state: &AppState, attendees: usize) -> event_certs::Event {
    let ends_at = Utc::now() - Duration::hours(2);
    let event = state
        .directory
        .create_event(NewEvent {
            title: "Postgres Deep Dive".to_string(),
            description: None,
            location: Some("Hall B".to_string()),
            starts_at: ends_at - Duration::hours(4),
            ends_at,
            organizer_id: UserId::new(),
            organizer_name: "Data Guild".to_string(),
        })
        .await
        .unwrap();

    for i in 0..attendees {
        let registration = state
            .directory
            .create_registration(NewRegistration {
                event_id: event.id,
                participant_name: format!("Attendee {i}"),
                participant_email: format!("attendee{i}@example.com"),
                status: RegistrationStatus::Confirmed,
            })
            .await
            .unwrap();
        state
            .directory
            .check_in(event.id, registration.id, None)
            .await
            .unwrap();
    }

    event
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore]
async fn postgres_concurrent_batches_issue_once_per_registration() {
    let Some((state, _storage)) = connect_state().await else {
        eprintln!("DATABASE_URL not set; skipping");
        return;
    };

    let attendees = 12;
    let event = seed(&state, attendees).await;

    let mut handles = Vec::new();
    for _ in 0..4 {
        let ledger = state.ledger.clone();
        let event_id = event.id;
        handles.push(tokio::spawn(async move {
            ledger.issue_all(event_id, None, None, None).await
        }));
    }

    let mut generated = 0;
    for handle in handles {
        let report = handle.await.unwrap().unwrap();
        assert!(report.errors.is_empty(), "errors: {:?}", report.errors);
        assert_eq!(report.total, attendees);
        generated += report.generated;
    }
    assert_eq!(generated, attendees);

    let stored = state.certificates.list_for_event(event.id).await.unwrap();
    assert_eq!(stored.len(), attendees);

    let mut registrations: Vec<_> = stored.iter().map(|c| c.registration_id).collect();
    registrations.sort_by_key(|id| id.0);
    registrations.dedup();
    assert_eq!(registrations.len(), attendees);

    let issued = state
        .audit
        .query(
            AuditQueryFilters {
                action: Some(AuditAction::CertificateIssued),
                event_id: Some(event.id),
                failures_only: false,
            },
            100,
        )
        .await
        .unwrap();
    assert_eq!(issued.len(), attendees);
}

#[tokio::test]
#[ignore]
async fn postgres_verify_round_trip() {
    let Some((state, _storage)) = connect_state().await else {
        eprintln!("DATABASE_URL not set; skipping");
        return;
    };

    let event = seed(&state, 1).await;
    let report = state
        .ledger
        .issue_all(event.id, None, None, None)
        .await
        .unwrap();
    let certificate = &report.certificates[0];

    let verified = state
        .lookup
        .verify(&certificate.code.as_str().to_lowercase())
        .await
        .unwrap();
    assert_eq!(verified.participant.name, "Attendee 0");
    assert_eq!(verified.event.title, "Postgres Deep Dive");
    assert_eq!(verified.artifact_sha256, certificate.artifact_sha256);

    assert!(matches!(
        state.lookup.verify("CERT-0000000000000000").await,
        Err(CertificateError::NotFound)
    ));
}
