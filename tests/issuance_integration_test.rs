//! End-to-end issuance tests over SQLite and local storage.

mod common;

use std::io::{Cursor, Read};
use std::path::PathBuf;
use std::sync::Arc;

use sha2::{Digest, Sha256};

use event_certs::domain::{ArtifactFormat, RegistrationStatus};
use event_certs::infra::{AuditAction, AuditQueryFilters, Converter};
use event_certs::render::{ConverterConfig, OfficeConverter};
use event_certs::{CertificateError, UserId};

use common::*;

fn stored_path(env: &TestEnv, key: &str) -> PathBuf {
    env.storage.path().join(key)
}

#[tokio::test]
async fn test_ended_event_single_attendee_issue_then_verify() {
    let env = test_env().await;
    let event = seed_event(env.directory(), UserId::new(), yesterday()).await;
    let ada = seed_attendee(env.directory(), &event, "Ada Lovelace").await;

    let report = env
        .state
        .ledger
        .issue_all(event.id, None, None, None)
        .await
        .unwrap();

    assert_eq!(report.generated, 1);
    assert_eq!(report.total, 1);
    assert!(report.errors.is_empty());

    let cert = &report.certificates[0];
    assert_eq!(cert.registration_id, ada.id);
    assert_eq!(cert.artifact_format, ArtifactFormat::Png);
    assert!(cert.artifact_url.starts_with(PUBLIC_BASE_URL));

    let bytes = std::fs::read(stored_path(&env, &cert.artifact_key)).unwrap();
    assert!(bytes.starts_with(b"\x89PNG"));
    assert_eq!(hex::encode(Sha256::digest(&bytes)), cert.artifact_sha256);

    let verified = env.state.lookup.verify(cert.code.as_str()).await.unwrap();
    assert_eq!(verified.participant.name, "Ada Lovelace");
    assert_eq!(verified.event.title, "Rust Systems Workshop");
    assert_eq!(verified.artifact_url, cert.artifact_url);
}

#[tokio::test]
async fn test_event_not_ended_creates_nothing() {
    let env = test_env().await;
    let event = seed_event(env.directory(), UserId::new(), tomorrow()).await;
    seed_attendee(env.directory(), &event, "Ada Lovelace").await;

    let result = env.state.ledger.issue_all(event.id, None, None, None).await;

    match result {
        Err(CertificateError::NotYetEligible { event_id, ends_at }) => {
            assert_eq!(event_id, event.id);
            assert_eq!(ends_at.timestamp(), event.ends_at.timestamp());
        }
        other => panic!("expected NotYetEligible, got {other:?}"),
    }
    assert!(env
        .state
        .certificates
        .list_for_event(event.id)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_repeated_batch_is_idempotent() {
    let env = test_env().await;
    let event = seed_event(env.directory(), UserId::new(), yesterday()).await;
    seed_attendee(env.directory(), &event, "Ada Lovelace").await;
    seed_attendee(env.directory(), &event, "Grace Hopper").await;

    let first = env.state.ledger.issue_all(event.id, None, None, None).await.unwrap();
    assert_eq!(first.generated, 2);

    let second = env.state.ledger.issue_all(event.id, None, None, None).await.unwrap();
    assert_eq!(second.generated, 0);
    assert_eq!(second.skipped, 2);
    assert_eq!(second.total, 2);
    assert!(second.certificates.is_empty());

    let rows = env.state.certificates.list_for_event(event.id).await.unwrap();
    assert_eq!(rows.len(), 2);
}

#[tokio::test]
async fn test_concurrent_issue_yields_one_record() {
    let env = test_env().await;
    let event = seed_event(env.directory(), UserId::new(), yesterday()).await;
    let ada = seed_attendee(env.directory(), &event, "Ada Lovelace").await;

    let ledger_a = env.state.ledger.clone();
    let ledger_b = env.state.ledger.clone();
    let (a, b) = tokio::join!(
        ledger_a.issue(&event, &ada, None, None),
        ledger_b.issue(&event, &ada, None, None),
    );
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_eq!([a.is_new(), b.is_new()].iter().filter(|n| **n).count(), 1);
    assert_eq!(a.certificate().code, b.certificate().code);

    let rows = env.state.certificates.list_for_event(event.id).await.unwrap();
    assert_eq!(rows.len(), 1);
}

#[tokio::test]
async fn test_only_checked_in_confirmed_registrations_are_eligible() {
    let env = test_env().await;
    let event = seed_event(env.directory(), UserId::new(), yesterday()).await;

    let attendee = seed_attendee(env.directory(), &event, "Ada Lovelace").await;
    seed_registration(env.directory(), &event, "No Show", RegistrationStatus::Confirmed).await;
    let cancelled = seed_attendee(env.directory(), &event, "Changed Mind").await;
    env.directory()
        .update_registration_status(cancelled.id, RegistrationStatus::Cancelled)
        .await
        .unwrap();

    let report = env.state.ledger.issue_all(event.id, None, None, None).await.unwrap();

    assert_eq!(report.total, 1);
    assert_eq!(report.certificates[0].registration_id, attendee.id);
}

#[tokio::test]
async fn test_nobody_checked_in_is_distinct_failure() {
    let env = test_env().await;
    let event = seed_event(env.directory(), UserId::new(), yesterday()).await;
    seed_registration(env.directory(), &event, "No Show", RegistrationStatus::Confirmed).await;

    let result = env.state.ledger.issue_all(event.id, None, None, None).await;
    assert!(matches!(
        result,
        Err(CertificateError::NoEligibleParticipants(id)) if id == event.id
    ));
}

#[tokio::test]
async fn test_participant_filter_restricts_batch() {
    let env = test_env().await;
    let event = seed_event(env.directory(), UserId::new(), yesterday()).await;
    seed_attendee(env.directory(), &event, "Ada Lovelace").await;
    let grace = seed_attendee(env.directory(), &event, "Grace Hopper").await;

    let report = env
        .state
        .ledger
        .issue_all(event.id, Some(&[grace.id][..]), None, None)
        .await
        .unwrap();

    assert_eq!(report.total, 1);
    assert_eq!(report.certificates[0].registration_id, grace.id);
}

#[tokio::test]
async fn test_missing_converter_falls_back_to_raster() {
    let converter: Arc<dyn Converter> = Arc::new(OfficeConverter::new(ConverterConfig {
        binary: Some(PathBuf::from("/nonexistent/office/soffice")),
        ..ConverterConfig::default()
    }));
    let env = test_env_with_converter(Some(converter)).await;
    let event = seed_event(env.directory(), UserId::new(), yesterday()).await;
    seed_attendee(env.directory(), &event, "Ada Lovelace").await;
    let template = seed_document_template(&env, &event, "<a:t>{{name}}</a:t>").await;

    let report = env
        .state
        .ledger
        .issue_all(event.id, None, Some(template.id), None)
        .await
        .unwrap();

    assert_eq!(report.generated, 1);
    assert!(report.errors.is_empty());
    assert_eq!(report.certificates[0].artifact_format, ArtifactFormat::Png);

    let fallbacks = env
        .state
        .audit
        .query(
            AuditQueryFilters {
                action: Some(AuditAction::ConverterFallback),
                event_id: Some(event.id),
                ..Default::default()
            },
            10,
        )
        .await
        .unwrap();
    assert_eq!(fallbacks.len(), 1);
}

#[tokio::test]
async fn test_document_template_without_conversion_stores_filled_deck() {
    let env = test_env().await;
    let event = seed_event(env.directory(), UserId::new(), yesterday()).await;
    seed_attendee(env.directory(), &event, "Ada Lovelace").await;
    let template = seed_document_template(
        &env,
        &event,
        "<a:t>{{name}}</a:t><a:t>{{event}}</a:t><a:t>{{sponsor}}</a:t>",
    )
    .await;

    let report = env
        .state
        .ledger
        .issue_all(event.id, None, Some(template.id), None)
        .await
        .unwrap();

    let cert = &report.certificates[0];
    assert_eq!(cert.artifact_format, ArtifactFormat::Pptx);
    assert!(cert.artifact_key.ends_with(".pptx"));

    let bytes = std::fs::read(stored_path(&env, &cert.artifact_key)).unwrap();
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut slide = String::new();
    archive
        .by_name("ppt/slides/slide1.xml")
        .unwrap()
        .read_to_string(&mut slide)
        .unwrap();
    assert_eq!(
        slide,
        "<a:t>Ada Lovelace</a:t><a:t>Rust Systems Workshop</a:t><a:t>{{sponsor}}</a:t>"
    );
}

#[tokio::test]
async fn test_template_of_other_event_rejected() {
    let env = test_env().await;
    let event = seed_event(env.directory(), UserId::new(), yesterday()).await;
    let other = seed_event(env.directory(), UserId::new(), yesterday()).await;
    seed_attendee(env.directory(), &event, "Ada Lovelace").await;
    let foreign = seed_document_template(&env, &other, "<a:t>{{name}}</a:t>").await;

    let result = env
        .state
        .ledger
        .issue_all(event.id, None, Some(foreign.id), None)
        .await;
    assert!(matches!(result, Err(CertificateError::TemplateNotFound(id)) if id == foreign.id));
}

#[tokio::test]
async fn test_unknown_code_not_found() {
    let env = test_env().await;

    assert!(matches!(
        env.state.lookup.verify("CERT-DOESNOTEXIST").await,
        Err(CertificateError::NotFound)
    ));
    assert!(matches!(
        env.state.lookup.verify("CERT-0000000000000000").await,
        Err(CertificateError::NotFound)
    ));
}

#[tokio::test]
async fn test_verify_normalizes_code_case() {
    let env = test_env().await;
    let event = seed_event(env.directory(), UserId::new(), yesterday()).await;
    seed_attendee(env.directory(), &event, "Ada Lovelace").await;

    let report = env.state.ledger.issue_all(event.id, None, None, None).await.unwrap();
    let code = report.certificates[0].code.as_str().to_lowercase();

    let verified = env.state.lookup.verify(&format!("  {code} ")).await.unwrap();
    assert_eq!(verified.code, report.certificates[0].code);
}

#[tokio::test]
async fn test_issuer_recorded_on_certificate() {
    let env = test_env().await;
    let organizer = UserId::new();
    let event = seed_event(env.directory(), organizer, yesterday()).await;
    seed_attendee(env.directory(), &event, "Ada Lovelace").await;

    let report = env
        .state
        .ledger
        .issue_all(event.id, None, None, Some(organizer))
        .await
        .unwrap();
    assert_eq!(report.certificates[0].issued_by, Some(organizer));

    let issued = env
        .state
        .audit
        .query(
            AuditQueryFilters {
                action: Some(AuditAction::CertificateIssued),
                ..Default::default()
            },
            10,
        )
        .await
        .unwrap();
    assert_eq!(issued.len(), 1);
    assert_eq!(issued[0].actor, organizer.to_string());
}
