//! Certificate issuance, listing and verification handlers.

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Extension, Path, State};
use axum::Json;
use tracing::info;

use super::{invalid_body, invalid_path, load_event};
use crate::api::types::{CertificateListResponse, GenerateRequest};
use crate::api::{forbidden, ApiError};
use crate::auth::AuthContextExt;
use crate::domain::{EventId, IssuanceReport, VerifiedCertificate};
use crate::server::AppState;

/// POST /api/v1/certificates/generate - Issue certificates for an event.
pub async fn generate_certificates(
    State(state): State<AppState>,
    Extension(AuthContextExt(auth)): Extension<AuthContextExt>,
    body: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<Json<IssuanceReport>, ApiError> {
    let Json(request) = body.map_err(invalid_body)?;

    let event = load_event(&state, request.event_id).await?;
    if !auth.can_manage_event(&event) {
        return Err(forbidden(
            "Only the event organizer can generate certificates",
        ));
    }

    let report = state
        .ledger
        .issue_all(
            event.id,
            request.participant_ids.as_deref(),
            request.template_id,
            auth.actor(),
        )
        .await?;

    info!(
        event_id = %event.id,
        user = %auth.name,
        generated = report.generated,
        skipped = report.skipped,
        failed = report.errors.len(),
        "Certificate generation requested"
    );

    Ok(Json(report))
}

/// GET /api/v1/events/:event_id/certificates - List certificates of an event.
pub async fn list_event_certificates(
    State(state): State<AppState>,
    Extension(AuthContextExt(auth)): Extension<AuthContextExt>,
    path: Result<Path<EventId>, PathRejection>,
) -> Result<Json<CertificateListResponse>, ApiError> {
    let Path(event_id) = path.map_err(invalid_path)?;

    let event = load_event(&state, event_id).await?;
    if !auth.can_manage_event(&event) {
        return Err(forbidden("Only the event organizer can list certificates"));
    }

    let certificates = state.certificates.list_for_event(event.id).await?;

    Ok(Json(CertificateListResponse {
        event_id: event.id,
        count: certificates.len(),
        certificates,
    }))
}

/// GET /api/v1/certificates/verify/:code - Public verification.
pub async fn verify_certificate(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<VerifiedCertificate>, ApiError> {
    let verified = state.lookup.verify(&code).await?;
    Ok(Json(verified))
}
