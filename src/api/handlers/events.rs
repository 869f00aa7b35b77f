//! Attendance handlers.

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Extension, Path, State};
use axum::Json;

use super::{invalid_body, invalid_path, load_event};
use crate::api::types::{CheckInRequest, CheckInResponse};
use crate::api::{forbidden, ApiError};
use crate::auth::AuthContextExt;
use crate::domain::EventId;
use crate::infra::{record_audit, AuditAction, AuditLogBuilder};
use crate::server::AppState;

/// POST /api/v1/events/:event_id/check-ins - Record a participant check-in.
///
/// Repeating a check-in returns the original record.
pub async fn check_in(
    State(state): State<AppState>,
    Extension(AuthContextExt(auth)): Extension<AuthContextExt>,
    path: Result<Path<EventId>, PathRejection>,
    body: Result<Json<CheckInRequest>, JsonRejection>,
) -> Result<Json<CheckInResponse>, ApiError> {
    let Path(event_id) = path.map_err(invalid_path)?;
    let Json(request) = body.map_err(invalid_body)?;

    let event = load_event(&state, event_id).await?;
    if !auth.can_check_in(&event) {
        return Err(forbidden("Check-in requires staff or organizer access"));
    }

    let record = state
        .directory
        .check_in(event.id, request.registration_id, auth.actor())
        .await?;

    record_audit(
        state.audit.as_ref(),
        AuditLogBuilder::for_user(AuditAction::CheckInRecorded, auth.actor())
            .event(event.id)
            .resource("registration", request.registration_id.to_string())
            .build(),
    )
    .await;

    Ok(Json(record.into()))
}
