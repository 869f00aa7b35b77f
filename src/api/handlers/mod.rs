//! REST API handlers organized by domain.

pub mod certificates;
pub mod events;
pub mod health;

pub use certificates::*;
pub use events::*;
pub use health::*;

use axum::extract::rejection::{JsonRejection, PathRejection};

use crate::api::{ApiError, ErrorCode};
use crate::domain::{Event, EventId};
use crate::infra::CertificateError;
use crate::server::AppState;

/// Load an event or fail with `EVENT_NOT_FOUND`.
async fn load_event(state: &AppState, event_id: EventId) -> Result<Event, ApiError> {
    state
        .directory
        .get_event(event_id)
        .await?
        .ok_or_else(|| CertificateError::EventNotFound(event_id).into())
}

fn invalid_body(rejection: JsonRejection) -> ApiError {
    ApiError::new(ErrorCode::InvalidRequestBody, rejection.body_text())
}

fn invalid_path(rejection: PathRejection) -> ApiError {
    ApiError::new(ErrorCode::InvalidFieldValue, rejection.body_text())
}
