//! REST API routes.

use axum::routing::{get, post};
use axum::Router;

use crate::api::handlers::{
    check_in, generate_certificates, list_event_certificates, verify_certificate,
};
use crate::server::AppState;

/// Build the authenticated `/api` router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/certificates/generate", post(generate_certificates))
        .route(
            "/v1/events/:event_id/certificates",
            get(list_event_certificates),
        )
        .route("/v1/events/:event_id/check-ins", post(check_in))
}

/// Routes that are reachable without credentials.
pub fn public_router() -> Router<AppState> {
    Router::new().route("/v1/certificates/verify/:code", get(verify_certificate))
}
