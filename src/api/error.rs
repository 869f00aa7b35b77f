//! Structured API error responses with error codes
//!
//! Every failing endpoint answers with the same JSON envelope carrying a
//! machine-readable code and a human-readable message.

use axum::http::header::{HeaderName, HeaderValue, RETRY_AFTER};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::auth::AuthError;
use crate::infra::CertificateError;

// ============================================================================
// Error Codes
// ============================================================================

/// Stable codes clients can branch on. The thousands digit groups them:
/// 1 auth, 3 validation, 4 missing resource, 5 conflict, 6 eligibility,
/// 7 state, 8 infrastructure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    AuthRequired,
    InvalidToken,
    TokenExpired,
    /// Caller may not act on this event
    InsufficientPermissions,

    InvalidRequestBody,
    InvalidFieldValue,

    EventNotFound,
    RegistrationNotFound,
    /// Also used for templates owned by another event
    TemplateNotFound,
    CertificateNotFound,

    AlreadyIssued,

    /// Event has not ended yet
    NotYetEligible,
    NoEligibleParticipants,

    InvalidStateTransition,

    DatabaseError,
    StorageUnavailable,
    RenderFailed,
    ConversionFailed,
    InternalError,
}

impl ErrorCode {
    /// Wire name, identical to the serialized form
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::AuthRequired => "AUTH_REQUIRED",
            ErrorCode::InvalidToken => "INVALID_TOKEN",
            ErrorCode::TokenExpired => "TOKEN_EXPIRED",
            ErrorCode::InsufficientPermissions => "INSUFFICIENT_PERMISSIONS",
            ErrorCode::InvalidRequestBody => "INVALID_REQUEST_BODY",
            ErrorCode::InvalidFieldValue => "INVALID_FIELD_VALUE",
            ErrorCode::EventNotFound => "EVENT_NOT_FOUND",
            ErrorCode::RegistrationNotFound => "REGISTRATION_NOT_FOUND",
            ErrorCode::TemplateNotFound => "TEMPLATE_NOT_FOUND",
            ErrorCode::CertificateNotFound => "CERTIFICATE_NOT_FOUND",
            ErrorCode::AlreadyIssued => "ALREADY_ISSUED",
            ErrorCode::NotYetEligible => "NOT_YET_ELIGIBLE",
            ErrorCode::NoEligibleParticipants => "NO_ELIGIBLE_PARTICIPANTS",
            ErrorCode::InvalidStateTransition => "INVALID_STATE_TRANSITION",
            ErrorCode::DatabaseError => "DATABASE_ERROR",
            ErrorCode::StorageUnavailable => "STORAGE_UNAVAILABLE",
            ErrorCode::RenderFailed => "RENDER_FAILED",
            ErrorCode::ConversionFailed => "CONVERSION_FAILED",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }

    pub fn numeric_code(&self) -> u32 {
        match self {
            ErrorCode::AuthRequired => 1001,
            ErrorCode::InvalidToken => 1002,
            ErrorCode::TokenExpired => 1003,
            ErrorCode::InsufficientPermissions => 1004,
            ErrorCode::InvalidRequestBody => 3001,
            ErrorCode::InvalidFieldValue => 3002,
            ErrorCode::EventNotFound => 4002,
            ErrorCode::RegistrationNotFound => 4003,
            ErrorCode::TemplateNotFound => 4004,
            ErrorCode::CertificateNotFound => 4005,
            ErrorCode::AlreadyIssued => 5001,
            ErrorCode::NotYetEligible => 6001,
            ErrorCode::NoEligibleParticipants => 6002,
            ErrorCode::InvalidStateTransition => 7001,
            ErrorCode::DatabaseError => 8001,
            ErrorCode::StorageUnavailable => 8002,
            ErrorCode::RenderFailed => 8003,
            ErrorCode::ConversionFailed => 8004,
            ErrorCode::InternalError => 8999,
        }
    }

    pub fn http_status(&self) -> StatusCode {
        use ErrorCode::*;
        match self {
            AuthRequired | InvalidToken | TokenExpired => StatusCode::UNAUTHORIZED,
            InsufficientPermissions => StatusCode::FORBIDDEN,
            InvalidRequestBody | InvalidFieldValue | NotYetEligible | NoEligibleParticipants => {
                StatusCode::BAD_REQUEST
            }
            EventNotFound | RegistrationNotFound | TemplateNotFound | CertificateNotFound => {
                StatusCode::NOT_FOUND
            }
            AlreadyIssued | InvalidStateTransition => StatusCode::CONFLICT,
            StorageUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            DatabaseError | RenderFailed | ConversionFailed | InternalError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Response envelope
// ============================================================================

/// `{"error": {...}}` body returned by every failing endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ErrorDetails,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: ErrorCode,
    pub numeric_code: u32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    /// Seconds to wait before retrying; mirrored in the `Retry-After` header
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
    /// Event, registration, or template the error is about
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetails {
                code,
                numeric_code: code.numeric_code(),
                message: message.into(),
                details: None,
                retry_after: None,
                resource_id: None,
            },
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.error.details = Some(details);
        self
    }

    pub fn with_retry_after(mut self, seconds: u64) -> Self {
        self.error.retry_after = Some(seconds);
        self
    }

    pub fn with_resource_id(mut self, id: impl Into<String>) -> Self {
        self.error.resource_id = Some(id.into());
        self
    }

    pub fn status(&self) -> StatusCode {
        self.error.code.http_status()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.error.code;
        let retry_after = self.error.retry_after;
        let mut response = (status, Json(self)).into_response();

        let headers = response.headers_mut();
        headers.insert(
            HeaderName::from_static("x-error-code"),
            HeaderValue::from_static(code.as_str()),
        );
        if let Some(seconds) = retry_after {
            headers.insert(RETRY_AFTER, seconds.into());
        }

        response
    }
}

// ============================================================================
// Conversions
// ============================================================================

impl From<CertificateError> for ApiError {
    fn from(err: CertificateError) -> Self {
        match err {
            CertificateError::Database(e) => {
                tracing::error!(error = %e, "Database error");
                ApiError::new(ErrorCode::DatabaseError, "Database error")
            }
            CertificateError::NotYetEligible { event_id, ends_at } => ApiError::new(
                ErrorCode::NotYetEligible,
                "Certificates can only be generated after the event has ended",
            )
            .with_resource_id(event_id.to_string())
            .with_details(serde_json::json!({ "endsAt": ends_at })),
            CertificateError::NoEligibleParticipants(event_id) => ApiError::new(
                ErrorCode::NoEligibleParticipants,
                "No checked-in participants found",
            )
            .with_resource_id(event_id.to_string()),
            CertificateError::EventNotFound(id) => {
                ApiError::new(ErrorCode::EventNotFound, format!("Event not found: {id}"))
                    .with_resource_id(id.to_string())
            }
            CertificateError::RegistrationNotFound(id) => ApiError::new(
                ErrorCode::RegistrationNotFound,
                format!("Registration not found: {id}"),
            )
            .with_resource_id(id.to_string()),
            CertificateError::TemplateNotFound(id) => ApiError::new(
                ErrorCode::TemplateNotFound,
                format!("Template not found: {id}"),
            )
            .with_resource_id(id.to_string()),
            CertificateError::Render(e) => {
                ApiError::new(ErrorCode::RenderFailed, format!("Render failed: {e}"))
            }
            e @ (CertificateError::ConverterUnavailable(_)
            | CertificateError::ConverterTimeout { .. }
            | CertificateError::ConverterFailed(_)) => {
                ApiError::new(ErrorCode::ConversionFailed, e.to_string())
            }
            CertificateError::StorageUnavailable(msg) => {
                tracing::warn!(error = %msg, "Artifact storage unavailable");
                ApiError::new(ErrorCode::StorageUnavailable, "Artifact storage unavailable")
                    .with_retry_after(30)
            }
            e @ CertificateError::DuplicateIssuance { .. } => {
                ApiError::new(ErrorCode::AlreadyIssued, e.to_string())
            }
            CertificateError::NotFound => {
                ApiError::new(ErrorCode::CertificateNotFound, "Certificate not found")
            }
            e @ CertificateError::InvalidStateTransition { .. } => {
                ApiError::new(ErrorCode::InvalidStateTransition, e.to_string())
            }
            CertificateError::Unauthorized(msg) => {
                ApiError::new(ErrorCode::InsufficientPermissions, msg)
            }
            CertificateError::Configuration(msg) | CertificateError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                ApiError::new(ErrorCode::InternalError, "Internal server error")
            }
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingAuth => unauthorized("Missing authentication"),
            AuthError::InvalidJwt(_) => ApiError::new(ErrorCode::InvalidToken, "Invalid JWT"),
            AuthError::TokenExpired => ApiError::new(ErrorCode::TokenExpired, "Token expired"),
            AuthError::InsufficientPermissions => forbidden("Insufficient permissions"),
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

pub fn unauthorized(message: impl Into<String>) -> ApiError {
    ApiError::new(ErrorCode::AuthRequired, message)
}

pub fn forbidden(message: impl Into<String>) -> ApiError {
    ApiError::new(ErrorCode::InsufficientPermissions, message)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::EventId;

    #[test]
    fn test_error_code_numeric() {
        assert_eq!(ErrorCode::AuthRequired.numeric_code(), 1001);
        assert_eq!(ErrorCode::InvalidRequestBody.numeric_code(), 3001);
        assert_eq!(ErrorCode::EventNotFound.numeric_code(), 4002);
        assert_eq!(ErrorCode::AlreadyIssued.numeric_code(), 5001);
        assert_eq!(ErrorCode::NotYetEligible.numeric_code(), 6001);
        assert_eq!(ErrorCode::InvalidStateTransition.numeric_code(), 7001);
        assert_eq!(ErrorCode::DatabaseError.numeric_code(), 8001);
        assert_eq!(ErrorCode::InternalError.numeric_code(), 8999);
    }

    #[test]
    fn test_error_code_http_status() {
        assert_eq!(ErrorCode::AuthRequired.http_status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ErrorCode::InsufficientPermissions.http_status(), StatusCode::FORBIDDEN);
        assert_eq!(ErrorCode::NotYetEligible.http_status(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::CertificateNotFound.http_status(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorCode::InvalidStateTransition.http_status(), StatusCode::CONFLICT);
        assert_eq!(ErrorCode::StorageUnavailable.http_status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(ErrorCode::InternalError.http_status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_from_certificate_error() {
        let event_id = EventId::new();
        let err = ApiError::from(CertificateError::NotYetEligible {
            event_id,
            ends_at: chrono::Utc::now(),
        });
        assert_eq!(err.error.code, ErrorCode::NotYetEligible);
        assert_eq!(err.error.resource_id, Some(event_id.to_string()));
        assert!(err.error.details.is_some());

        let err = ApiError::from(CertificateError::NotFound);
        assert_eq!(err.status(), StatusCode::NOT_FOUND);

        let err = ApiError::from(CertificateError::StorageUnavailable("bucket down".into()));
        assert_eq!(err.error.retry_after, Some(30));
        assert!(!err.error.message.contains("bucket down"));
    }

    #[test]
    fn test_from_auth_error() {
        assert_eq!(
            ApiError::from(AuthError::TokenExpired).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::from(AuthError::InsufficientPermissions).error.code,
            ErrorCode::InsufficientPermissions
        );
    }

    #[test]
    fn test_wire_name_matches_serde() {
        for code in [
            ErrorCode::NotYetEligible,
            ErrorCode::CertificateNotFound,
            ErrorCode::InsufficientPermissions,
        ] {
            assert_eq!(serde_json::to_value(code).unwrap(), code.as_str());
        }
    }

    #[test]
    fn test_error_serialization() {
        let error = ApiError::new(ErrorCode::CertificateNotFound, "Certificate not found");
        let json = serde_json::to_string(&error).unwrap();

        assert!(json.contains("CERTIFICATE_NOT_FOUND"));
        assert!(json.contains("Certificate not found"));
        assert!(json.contains("4005"));
        assert!(!json.contains("retry_after"));
    }

    #[test]
    fn test_into_response_headers() {
        let response =
            ApiError::from(CertificateError::StorageUnavailable("x".into())).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.headers()["x-error-code"], "STORAGE_UNAVAILABLE");
        assert_eq!(response.headers()["retry-after"], "30");
    }
}
