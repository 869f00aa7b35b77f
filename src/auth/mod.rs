//! Authentication and authorization for the certificate service
//!
//! Callers present an HMAC-signed JWT as a bearer token. The token names
//! the user and one platform role:
//!
//! - `organizer`: issues and lists certificates for events they organize,
//!   and records check-ins at those events
//! - `staff`: records check-ins
//! - `admin`: everything, for every event
//!
//! Verification of certificate codes is public and bypasses this module.
//!
//! # Configuration
//!
//! - `AUTH_MODE`: `required` (default) or `disabled` for development
//! - `JWT_SECRET`: HMAC secret for JWT validation
//! - `JWT_ISSUER`, `JWT_AUDIENCE`: expected `iss` and `aud` claims

mod jwt;
mod middleware;

pub use jwt::*;
pub use middleware::*;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::{Event, UserId};

/// Platform role carried in the token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Organizer,
    Staff,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Organizer => "organizer",
            Role::Staff => "staff",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "organizer" => Ok(Role::Organizer),
            "staff" => Ok(Role::Staff),
            "admin" => Ok(Role::Admin),
            other => Err(AuthError::InvalidJwt(format!("unknown role: {other}"))),
        }
    }
}

/// Authentication context extracted from request
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: UserId,
    pub name: String,
    pub role: Role,
}

impl AuthContext {
    /// Context used when authentication is disabled
    pub fn development() -> Self {
        Self {
            user_id: UserId::from_uuid(uuid::Uuid::nil()),
            name: "development".to_string(),
            role: Role::Admin,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// User to attribute actions to; `None` for the development context
    pub fn actor(&self) -> Option<UserId> {
        (!self.user_id.as_uuid().is_nil()).then_some(self.user_id)
    }

    /// Issue and list certificates of the event
    pub fn can_manage_event(&self, event: &Event) -> bool {
        match self.role {
            Role::Admin => true,
            Role::Organizer => event.organizer_id == self.user_id,
            Role::Staff => false,
        }
    }

    /// Record check-ins at the event
    pub fn can_check_in(&self, event: &Event) -> bool {
        self.role == Role::Staff || self.can_manage_event(event)
    }
}

/// Authentication error
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("missing authentication")]
    MissingAuth,

    #[error("invalid JWT: {0}")]
    InvalidJwt(String),

    #[error("token expired")]
    TokenExpired,

    #[error("insufficient permissions")]
    InsufficientPermissions,
}
