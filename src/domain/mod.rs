//! Domain models for the certificate service
//!
//! Typed records for events, registrations, attendance, certificate templates
//! and issued certificates.

mod certificate;
mod event;
mod template;
mod types;

pub use certificate::*;
pub use event::*;
pub use template::*;
pub use types::*;
