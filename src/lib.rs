//! Event Certificates Library
//!
//! Issues attendance certificates for ended events and verifies them by code.
//!
//! ## Modules
//!
//! - [`domain`] - Core domain types (events, registrations, templates, certificates)
//! - [`infra`] - Infrastructure implementations (PostgreSQL, SQLite, storage, audit)
//! - [`render`] - Raster and document rendering, PDF conversion
//! - [`issuance`] - Attendance gate, issuance ledger, verification lookup
//! - [`auth`] - Authentication (JWT)
//! - [`api`] - REST API routes
//! - [`config`] - Environment configuration
//! - [`server`] - Service wiring and the HTTP server

pub mod api;
pub mod auth;
pub mod config;
pub mod domain;
pub mod infra;
pub mod issuance;
pub mod migrations;
pub mod render;
pub mod server;

// Re-export commonly used types
pub use domain::{
    Certificate, CertificateCode, CertificateData, CertificateTemplate, Event, EventId,
    IssuanceReport, IssueOutcome, Registration, RegistrationId, TemplateId, UserId,
    VerifiedCertificate,
};

pub use infra::{ArtifactStore, CertificateError, CertificateStore, EventDirectory, Result};
