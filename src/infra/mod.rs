//! Infrastructure layer for certificate issuance
//!
//! Contains trait definitions and implementations for:
//! - Event directory and certificate ledger storage (PostgreSQL, SQLite)
//! - Artifact storage (local filesystem, remote object store)
//! - Audit logging (issuance outcomes and reconciliation)
//! - Retry with backoff (remote storage)
//! - Shutdown signal handling

mod audit;
mod error;
mod graceful_shutdown;
pub mod postgres;
pub mod retry;
mod rows;
pub mod sqlite;
pub mod storage;
mod traits;

pub use audit::{
    record_audit, AuditAction, AuditLog, AuditLogBuilder, AuditLogEntry, AuditQueryFilters,
};
#[cfg(test)]
pub use audit::MockAuditLog;
pub use error::*;
pub use graceful_shutdown::shutdown_signal;
pub use postgres::{PgAuditLogger, PgCertificateStore, PgEventDirectory};
pub use sqlite::{SqliteAuditLogger, SqliteCertificateStore, SqliteEventDirectory};
pub use storage::{LocalArtifactStore, RemoteArtifactStore, StorageConfig};
pub use traits::*;
