//! PostgreSQL implementations for production storage
//!
//! Provides the event directory, certificate ledger store and audit log
//! for the production certificate service.

mod audit;
mod certificates;
mod directory;

pub use audit::*;
pub use certificates::*;
pub use directory::*;
