//! Certificate issuance workflow
//!
//! attendance gate -> artifact rendering -> idempotent persistence,
//! plus the public verification lookup over issued records.

mod code;
mod gate;
mod ledger;
mod verify;

pub use code::generate_code;
pub use gate::AttendanceGate;
pub use ledger::IssuanceLedger;
pub use verify::VerificationLookup;
