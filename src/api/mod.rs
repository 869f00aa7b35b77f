//! REST API for the certificate service
//!
//! Authenticated routes live under `/api/v1`; verification is public.

mod error;
pub mod handlers;
mod rest;
pub mod types;

pub use error::*;
pub use rest::*;
