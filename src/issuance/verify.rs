//! Public verification lookup

use std::sync::Arc;

use tracing::debug;

use crate::domain::{CertificateCode, VerifiedCertificate};
use crate::infra::{CertificateError, CertificateStore, Result};

/// Resolves certificate codes for third-party verification
#[derive(Clone)]
pub struct VerificationLookup {
    certificates: Arc<dyn CertificateStore>,
}

impl VerificationLookup {
    pub fn new(certificates: Arc<dyn CertificateStore>) -> Self {
        Self { certificates }
    }

    /// Malformed and unknown codes both fail with `NotFound`.
    pub async fn verify(&self, code: &str) -> Result<VerifiedCertificate> {
        let Some(code) = CertificateCode::parse(code) else {
            debug!("Rejected malformed certificate code");
            return Err(CertificateError::NotFound);
        };

        self.certificates
            .verify(&code)
            .await?
            .ok_or(CertificateError::NotFound)
    }
}
