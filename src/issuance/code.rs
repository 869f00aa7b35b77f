//! Certificate code generation

use rand::rngs::OsRng;
use rand::RngCore;

use crate::domain::{CertificateCode, CERTIFICATE_CODE_BYTES};

/// Generate a fresh code with 64 bits of OS randomness
pub fn generate_code() -> CertificateCode {
    let mut bytes = [0u8; CERTIFICATE_CODE_BYTES];
    OsRng.fill_bytes(&mut bytes);
    CertificateCode::from_random(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_codes_are_well_formed() {
        let code = generate_code();
        assert_eq!(CertificateCode::parse(code.as_str()), Some(code.clone()));
        assert!(code.as_str().starts_with("CERT-"));
        assert_eq!(code.as_str().len(), 5 + 16);
    }

    #[test]
    fn test_ten_thousand_codes_are_unique() {
        let codes: HashSet<_> = (0..10_000).map(|_| generate_code()).collect();
        assert_eq!(codes.len(), 10_000);
    }
}
