//! Artifact storage adapters
//!
//! Rendered certificates and template assets are stored as opaque blobs
//! under keys such as `certificates/CERT-0011223344556677.png`. Each backend
//! returns the public URL the artifact can be downloaded from.

mod local;
mod remote;

use std::path::PathBuf;
use std::sync::Arc;

pub use local::LocalArtifactStore;
pub use remote::RemoteArtifactStore;

use super::retry::RetryPolicy;
use super::{ArtifactStore, CertificateError, Result};

/// Which storage backend to construct
#[derive(Debug, Clone)]
pub enum StorageConfig {
    /// Files under `root`, served by this process at `{public_base_url}/files/`
    Local {
        root: PathBuf,
        public_base_url: String,
    },
    /// S3/Supabase-style object endpoint
    Remote {
        base_url: String,
        bucket: String,
        token: Option<String>,
    },
}

impl StorageConfig {
    pub fn build(&self) -> Result<Arc<dyn ArtifactStore>> {
        match self {
            StorageConfig::Local {
                root,
                public_base_url,
            } => Ok(Arc::new(LocalArtifactStore::new(
                root.clone(),
                public_base_url.clone(),
            ))),
            StorageConfig::Remote {
                base_url,
                bucket,
                token,
            } => {
                if bucket.is_empty() {
                    return Err(CertificateError::Configuration(
                        "remote storage requires a bucket".to_string(),
                    ));
                }
                Ok(Arc::new(RemoteArtifactStore::new(
                    base_url.clone(),
                    bucket.clone(),
                    token.clone(),
                    RetryPolicy::storage(),
                )?))
            }
        }
    }

    /// Local root directory, if files are served by this process
    pub fn local_root(&self) -> Option<&PathBuf> {
        match self {
            StorageConfig::Local { root, .. } => Some(root),
            StorageConfig::Remote { .. } => None,
        }
    }
}

/// Reject keys that are empty, absolute, or contain `.`/`..` segments.
pub(crate) fn validate_key(key: &str) -> Result<()> {
    let invalid = key.is_empty()
        || key.starts_with('/')
        || key.contains('\\')
        || key
            .split('/')
            .any(|segment| segment.is_empty() || segment == "." || segment == "..");

    if invalid {
        return Err(CertificateError::StorageUnavailable(format!(
            "invalid storage key: {key:?}"
        )));
    }
    Ok(())
}
