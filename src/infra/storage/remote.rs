//! Remote object storage over HTTP
//!
//! Speaks the S3/Supabase-style object API:
//! `PUT {base}/object/{bucket}/{key}` to upload and
//! `{base}/object/public/{bucket}/{key}` as the public download URL.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use tracing::{debug, instrument};

use super::validate_key;
use crate::domain::ArtifactFormat;
use crate::infra::retry::RetryPolicy;
use crate::infra::{ArtifactStore, CertificateError, Result};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Object storage reachable over HTTP
pub struct RemoteArtifactStore {
    base_url: String,
    bucket: String,
    client: reqwest::Client,
    headers: HeaderMap,
    retry: RetryPolicy,
}

#[derive(Debug)]
enum TransferError {
    Transport(reqwest::Error),
    Status(StatusCode, String),
}

impl TransferError {
    fn is_transient(&self) -> bool {
        match self {
            TransferError::Transport(e) => e.is_connect() || e.is_timeout() || e.is_request(),
            TransferError::Status(status, _) => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
        }
    }
}

impl fmt::Display for TransferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferError::Transport(e) => write!(f, "transport error: {e}"),
            TransferError::Status(status, body) if body.is_empty() => write!(f, "status {status}"),
            TransferError::Status(status, body) => write!(f, "status {status}: {body}"),
        }
    }
}

impl RemoteArtifactStore {
    pub fn new(
        base_url: impl Into<String>,
        bucket: impl Into<String>,
        token: Option<String>,
        retry: RetryPolicy,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| CertificateError::Configuration(format!("http client: {e}")))?;

        let mut headers = HeaderMap::new();
        if let Some(token) = token.filter(|t| !t.is_empty()) {
            let value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|e| {
                CertificateError::Configuration(format!("invalid storage token: {e}"))
            })?;
            headers.insert(AUTHORIZATION, value);
        }

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            bucket: bucket.into(),
            client,
            headers,
            retry,
        })
    }

    fn object_url(&self, key: &str) -> String {
        format!("{}/object/{}/{}", self.base_url, self.bucket, key)
    }

    pub fn public_url(&self, key: &str) -> String {
        format!("{}/object/public/{}/{}", self.base_url, self.bucket, key)
    }

    async fn upload_once(
        &self,
        url: &str,
        key: &str,
        bytes: &[u8],
    ) -> std::result::Result<(), TransferError> {
        let content_type = ArtifactFormat::from_key(key)
            .map(|f| f.content_type())
            .unwrap_or("application/octet-stream");

        let resp = self
            .client
            .put(url)
            .headers(self.headers.clone())
            .header(CONTENT_TYPE, content_type)
            .header("x-upsert", "true")
            .body(bytes.to_vec())
            .send()
            .await
            .map_err(TransferError::Transport)?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        let body = resp.text().await.unwrap_or_default();
        Err(TransferError::Status(status, body))
    }

    async fn download_once(&self, url: &str) -> std::result::Result<Vec<u8>, TransferError> {
        let resp = self
            .client
            .get(url)
            .headers(self.headers.clone())
            .send()
            .await
            .map_err(TransferError::Transport)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(TransferError::Status(status, body));
        }
        resp.bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(TransferError::Transport)
    }
}

#[async_trait]
impl ArtifactStore for RemoteArtifactStore {
    #[instrument(name = "remote_store_put", skip(self, bytes), fields(size = bytes.len()))]
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<String> {
        validate_key(key)?;
        let url = self.object_url(key);

        let (outcome, attempts) = self
            .retry
            .run(
                "storage upload",
                || self.upload_once(&url, key, &bytes),
                TransferError::is_transient,
            )
            .await;

        outcome.map_err(|e| {
            CertificateError::StorageUnavailable(format!(
                "upload of {key} failed after {attempts} attempt(s): {e}"
            ))
        })?;

        debug!(key, attempts, "Uploaded artifact");
        Ok(self.public_url(key))
    }

    #[instrument(name = "remote_store_get", skip(self))]
    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        validate_key(key)?;
        let url = self.object_url(key);

        let (outcome, _) = self
            .retry
            .run(
                "storage download",
                || self.download_once(&url),
                TransferError::is_transient,
            )
            .await;
        outcome.map_err(|e| {
            CertificateError::StorageUnavailable(format!("download of {key} failed: {e}"))
        })
    }

    fn backend_tag(&self) -> &'static str {
        "remote"
    }
}
