//! Certificate artifact rendering
//!
//! Two modes:
//! - raster: a fixed-layout PNG drawn from certificate data alone
//! - document: a pptx template with placeholders filled in, optionally
//!   converted to PDF by an external office suite
//!
//! Conversion is best-effort. Any converter failure degrades the artifact
//! to raster output and the reason is reported to the caller.

mod convert;
mod document;
mod glyphs;
mod raster;

use std::sync::Arc;

use thiserror::Error;
use tracing::warn;

pub use convert::{ConverterConfig, OfficeConverter, DEFAULT_CONVERTER_TIMEOUT};
pub use document::{render_document, substitute_placeholders};
pub use raster::{fit_line, render_raster, text_width, CANVAS_HEIGHT, CANVAS_WIDTH};

use crate::domain::{ArtifactFormat, CertificateData, CertificateTemplate, RenderMode};
use crate::infra::{ArtifactStore, CertificateError, Converter, Result};

/// Rendering failures. Never retried.
#[derive(Error, Debug)]
pub enum RenderError {
    /// Template asset could not be loaded
    #[error("missing template asset: {0}")]
    MissingAsset(String),

    /// Template asset is not a usable slide deck
    #[error("invalid template: {0}")]
    InvalidTemplate(String),

    /// Output could not be encoded
    #[error("encoding failed: {0}")]
    Encode(String),
}

/// An encoded certificate ready for storage
#[derive(Debug, Clone)]
pub struct RenderedArtifact {
    pub bytes: Vec<u8>,
    pub format: ArtifactFormat,
    /// Why document output was replaced by raster output, if it was
    pub fallback: Option<String>,
}

/// Produces certificate artifacts from data and an optional template
#[derive(Clone)]
pub struct ArtifactRenderer {
    assets: Arc<dyn ArtifactStore>,
    converter: Option<Arc<dyn Converter>>,
}

impl ArtifactRenderer {
    /// `converter` is `None` when document output is stored as pptx.
    pub fn new(assets: Arc<dyn ArtifactStore>, converter: Option<Arc<dyn Converter>>) -> Self {
        Self { assets, converter }
    }

    pub async fn render(
        &self,
        data: &CertificateData,
        template: Option<&CertificateTemplate>,
    ) -> Result<RenderedArtifact> {
        let template = match template {
            Some(t) if t.mode == RenderMode::Document => t,
            _ => return raster_artifact(data.clone(), None).await,
        };

        let asset_key = template.asset_key.as_deref().ok_or_else(|| {
            RenderError::MissingAsset(format!("template {} has no asset", template.id))
        })?;
        let asset = self
            .assets
            .get(asset_key)
            .await
            .map_err(|e| RenderError::MissingAsset(format!("{asset_key}: {e}")))?;

        let mapping = template.mapping.clone();
        let owned = data.clone();
        let deck = tokio::task::spawn_blocking(move || render_document(&asset, &mapping, &owned))
            .await
            .map_err(|e| CertificateError::Internal(format!("render task failed: {e}")))??;

        let Some(converter) = &self.converter else {
            return Ok(RenderedArtifact {
                bytes: deck,
                format: ArtifactFormat::Pptx,
                fallback: None,
            });
        };

        match converter
            .convert(deck, ArtifactFormat::Pptx, ArtifactFormat::Pdf)
            .await
        {
            Ok(pdf) => Ok(RenderedArtifact {
                bytes: pdf,
                format: ArtifactFormat::Pdf,
                fallback: None,
            }),
            Err(e) if e.is_converter_fallback() => {
                warn!(
                    code = %data.certificate_code,
                    error = %e,
                    "Converter failed, falling back to raster output"
                );
                raster_artifact(data.clone(), Some(e.to_string())).await
            }
            Err(e) => Err(e),
        }
    }
}

async fn raster_artifact(
    data: CertificateData,
    fallback: Option<String>,
) -> Result<RenderedArtifact> {
    let bytes = tokio::task::spawn_blocking(move || render_raster(&data))
        .await
        .map_err(|e| CertificateError::Internal(format!("render task failed: {e}")))??;

    Ok(RenderedArtifact {
        bytes,
        format: ArtifactFormat::Png,
        fallback,
    })
}
