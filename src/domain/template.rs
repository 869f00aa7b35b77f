//! Organizer-supplied certificate templates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::{EventId, TemplateId};

/// How a certificate artifact is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    /// Fixed-layout image drawn by the service
    Raster,
    /// Organizer slide deck with placeholder substitution
    Document,
}

impl RenderMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderMode::Raster => "raster",
            RenderMode::Document => "document",
        }
    }
}

impl fmt::Display for RenderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RenderMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "raster" => Ok(RenderMode::Raster),
            "document" => Ok(RenderMode::Document),
            other => Err(format!("unknown render mode: {other}")),
        }
    }
}

/// Placeholder name (without braces) to data field name.
pub type PlaceholderMapping = BTreeMap<String, String>;

/// A certificate template owned by an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CertificateTemplate {
    pub id: TemplateId,
    pub event_id: EventId,
    pub name: String,
    pub mode: RenderMode,
    /// Storage key of the slide-deck asset (document mode only)
    pub asset_key: Option<String>,
    pub mapping: PlaceholderMapping,
    pub created_at: DateTime<Utc>,
}

/// Input for registering a template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTemplate {
    pub event_id: EventId,
    pub name: String,
    pub mode: RenderMode,
    pub asset_key: Option<String>,
    #[serde(default)]
    pub mapping: PlaceholderMapping,
}
