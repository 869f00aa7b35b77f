//! Identifier and format types shared across the domain.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub uuid::Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(uuid::Uuid::new_v4())
            }

            pub fn from_uuid(id: uuid::Uuid) -> Self {
                Self(id)
            }

            pub fn as_uuid(&self) -> uuid::Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<uuid::Uuid> for $name {
            fn from(id: uuid::Uuid) -> Self {
                Self(id)
            }
        }
    };
}

uuid_id!(
    /// Event identifier
    EventId
);
uuid_id!(
    /// Registration identifier (one participant's registration for one event)
    RegistrationId
);
uuid_id!(
    /// Platform user identifier (organizers, staff, admins)
    UserId
);
uuid_id!(
    /// Certificate template identifier
    TemplateId
);
uuid_id!(
    /// Certificate record identifier
    CertificateId
);

/// Encoded artifact formats produced by the renderer and converter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactFormat {
    /// Raster certificate image
    Png,
    /// Slide-deck document (Office Open XML presentation)
    Pptx,
    /// Portable document
    Pdf,
}

impl ArtifactFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactFormat::Png => "png",
            ArtifactFormat::Pptx => "pptx",
            ArtifactFormat::Pdf => "pdf",
        }
    }

    /// File extension, without the leading dot.
    pub fn extension(&self) -> &'static str {
        self.as_str()
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ArtifactFormat::Png => "image/png",
            ArtifactFormat::Pptx => {
                "application/vnd.openxmlformats-officedocument.presentationml.presentation"
            }
            ArtifactFormat::Pdf => "application/pdf",
        }
    }

    /// Guess the format from a storage key or file name.
    pub fn from_key(key: &str) -> Option<Self> {
        let (_, ext) = key.rsplit_once('.')?;
        ext.parse().ok()
    }
}

impl fmt::Display for ArtifactFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArtifactFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "png" => Ok(ArtifactFormat::Png),
            "pptx" => Ok(ArtifactFormat::Pptx),
            "pdf" => Ok(ArtifactFormat::Pdf),
            other => Err(format!("unknown artifact format: {other}")),
        }
    }
}
