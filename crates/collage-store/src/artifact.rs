//! Stored artifact descriptors
//!
//! An [`Artifact`] is what the media store hands back after an upload or a
//! composition. It is immutable once returned; the store owns the underlying
//! object until it is explicitly deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Store-assigned artifact identifier
///
/// Opaque to this system: it is only ever compared and passed back to the
/// store that issued it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactId(String);

impl ArtifactId {
    /// Wrap a store-assigned identifier
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw identifier
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ArtifactId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ArtifactId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Result of a successful store or compose operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    /// Unique, store-assigned identifier
    pub id: ArtifactId,
    /// Retrievable address of the stored image
    pub url: String,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Encoded format reported by the store (e.g. "png")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// Creation time reported by the store
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Artifact {
    /// Create a descriptor with the mandatory attributes
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<ArtifactId>, url: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            width,
            height,
            format: None,
            created_at: None,
        }
    }

    /// With encoded format
    #[inline]
    #[must_use]
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    /// With creation timestamp
    #[inline]
    #[must_use]
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }
}

/// Visibility scope of a stored artifact
///
/// Raw uploads are scratch material; composites are the user-facing
/// collection that `list` returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// Intermediate uploads, never listed
    Scratch,
    /// Finished collages
    Collection,
}

impl Scope {
    /// Path segment used in addresses
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Scratch => "scratch",
            Scope::Collection => "collection",
        }
    }
}
