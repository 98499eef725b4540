//! Core types for collage composition
//!
//! - Orchestrator configuration
//! - Batch identity
//! - Batch outcome and cleanup reporting

use crate::error::ConfigError;
use crate::phase::BatchPhase;
use collage_store::{Artifact, ArtifactId, OverlayDirective};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use ulid::Ulid;

/// Identifier of one in-flight batch (ULID for sortability in logs)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BatchId(pub Ulid);

impl BatchId {
    /// Generate new batch ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for BatchId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for BatchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Orchestrator configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollageConfig {
    /// Per-upload timeout in seconds
    pub upload_timeout_secs: u64,
    /// Compose call timeout in seconds
    pub compose_timeout_secs: u64,
    /// Per-delete timeout in seconds
    pub delete_timeout_secs: u64,
    /// Listing timeout in seconds
    pub list_timeout_secs: u64,
    /// Uploads in flight at once (1 = sequential)
    pub upload_concurrency: usize,
    /// Largest accepted batch
    pub max_images: usize,
    /// Delete already-uploaded artifacts when a batch aborts
    pub rollback_on_failure: bool,
    /// Also delete the base once a distinct composite exists
    pub discard_base: bool,
}

impl CollageConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With upload concurrency
    #[inline]
    #[must_use]
    pub fn with_upload_concurrency(mut self, concurrency: usize) -> Self {
        self.upload_concurrency = concurrency;
        self
    }

    /// With compensating deletes on failure
    #[inline]
    #[must_use]
    pub fn with_rollback(mut self, enabled: bool) -> Self {
        self.rollback_on_failure = enabled;
        self
    }

    /// With base deletion after compose
    #[inline]
    #[must_use]
    pub fn with_discard_base(mut self, enabled: bool) -> Self {
        self.discard_base = enabled;
        self
    }

    /// With maximum batch size
    #[inline]
    #[must_use]
    pub fn with_max_images(mut self, max: usize) -> Self {
        self.max_images = max;
        self
    }

    /// With all four call timeouts set to `secs`
    #[inline]
    #[must_use]
    pub fn with_timeouts(mut self, secs: u64) -> Self {
        self.upload_timeout_secs = secs;
        self.compose_timeout_secs = secs;
        self.delete_timeout_secs = secs;
        self.list_timeout_secs = secs;
        self
    }

    /// Upload timeout
    #[inline]
    #[must_use]
    pub fn upload_timeout(&self) -> Duration {
        Duration::from_secs(self.upload_timeout_secs)
    }

    /// Compose timeout
    #[inline]
    #[must_use]
    pub fn compose_timeout(&self) -> Duration {
        Duration::from_secs(self.compose_timeout_secs)
    }

    /// Delete timeout
    #[inline]
    #[must_use]
    pub fn delete_timeout(&self) -> Duration {
        Duration::from_secs(self.delete_timeout_secs)
    }

    /// List timeout
    #[inline]
    #[must_use]
    pub fn list_timeout(&self) -> Duration {
        Duration::from_secs(self.list_timeout_secs)
    }

    /// Check every field is usable
    ///
    /// # Errors
    /// Returns [`ConfigError::Zero`] naming the first zero-valued field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("upload_timeout_secs", self.upload_timeout_secs == 0),
            ("compose_timeout_secs", self.compose_timeout_secs == 0),
            ("delete_timeout_secs", self.delete_timeout_secs == 0),
            ("list_timeout_secs", self.list_timeout_secs == 0),
            ("upload_concurrency", self.upload_concurrency == 0),
            ("max_images", self.max_images == 0),
        ];
        match positive.into_iter().find(|(_, zero)| *zero) {
            Some((field, _)) => Err(ConfigError::Zero(field)),
            None => Ok(()),
        }
    }
}

impl Default for CollageConfig {
    fn default() -> Self {
        Self {
            upload_timeout_secs: 30,
            compose_timeout_secs: 60,
            delete_timeout_secs: 15,
            list_timeout_secs: 15,
            upload_concurrency: 1,
            max_images: 32,
            rollback_on_failure: false,
            discard_base: false,
        }
    }
}

/// One delete that did not go through
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupFailure {
    /// Artifact that is still in the store
    pub id: ArtifactId,
    /// Why the delete failed
    pub reason: String,
}

/// Cleanup finished with some deletes failing
///
/// The composite is still valid; these artifacts need reconciling later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupPartialFailure {
    /// Failed deletes, in the order they were attempted
    pub failures: Vec<CleanupFailure>,
}

impl CleanupPartialFailure {
    /// Artifacts left behind
    #[must_use]
    pub fn orphaned(&self) -> Vec<ArtifactId> {
        self.failures.iter().map(|f| f.id.clone()).collect()
    }
}

/// Result of a completed batch
#[derive(Debug, Clone)]
pub struct CollageOutcome {
    /// Batch identity
    pub batch_id: BatchId,
    /// Final composite
    pub artifact: Artifact,
    /// Artifact composition was based on
    pub base: ArtifactId,
    /// Directives sent with the compose call
    pub overlays: Vec<OverlayDirective>,
    /// Intermediates successfully deleted
    pub deleted: Vec<ArtifactId>,
    /// Deletes that failed, if any
    pub cleanup: Option<CleanupPartialFailure>,
    /// Phases the batch passed through
    pub phases: Vec<BatchPhase>,
}

impl CollageOutcome {
    /// Whether cleanup left nothing behind
    #[inline]
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.cleanup.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = CollageConfig::new();
        assert!(config.validate().is_ok());
        assert_eq!(config.upload_concurrency, 1);
        assert_eq!(config.compose_timeout(), Duration::from_secs(60));
    }

    #[test]
    fn zero_fields_are_rejected() {
        let config = CollageConfig::new().with_upload_concurrency(0);
        assert_eq!(config.validate(), Err(ConfigError::Zero("upload_concurrency")));

        let config = CollageConfig::new().with_timeouts(0);
        assert_eq!(config.validate(), Err(ConfigError::Zero("upload_timeout_secs")));
    }

    #[test]
    fn partial_config_deserializes_with_defaults() {
        let config: CollageConfig =
            serde_json::from_str(r#"{"discard_base":true,"upload_concurrency":4}"#).unwrap();
        assert!(config.discard_base);
        assert_eq!(config.upload_concurrency, 4);
        assert_eq!(config.delete_timeout_secs, 15);
    }

    #[test]
    fn batch_ids_are_unique() {
        assert_ne!(BatchId::new(), BatchId::new());
    }
}
