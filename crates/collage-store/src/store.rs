//! Artifact store capability
//!
//! The media storage/transformation service is a remote collaborator. This
//! module defines only the capability the collage pipeline needs from it:
//! - `store`: upload raw bytes, get a descriptor back
//! - `compose`: draw overlays onto a base, producing a new artifact
//! - `delete`: remove an artifact (idempotent)
//! - `list`: enumerate finished collages

use crate::artifact::{Artifact, ArtifactId};
use crate::directive::OverlayDirective;
use crate::raw::RawImage;
use async_trait::async_trait;
use std::fmt;
use std::time::Duration;

/// Store operation, used to label failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    /// Upload
    Store,
    /// Composition
    Compose,
    /// Deletion
    Delete,
    /// Listing
    List,
}

impl fmt::Display for StoreOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StoreOperation::Store => "store",
            StoreOperation::Compose => "compose",
            StoreOperation::Delete => "delete",
            StoreOperation::List => "list",
        };
        f.write_str(name)
    }
}

/// Store client errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Network or connection failure
    #[error("transport failure: {0}")]
    Transport(String),

    /// The store answered with a non-success status
    #[error("store rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// Referenced artifact does not exist
    #[error("artifact not found: {0}")]
    NotFound(ArtifactId),

    /// The store answered, but not with something we understand
    #[error("invalid store response: {0}")]
    InvalidResponse(String),

    /// Call exceeded its configured timeout
    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: StoreOperation,
        after: Duration,
    },

    /// Pixel processing inside the store failed
    #[error("image processing failed: {0}")]
    Image(String),

    /// Client could not be configured
    #[error("invalid store configuration: {0}")]
    InvalidConfig(String),
}

impl StoreError {
    /// Check if the store refused the request itself (bad reference, quota, auth)
    ///
    /// On a compose call this is the non-retryable "directive set rejected" class.
    #[inline]
    #[must_use]
    pub fn is_rejection(&self) -> bool {
        match self {
            Self::NotFound(_) => true,
            Self::Rejected { status, .. } => (400..500).contains(status) && *status != 429,
            _ => false,
        }
    }

    /// Check if repeating the same call could succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Timeout { .. } => true,
            Self::Rejected { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// Remote media store capability
///
/// Implementations must be shareable across requests; the pipeline holds them
/// as `Arc<dyn ArtifactStore>`. No ordering is guaranteed by `list`.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Upload one encoded image into scratch scope
    ///
    /// # Errors
    /// Transport failure or quota/auth rejection.
    async fn store(&self, image: &RawImage) -> Result<Artifact, StoreError>;

    /// Draw `overlays` onto `base`, creating one new artifact in collection scope
    ///
    /// The base is not mutated. An empty overlay list is a pass-through copy.
    ///
    /// # Errors
    /// Rejection if the base or any overlay reference is invalid.
    async fn compose(
        &self,
        base: &ArtifactId,
        overlays: &[OverlayDirective],
    ) -> Result<Artifact, StoreError>;

    /// Remove an artifact; removing an absent id is not an error
    ///
    /// # Errors
    /// Transport-level failures only.
    async fn delete(&self, id: &ArtifactId) -> Result<(), StoreError>;

    /// List the collection scope, in store-defined order
    ///
    /// # Errors
    /// Transport failure or rejection.
    async fn list(&self) -> Result<Vec<Artifact>, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_classes() {
        assert!(StoreError::NotFound(ArtifactId::new("x")).is_rejection());
        assert!(StoreError::Rejected {
            status: 422,
            message: "bad overlay".into()
        }
        .is_rejection());
        assert!(!StoreError::Rejected {
            status: 429,
            message: "slow down".into()
        }
        .is_rejection());
        assert!(!StoreError::Transport("reset".into()).is_rejection());
    }

    #[test]
    fn retryable_classes() {
        assert!(StoreError::Transport("reset".into()).is_retryable());
        assert!(StoreError::Timeout {
            operation: StoreOperation::Store,
            after: Duration::from_secs(1)
        }
        .is_retryable());
        assert!(StoreError::Rejected {
            status: 503,
            message: "unavailable".into()
        }
        .is_retryable());
        assert!(!StoreError::NotFound(ArtifactId::new("x")).is_retryable());
    }

    #[test]
    fn timeout_display_names_operation() {
        let err = StoreError::Timeout {
            operation: StoreOperation::Compose,
            after: Duration::from_secs(60),
        };
        assert!(err.to_string().starts_with("compose timed out"));
    }
}
