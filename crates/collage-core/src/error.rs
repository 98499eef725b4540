//! Error types for collage composition
//!
//! Upload and compose failures abort the whole batch and surface as one
//! [`CollageError`]. Cleanup failures never do: they travel alongside a
//! successful outcome as a [`crate::CleanupPartialFailure`].

use crate::phase::{BatchPhase, IllegalTransition};
use collage_store::{ArtifactId, StoreError};

/// Batch failure
#[derive(Debug, thiserror::Error)]
pub enum CollageError {
    /// No images submitted; nothing was sent to the store
    #[error("batch contains no images")]
    EmptyBatch,

    /// More images than the configured limit
    #[error("batch of {size} images exceeds the limit of {max}")]
    BatchTooLarge {
        /// Images submitted
        size: usize,
        /// Configured `max_images`
        max: usize,
    },

    /// Transport-level store failure while uploading or composing
    #[error("{phase} failed: {source}")]
    Store {
        /// Phase the failure occurred in
        phase: BatchPhase,
        /// Batch position of the failed upload, if any
        index: Option<usize>,
        /// Uploaded artifacts left behind in the store
        orphaned: Vec<ArtifactId>,
        /// Underlying store error
        source: StoreError,
    },

    /// The store rejected the compose directive set
    #[error("compose onto {base} rejected: {source}")]
    Compose {
        /// Base the composition targeted
        base: ArtifactId,
        /// Uploaded artifacts left behind in the store
        orphaned: Vec<ArtifactId>,
        /// Underlying store error
        source: StoreError,
    },

    /// Lifecycle bug
    #[error(transparent)]
    IllegalTransition(#[from] IllegalTransition),
}

impl CollageError {
    /// Short machine-readable class, used in response envelopes
    #[inline]
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::EmptyBatch => "empty_batch",
            Self::BatchTooLarge { .. } => "batch_too_large",
            Self::Store { .. } => "store",
            Self::Compose { .. } => "compose",
            Self::IllegalTransition(_) => "internal",
        }
    }

    /// Artifacts the failed batch left in the store
    #[inline]
    #[must_use]
    pub fn orphaned(&self) -> &[ArtifactId] {
        match self {
            Self::Store { orphaned, .. } | Self::Compose { orphaned, .. } => orphaned,
            _ => &[],
        }
    }

    /// Check if resubmitting the same batch could succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Store { source, .. } => source.is_retryable(),
            _ => false,
        }
    }

    /// Check if the client sent an unacceptable batch
    #[inline]
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::EmptyBatch | Self::BatchTooLarge { .. })
    }
}

/// Invalid orchestrator configuration
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A field that must be positive was zero
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds() {
        assert_eq!(CollageError::EmptyBatch.kind(), "empty_batch");
        let err = CollageError::Compose {
            base: ArtifactId::new("b"),
            orphaned: vec![],
            source: StoreError::NotFound(ArtifactId::new("b")),
        };
        assert_eq!(err.kind(), "compose");
        assert!(!err.is_retryable());
    }

    #[test]
    fn store_error_display_names_phase() {
        let err = CollageError::Store {
            phase: BatchPhase::Uploading,
            index: Some(2),
            orphaned: vec![ArtifactId::new("a"), ArtifactId::new("b")],
            source: StoreError::Transport("connection reset".into()),
        };
        assert_eq!(err.to_string(), "uploading failed: transport failure: connection reset");
        assert_eq!(err.orphaned().len(), 2);
        assert!(err.is_retryable());
    }

    #[test]
    fn empty_batch_is_client_error() {
        assert!(CollageError::EmptyBatch.is_client_error());
        assert!(CollageError::EmptyBatch.orphaned().is_empty());
    }
}
