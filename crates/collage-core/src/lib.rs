//! Collage Core - composition planner and batch orchestrator
//!
//! Turns an ordered batch of chart images into one collage:
//! - Uploads each image to the artifact store
//! - Designates the last upload as the base canvas
//! - Places the others in a 2-column grid of 400x400 tiles
//! - Requests a single composition
//! - Deletes the intermediates that must not persist standalone
//!
//! # Example
//!
//! ```rust,ignore
//! use collage_core::{CollageConfig, CollageOrchestrator};
//! use collage_store::{MemoryArtifactStore, RawImage};
//! use std::sync::Arc;
//!
//! # async fn example(images: Vec<RawImage>) -> Result<(), Box<dyn std::error::Error>> {
//! let orchestrator =
//!     CollageOrchestrator::new(Arc::new(MemoryArtifactStore::new()), CollageConfig::new());
//!
//! let outcome = orchestrator.compose_batch(&images).await?;
//! println!("collage at {}", outcome.artifact.url);
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
pub mod error;
pub mod layout;
pub mod orchestrator;
pub mod phase;
pub mod types;

// Re-exports for convenience
pub use error::{CollageError, ConfigError};
pub use layout::{canvas_size, place, plan_overlays, Placement};
pub use orchestrator::CollageOrchestrator;
pub use phase::{allowed_transitions, validate_transition, BatchPhase, IllegalTransition};
pub use types::{
    BatchId, CleanupFailure, CleanupPartialFailure, CollageConfig, CollageOutcome,
};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with Collage Core
    pub use crate::{
        BatchPhase, CollageConfig, CollageError, CollageOrchestrator, CollageOutcome,
    };
    pub use collage_store::{Artifact, ArtifactId, ArtifactStore, RawImage};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
