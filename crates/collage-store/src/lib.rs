//! Collage Artifact Store
//!
//! Data model and clients for the media storage/transformation service.
//!
//! # Core Concepts
//!
//! - [`Artifact`]: descriptor of a stored image (id, url, dimensions)
//! - [`RawImage`]: encoded image bytes awaiting upload
//! - [`OverlayDirective`]: where and how one artifact is drawn onto a base
//! - [`ArtifactStore`]: the store capability (`store`, `compose`, `delete`, `list`)
//!
//! # Implementations
//!
//! - [`MemoryArtifactStore`]: in-process, composes pixels locally
//! - [`HttpArtifactStore`]: REST client for a remote media service
//!
//! # Example
//!
//! ```rust,ignore
//! use collage_store::{ArtifactStore, MemoryArtifactStore, RawImage};
//!
//! let store = MemoryArtifactStore::new();
//! let artifact = store.store(&RawImage::decode(png_bytes)?).await?;
//! println!("stored {} at {}", artifact.id, artifact.url);
//! ```

#![warn(unreachable_pub)]

mod artifact;
mod directive;
mod http;
mod memory;
mod raw;
mod store;

pub use artifact::{Artifact, ArtifactId, Scope};
pub use directive::{Anchor, OverlayDirective, ScaleMode};
pub use http::{HttpArtifactStore, HttpStoreConfig};
pub use memory::MemoryArtifactStore;
pub use raw::{ImageError, RawImage};
pub use store::{ArtifactStore, StoreError, StoreOperation};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
