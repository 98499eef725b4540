//! In-process artifact store
//!
//! Keeps artifacts in a concurrent map and performs real pixel composition,
//! so the whole pipeline can run without a remote media service.

use crate::artifact::{Artifact, ArtifactId, Scope};
use crate::directive::{OverlayDirective, ScaleMode};
use crate::raw::RawImage;
use crate::store::{ArtifactStore, StoreError};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use dashmap::DashMap;
use image::imageops::{self, FilterType};
use image::{ImageFormat, RgbaImage};
use std::io::Cursor;
use uuid::Uuid;

#[derive(Debug, Clone)]
struct Entry {
    artifact: Artifact,
    scope: Scope,
    bytes: Bytes,
}

/// Artifact store backed by process memory
///
/// Uploads go to [`Scope::Scratch`], compositions to [`Scope::Collection`];
/// `list` returns the collection only.
#[derive(Debug, Default)]
pub struct MemoryArtifactStore {
    entries: DashMap<ArtifactId, Entry>,
}

impl MemoryArtifactStore {
    /// Create an empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of artifacts across both scopes
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store holds nothing
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether an artifact exists
    #[inline]
    #[must_use]
    pub fn contains(&self, id: &ArtifactId) -> bool {
        self.entries.contains_key(id)
    }

    /// Scope an artifact lives in
    #[must_use]
    pub fn scope_of(&self, id: &ArtifactId) -> Option<Scope> {
        self.entries.get(id).map(|e| e.scope)
    }

    /// Encoded bytes of an artifact
    #[must_use]
    pub fn bytes(&self, id: &ArtifactId) -> Option<Bytes> {
        self.entries.get(id).map(|e| e.bytes.clone())
    }

    fn insert(&self, bytes: Bytes, width: u32, height: u32, scope: Scope) -> Artifact {
        let id = ArtifactId::new(Uuid::new_v4().to_string());
        let url = format!("memory://{}/{}", scope.as_str(), id);
        let mut artifact = Artifact::new(id.clone(), url, width, height).with_created_at(Utc::now());
        if let Some(ext) = image::guess_format(&bytes)
            .ok()
            .and_then(|f| f.extensions_str().first().copied())
        {
            artifact = artifact.with_format(ext);
        }

        self.entries.insert(
            id,
            Entry {
                artifact: artifact.clone(),
                scope,
                bytes,
            },
        );
        artifact
    }

    fn load(&self, id: &ArtifactId) -> Result<Bytes, StoreError> {
        self.bytes(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }
}

#[async_trait]
impl ArtifactStore for MemoryArtifactStore {
    async fn store(&self, image: &RawImage) -> Result<Artifact, StoreError> {
        if image.is_empty() {
            return Err(StoreError::Rejected {
                status: 400,
                message: "empty payload".to_string(),
            });
        }

        let artifact = self.insert(image.bytes.clone(), image.width, image.height, Scope::Scratch);
        tracing::debug!(id = %artifact.id, bytes = image.len(), "stored upload in memory");
        Ok(artifact)
    }

    async fn compose(
        &self,
        base: &ArtifactId,
        overlays: &[OverlayDirective],
    ) -> Result<Artifact, StoreError> {
        let base_bytes = self.load(base)?;
        let layers = overlays
            .iter()
            .map(|d| self.load(&d.reference_id).map(|bytes| (bytes, d.clone())))
            .collect::<Result<Vec<_>, StoreError>>()?;

        let (encoded, width, height) =
            tokio::task::spawn_blocking(move || render(&base_bytes, &layers))
                .await
                .map_err(|e| StoreError::Image(e.to_string()))??;

        let artifact = self.insert(Bytes::from(encoded), width, height, Scope::Collection);
        tracing::debug!(
            id = %artifact.id,
            base = %base,
            overlays = overlays.len(),
            width,
            height,
            "composed collage in memory"
        );
        Ok(artifact)
    }

    async fn delete(&self, id: &ArtifactId) -> Result<(), StoreError> {
        if self.entries.remove(id).is_none() {
            tracing::debug!(id = %id, "delete of absent artifact ignored");
        }
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Artifact>, StoreError> {
        let mut listed: Vec<Artifact> = self
            .entries
            .iter()
            .filter(|e| e.scope == Scope::Collection)
            .map(|e| e.artifact.clone())
            .collect();
        // oldest first
        listed.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(listed)
    }
}

/// Draw the base at the origin and each overlay into its tile
///
/// The canvas grows to cover every tile.
fn render(
    base: &[u8],
    layers: &[(Bytes, OverlayDirective)],
) -> Result<(Vec<u8>, u32, u32), StoreError> {
    let base = image::load_from_memory(base)
        .map_err(|e| StoreError::Image(format!("base: {e}")))?
        .to_rgba8();

    let width = layers.iter().map(|(_, d)| d.right()).fold(base.width(), u32::max);
    let height = layers.iter().map(|(_, d)| d.bottom()).fold(base.height(), u32::max);

    let mut canvas = RgbaImage::new(width, height);
    imageops::overlay(&mut canvas, &base, 0, 0);

    for (bytes, directive) in layers {
        let source = image::load_from_memory(bytes)
            .map_err(|e| StoreError::Image(format!("{}: {e}", directive.reference_id)))?;
        let tile = match directive.scale_mode {
            ScaleMode::Scale => source
                .resize_exact(directive.tile_width, directive.tile_height, FilterType::Triangle)
                .to_rgba8(),
        };
        imageops::overlay(&mut canvas, &tile, i64::from(directive.x), i64::from(directive.y));
    }

    let mut out = Cursor::new(Vec::new());
    canvas
        .write_to(&mut out, ImageFormat::Png)
        .map_err(|e| StoreError::Image(e.to_string()))?;
    Ok((out.into_inner(), width, height))
}
