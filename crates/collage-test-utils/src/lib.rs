//! Testing utilities for the collage workspace
//!
//! Shared test helpers, fixtures, and a call-recording store.

#![allow(missing_docs)]

use async_trait::async_trait;
use collage_store::{Artifact, ArtifactId, ArtifactStore, OverlayDirective, RawImage, StoreError};
use image::{ImageFormat, Rgba, RgbaImage};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// One call made against a [`RecordingStore`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    Store { bytes: usize },
    Compose { base: ArtifactId, overlays: Vec<OverlayDirective> },
    Delete(ArtifactId),
    List,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ComposeFault {
    Reject,
    Transport,
}

#[derive(Debug, Default)]
struct Faults {
    upload_at: Option<usize>,
    compose: Option<ComposeFault>,
    deletes: HashSet<ArtifactId>,
    upload_delay: Option<Duration>,
    slow_uploads: HashMap<usize, Duration>,
    compose_in_place: bool,
}

/// Artifact store that records every call and fails on demand
///
/// Uploads get ids `img-1`, `img-2`, ... in call order; composites get
/// `collage-1`, `collage-2`, ...
#[derive(Debug, Default)]
pub struct RecordingStore {
    calls: Mutex<Vec<StoreCall>>,
    live: Mutex<Vec<Artifact>>,
    collages: Mutex<Vec<Artifact>>,
    faults: Mutex<Faults>,
    uploads: AtomicUsize,
    composites: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl RecordingStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the upload with 0-based call number `n`
    #[must_use]
    pub fn fail_upload(self, n: usize) -> Self {
        self.faults.lock().upload_at = Some(n);
        self
    }

    /// Reject the compose call (bad reference class)
    #[must_use]
    pub fn reject_compose(self) -> Self {
        self.faults.lock().compose = Some(ComposeFault::Reject);
        self
    }

    /// Fail the compose call at transport level
    #[must_use]
    pub fn fail_compose_transport(self) -> Self {
        self.faults.lock().compose = Some(ComposeFault::Transport);
        self
    }

    /// Fail deletes of `id`
    #[must_use]
    pub fn fail_delete_of(self, id: impl Into<ArtifactId>) -> Self {
        self.faults.lock().deletes.insert(id.into());
        self
    }

    /// Sleep inside every upload
    #[must_use]
    pub fn with_upload_delay(self, delay: Duration) -> Self {
        self.faults.lock().upload_delay = Some(delay);
        self
    }

    /// Sleep inside the upload with 0-based call number `n` only
    #[must_use]
    pub fn with_slow_upload(self, n: usize, delay: Duration) -> Self {
        self.faults.lock().slow_uploads.insert(n, delay);
        self
    }

    /// Make compose return the base id, as stores that compose in place do
    #[must_use]
    pub fn compose_in_place(self) -> Self {
        self.faults.lock().compose_in_place = true;
        self
    }

    #[must_use]
    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().clone()
    }

    #[must_use]
    pub fn store_count(&self) -> usize {
        self.count(|c| matches!(c, StoreCall::Store { .. }))
    }

    #[must_use]
    pub fn compose_count(&self) -> usize {
        self.count(|c| matches!(c, StoreCall::Compose { .. }))
    }

    #[must_use]
    pub fn compose_calls(&self) -> Vec<(ArtifactId, Vec<OverlayDirective>)> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                StoreCall::Compose { base, overlays } => Some((base.clone(), overlays.clone())),
                _ => None,
            })
            .collect()
    }

    #[must_use]
    pub fn deletes(&self) -> Vec<ArtifactId> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                StoreCall::Delete(id) => Some(id.clone()),
                _ => None,
            })
            .collect()
    }

    /// Ids still present in the store, uploads and composites alike
    #[must_use]
    pub fn live_ids(&self) -> Vec<ArtifactId> {
        self.live.lock().iter().map(|a| a.id.clone()).collect()
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.live.lock().iter().any(|a| a.id.as_str() == id)
    }

    /// Highest number of uploads observed in flight together
    #[must_use]
    pub fn max_concurrent_uploads(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn count(&self, pred: impl Fn(&StoreCall) -> bool) -> usize {
        self.calls.lock().iter().filter(|c| pred(c)).count()
    }

    fn record(&self, call: StoreCall) {
        self.calls.lock().push(call);
    }
}

#[async_trait]
impl ArtifactStore for RecordingStore {
    async fn store(&self, image: &RawImage) -> Result<Artifact, StoreError> {
        self.record(StoreCall::Store { bytes: image.len() });
        let n = self.uploads.fetch_add(1, Ordering::SeqCst);

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let delay = {
            let faults = self.faults.lock();
            faults.slow_uploads.get(&n).copied().or(faults.upload_delay)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.faults.lock().upload_at == Some(n) {
            return Err(StoreError::Transport("injected upload failure".to_string()));
        }

        let id = format!("img-{}", n + 1);
        let artifact = Artifact::new(
            id.as_str(),
            format!("test://scratch/{id}"),
            image.width,
            image.height,
        );
        self.live.lock().push(artifact.clone());
        Ok(artifact)
    }

    async fn compose(
        &self,
        base: &ArtifactId,
        overlays: &[OverlayDirective],
    ) -> Result<Artifact, StoreError> {
        self.record(StoreCall::Compose {
            base: base.clone(),
            overlays: overlays.to_vec(),
        });

        let (fault, in_place) = {
            let faults = self.faults.lock();
            (faults.compose, faults.compose_in_place)
        };
        match fault {
            Some(ComposeFault::Reject) => {
                return Err(StoreError::Rejected {
                    status: 422,
                    message: "injected overlay rejection".to_string(),
                })
            }
            Some(ComposeFault::Transport) => {
                return Err(StoreError::Transport("injected compose failure".to_string()))
            }
            None => {}
        }
        if !self.contains(base.as_str()) {
            return Err(StoreError::NotFound(base.clone()));
        }

        let width = overlays.iter().map(OverlayDirective::right).fold(400, u32::max);
        let height = overlays.iter().map(OverlayDirective::bottom).fold(400, u32::max);
        let id = if in_place {
            base.to_string()
        } else {
            format!("collage-{}", self.composites.fetch_add(1, Ordering::SeqCst) + 1)
        };
        let artifact = Artifact::new(id.as_str(), format!("test://collection/{id}"), width, height);

        if in_place {
            self.live.lock().retain(|a| &a.id != base);
        }
        self.live.lock().push(artifact.clone());
        self.collages.lock().push(artifact.clone());
        Ok(artifact)
    }

    async fn delete(&self, id: &ArtifactId) -> Result<(), StoreError> {
        self.record(StoreCall::Delete(id.clone()));
        if self.faults.lock().deletes.contains(id) {
            return Err(StoreError::Transport(format!("injected delete failure for {id}")));
        }
        self.live.lock().retain(|a| &a.id != id);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Artifact>, StoreError> {
        self.record(StoreCall::List);
        let live = self.live_ids();
        Ok(self
            .collages
            .lock()
            .iter()
            .filter(|a| live.contains(&a.id))
            .cloned()
            .collect())
    }
}

/// PNG-encoded solid image
#[must_use]
pub fn png_bytes(width: u32, height: u32, color: [u8; 4]) -> Vec<u8> {
    let img = RgbaImage::from_pixel(width, height, Rgba(color));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).expect("encode png fixture");
    out.into_inner()
}

/// Chart-sized raster with a colour derived from `seed`
#[must_use]
pub fn chart_image(seed: u8) -> RawImage {
    let color = [seed.wrapping_mul(40), 255 - seed.wrapping_mul(30), seed.wrapping_mul(70), 255];
    RawImage::new(png_bytes(400, 400, color), 400, 400).with_content_type("image/png")
}

/// `n` distinct chart rasters, in order
#[must_use]
pub fn chart_batch(n: usize) -> Vec<RawImage> {
    (0..n).map(|i| chart_image(u8::try_from(i % 256).unwrap_or(0))).collect()
}

/// Boundary used by [`multipart_body`]
pub const MULTIPART_BOUNDARY: &str = "collage-test-boundary";

/// Content-Type header value matching [`multipart_body`]
#[must_use]
pub fn multipart_content_type() -> String {
    format!("multipart/form-data; boundary={MULTIPART_BOUNDARY}")
}

/// Encode `(field, file_name, bytes)` parts as a multipart/form-data body
#[must_use]
pub fn multipart_body(parts: &[(&str, &str, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (field, file_name, bytes) in parts {
        body.extend_from_slice(format!("--{MULTIPART_BOUNDARY}\r\n").as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{MULTIPART_BOUNDARY}--\r\n").as_bytes());
    body
}
