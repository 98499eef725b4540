//! Capture batches
//!
//! An ordered set of already-encoded chart rasters ready for submission.
//! Order is significant: it decides grid placement, and the last entry
//! becomes the base canvas.

use collage_core::layout::{TILE_HEIGHT, TILE_WIDTH};
use collage_store::{ImageError, RawImage};
use std::path::{Path, PathBuf};

/// Unusable capture input
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    /// File could not be read
    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Entry is not a decodable raster
    #[error("capture {index} is not an image: {source}")]
    Image {
        index: usize,
        #[source]
        source: ImageError,
    },

    /// Entry is not tile-sized while strict tiles are required
    #[error("capture {index} is {width}x{height}, expected {}x{}", TILE_WIDTH, TILE_HEIGHT)]
    NotTileSized { index: usize, width: u32, height: u32 },
}

/// Ordered batch of encoded chart rasters
#[derive(Debug, Clone, Default)]
pub struct CaptureBatch {
    images: Vec<RawImage>,
}

impl CaptureBatch {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode in-memory buffers, keeping their order
    ///
    /// # Errors
    /// Fails on the first buffer that is not an image.
    pub fn from_buffers<I, B>(buffers: I) -> Result<Self, CaptureError>
    where
        I: IntoIterator<Item = B>,
        B: Into<bytes::Bytes>,
    {
        let mut batch = Self::new();
        for (index, buffer) in buffers.into_iter().enumerate() {
            let image =
                RawImage::decode(buffer).map_err(|source| CaptureError::Image { index, source })?;
            batch.push(image);
        }
        Ok(batch)
    }

    /// Read and decode files in the given order
    ///
    /// # Errors
    /// Fails on the first unreadable or undecodable file.
    pub async fn from_paths<P: AsRef<Path>>(paths: &[P]) -> Result<Self, CaptureError> {
        let mut batch = Self::new();
        for (index, path) in paths.iter().enumerate() {
            let path = path.as_ref();
            let bytes = tokio::fs::read(path)
                .await
                .map_err(|source| CaptureError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;
            let mut image =
                RawImage::decode(bytes).map_err(|source| CaptureError::Image { index, source })?;
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                image = image.with_file_name(name);
            }
            batch.push(image);
        }
        tracing::debug!(count = batch.len(), "Captured batch from files");
        Ok(batch)
    }

    /// Append one raster
    #[inline]
    pub fn push(&mut self, image: RawImage) {
        self.images.push(image);
    }

    /// Require every entry to be exactly one tile
    ///
    /// # Errors
    /// Names the first entry of another size.
    pub fn strict_tiles(self) -> Result<Self, CaptureError> {
        if let Some((index, image)) = self
            .images
            .iter()
            .enumerate()
            .find(|(_, img)| (img.width, img.height) != (TILE_WIDTH, TILE_HEIGHT))
        {
            return Err(CaptureError::NotTileSized {
                index,
                width: image.width,
                height: image.height,
            });
        }
        Ok(self)
    }

    #[inline]
    #[must_use]
    pub fn images(&self) -> &[RawImage] {
        &self.images
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.images.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use collage_test_utils::png_bytes;

    #[test]
    fn buffers_keep_order() {
        let batch = CaptureBatch::from_buffers(vec![
            png_bytes(400, 400, [1, 0, 0, 255]),
            png_bytes(200, 100, [2, 0, 0, 255]),
        ])
        .unwrap();

        assert_eq!(batch.len(), 2);
        assert_eq!(
            (batch.images()[1].width, batch.images()[1].height),
            (200, 100)
        );
    }

    #[test]
    fn garbage_buffer_is_named() {
        let err = CaptureBatch::from_buffers(vec![
            png_bytes(400, 400, [1, 0, 0, 255]),
            b"not an image".to_vec(),
        ])
        .unwrap_err();
        assert!(matches!(err, CaptureError::Image { index: 1, .. }));
    }

    #[test]
    fn strict_tiles_rejects_off_size() {
        let batch = CaptureBatch::from_buffers(vec![
            png_bytes(400, 400, [1, 0, 0, 255]),
            png_bytes(400, 300, [2, 0, 0, 255]),
        ])
        .unwrap();

        let err = batch.strict_tiles().unwrap_err();
        assert!(matches!(
            err,
            CaptureError::NotTileSized {
                index: 1,
                width: 400,
                height: 300
            }
        ));
    }

    #[tokio::test]
    async fn from_paths_reads_in_argument_order() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("b.png");
        let second = dir.path().join("a.png");
        std::fs::write(&first, png_bytes(400, 400, [9, 9, 9, 255])).unwrap();
        std::fs::write(&second, png_bytes(10, 20, [1, 1, 1, 255])).unwrap();

        let batch = CaptureBatch::from_paths(&[&first, &second]).await.unwrap();

        assert_eq!(batch.images()[0].file_name.as_deref(), Some("b.png"));
        assert_eq!(batch.images()[1].width, 10);
        assert!(batch.strict_tiles().is_err());
    }

    #[tokio::test]
    async fn missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = CaptureBatch::from_paths(&[dir.path().join("nope.png")])
            .await
            .unwrap_err();
        assert!(matches!(err, CaptureError::Read { .. }));
    }
}
