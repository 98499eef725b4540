//! Raw encoded images
//!
//! A [`RawImage`] is one member of a batch: an encoded raster payload plus its
//! declared dimensions. It is consumed once by the orchestrator and never
//! persisted directly.

use bytes::Bytes;
use image::ImageReader;
use std::io::Cursor;

/// Errors probing an encoded image
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    /// Payload was empty
    #[error("image payload is empty")]
    Empty,

    /// Format could not be recognised or the header is corrupt
    #[error("unreadable image: {0}")]
    Unreadable(String),
}

/// Encoded image awaiting upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawImage {
    /// Encoded bytes (PNG, JPEG, ...)
    pub bytes: Bytes,
    /// Declared width in pixels
    pub width: u32,
    /// Declared height in pixels
    pub height: u32,
    /// MIME type, if the producer supplied one
    pub content_type: Option<String>,
    /// Original file name, if any
    pub file_name: Option<String>,
}

impl RawImage {
    /// Create from bytes and known dimensions
    #[inline]
    #[must_use]
    pub fn new(bytes: impl Into<Bytes>, width: u32, height: u32) -> Self {
        Self {
            bytes: bytes.into(),
            width,
            height,
            content_type: None,
            file_name: None,
        }
    }

    /// Create from encoded bytes, reading dimensions from the image header
    ///
    /// Only the header is parsed; pixel data is not decoded.
    ///
    /// # Errors
    /// Returns [`ImageError`] if the payload is empty or not a supported image.
    pub fn decode(bytes: impl Into<Bytes>) -> Result<Self, ImageError> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(ImageError::Empty);
        }

        let reader = ImageReader::new(Cursor::new(bytes.as_ref()))
            .with_guessed_format()
            .map_err(|e| ImageError::Unreadable(e.to_string()))?;
        let content_type = reader.format().map(|f| f.to_mime_type().to_string());
        let (width, height) = reader
            .into_dimensions()
            .map_err(|e| ImageError::Unreadable(e.to_string()))?;

        Ok(Self {
            bytes,
            width,
            height,
            content_type,
            file_name: None,
        })
    }

    /// With MIME type
    #[inline]
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// With original file name
    #[inline]
    #[must_use]
    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    /// Payload size in bytes
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the payload is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([10, 20, 30, 255]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn decode_reads_dimensions() {
        let raw = RawImage::decode(png(40, 30)).unwrap();
        assert_eq!((raw.width, raw.height), (40, 30));
        assert_eq!(raw.content_type.as_deref(), Some("image/png"));
    }

    #[test]
    fn decode_rejects_empty() {
        assert!(matches!(RawImage::decode(Vec::new()), Err(ImageError::Empty)));
    }

    #[test]
    fn decode_rejects_garbage() {
        let result = RawImage::decode(b"definitely not an image".to_vec());
        assert!(matches!(result, Err(ImageError::Unreadable(_))));
    }
}
