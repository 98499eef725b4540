//! Multipart intake
//!
//! Reads the `images` parts of a form, in submission order, into decoded
//! [`RawImage`]s. Parts under any other field name are skipped.

use bytes::BufMut;
use collage_store::{ImageError, RawImage};
use futures::{StreamExt, TryStreamExt};
use warp::multipart::{FormData, Part};

/// Form field carrying the batch
pub const IMAGES_FIELD: &str = "images";

/// Unusable upload
#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    /// Body is not a readable multipart form
    #[error("malformed multipart body: {0}")]
    Multipart(String),

    /// A part under `images` is not a decodable raster
    #[error("image {index} is invalid: {source}")]
    InvalidImage {
        index: usize,
        #[source]
        source: ImageError,
    },
}

impl IntakeError {
    /// Short machine-readable class
    #[inline]
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Multipart(_) => "invalid_request",
            Self::InvalidImage { .. } => "invalid_image",
        }
    }
}

/// Collect the batch carried by `form`
///
/// # Errors
/// Fails on a broken body or an undecodable image; an empty form is not
/// an error here.
pub async fn read_batch(form: FormData) -> Result<Vec<RawImage>, IntakeError> {
    let mut form = std::pin::pin!(form);
    let mut batch = Vec::new();

    while let Some(part) = form
        .try_next()
        .await
        .map_err(|e| IntakeError::Multipart(e.to_string()))?
    {
        if part.name() != IMAGES_FIELD {
            tracing::debug!(field = part.name(), "Skipping unrelated form part");
            continue;
        }

        let file_name = part.filename().map(str::to_string);
        let bytes = read_part(part).await?;
        let index = batch.len();
        let mut image =
            RawImage::decode(bytes).map_err(|source| IntakeError::InvalidImage { index, source })?;
        if let Some(name) = file_name {
            image = image.with_file_name(name);
        }
        batch.push(image);
    }

    Ok(batch)
}

async fn read_part(part: Part) -> Result<Vec<u8>, IntakeError> {
    let mut stream = std::pin::pin!(part.stream());
    let mut data = Vec::new();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| IntakeError::Multipart(e.to_string()))?;
        data.put(chunk);
    }
    Ok(data)
}
