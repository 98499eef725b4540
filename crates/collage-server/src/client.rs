//! HTTP client for a running collage server

use crate::capture::CaptureBatch;
use crate::envelope::{ErrorBody, ErrorEnvelope, SuccessEnvelope};
use crate::multipart::IMAGES_FIELD;
use collage_core::CleanupPartialFailure;
use collage_store::Artifact;
use reqwest::multipart::{Form, Part};
use reqwest::Response;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Client failure
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Request never got a response
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with a non-2xx status
    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },

    /// 2xx response that is not a success envelope
    #[error("unexpected response body: {0}")]
    Decode(String),

    /// Unusable server address
    #[error("invalid server url: {0:?}")]
    InvalidUrl(String),
}

impl ClientError {
    /// Structured error carried by a server failure, if any
    #[must_use]
    pub fn error_body(&self) -> Option<ErrorBody> {
        match self {
            Self::Server { body, .. } => serde_json::from_str::<ErrorEnvelope>(body)
                .ok()
                .map(|envelope| envelope.error),
            _ => None,
        }
    }
}

/// Result of a successful submission
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    /// The finished collage
    pub artifact: Artifact,
    /// Intermediates the server could not delete
    pub warnings: Option<CleanupPartialFailure>,
}

/// Client for `POST /images` and `GET /images`
#[derive(Debug, Clone)]
pub struct CollageClient {
    http: reqwest::Client,
    base_url: String,
}

impl CollageClient {
    /// Client for the server at `base_url`
    ///
    /// # Errors
    /// Fails on an empty url or if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(ClientError::InvalidUrl(base_url));
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(300))
            .build()?;
        Ok(Self { http, base_url })
    }

    /// Server address
    #[inline]
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Submit `batch` for composition
    ///
    /// # Errors
    /// Transport failure, or the server rejected the batch.
    pub async fn submit(&self, batch: &CaptureBatch) -> Result<Submission, ClientError> {
        let mut form = Form::new();
        for (index, image) in batch.images().iter().enumerate() {
            let name = image
                .file_name
                .clone()
                .unwrap_or_else(|| format!("chart-{index}"));
            let mut part = Part::bytes(image.bytes.to_vec()).file_name(name);
            if let Some(content_type) = &image.content_type {
                part = part.mime_str(content_type)?;
            }
            form = form.part(IMAGES_FIELD, part);
        }

        tracing::debug!(images = batch.len(), server = %self.base_url, "Submitting batch");
        let response = self
            .http
            .post(format!("{}/images", self.base_url))
            .multipart(form)
            .send()
            .await?;

        let envelope: SuccessEnvelope<Artifact> = read_success(response).await?;
        Ok(Submission {
            artifact: envelope.result,
            warnings: envelope.warnings,
        })
    }

    /// Fetch the collection listing
    ///
    /// # Errors
    /// Transport failure, or the server failed to list.
    pub async fn list(&self) -> Result<Vec<Artifact>, ClientError> {
        let response = self
            .http
            .get(format!("{}/images", self.base_url))
            .send()
            .await?;
        let envelope: SuccessEnvelope<Vec<Artifact>> = read_success(response).await?;
        Ok(envelope.result)
    }
}

async fn read_success<T: DeserializeOwned>(
    response: Response,
) -> Result<SuccessEnvelope<T>, ClientError> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(ClientError::Server {
            status: status.as_u16(),
            body,
        });
    }
    serde_json::from_str(&body).map_err(|e| ClientError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_trimmed() {
        let client = CollageClient::new("http://localhost:3000/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:3000");
    }

    #[test]
    fn empty_url_rejected() {
        assert!(matches!(
            CollageClient::new("/"),
            Err(ClientError::InvalidUrl(_))
        ));
    }

    #[test]
    fn server_error_body_is_parsed() {
        let err = ClientError::Server {
            status: 400,
            body: r#"{"message":"Error","error":{"kind":"empty_batch","detail":"batch contains no images"}}"#
                .to_string(),
        };
        assert_eq!(err.error_body().unwrap().kind, "empty_batch");

        let opaque = ClientError::Server {
            status: 502,
            body: "bad gateway".to_string(),
        };
        assert!(opaque.error_body().is_none());
    }
}
