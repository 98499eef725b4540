//! REST media store client
//!
//! Talks to a remote media storage/transformation service:
//! - `POST {endpoint}/artifacts` (multipart `file`) uploads into scratch
//! - `POST {endpoint}/artifacts/{id}/compose` composes into the configured folder
//! - `DELETE {endpoint}/artifacts/{id}` removes, 404 counts as done
//! - `GET {endpoint}/artifacts?folder=...` lists the folder
//!
//! Ids are opaque; each one travels as a single percent-encoded path segment.

use crate::artifact::{Artifact, ArtifactId};
use crate::directive::OverlayDirective;
use crate::raw::RawImage;
use crate::store::{ArtifactStore, StoreError};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Remote store connection settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpStoreConfig {
    /// Base URL of the media service API
    pub endpoint: String,
    /// Folder that receives finished collages and scopes `list`
    pub folder: String,
    /// Bearer token, if the service requires one
    pub api_token: Option<String>,
    /// TCP connect timeout in seconds
    pub connect_timeout_secs: u64,
}

impl Default for HttpStoreConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:9000".to_string(),
            folder: "collages".to_string(),
            api_token: None,
            connect_timeout_secs: 10,
        }
    }
}

impl HttpStoreConfig {
    /// Config pointing at `endpoint` with default folder
    #[inline]
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }

    /// With collection folder
    #[inline]
    #[must_use]
    pub fn with_folder(mut self, folder: impl Into<String>) -> Self {
        self.folder = folder.into();
        self
    }

    /// With bearer token
    #[inline]
    #[must_use]
    pub fn with_api_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }
}

#[derive(Serialize)]
struct ComposeRequest<'a> {
    folder: &'a str,
    overlays: &'a [OverlayDirective],
}

/// Artifact store reached over HTTP
#[derive(Debug, Clone)]
pub struct HttpArtifactStore {
    client: reqwest::Client,
    endpoint: Url,
    folder: String,
    api_token: Option<String>,
}

impl HttpArtifactStore {
    /// Build a client from config
    ///
    /// # Errors
    /// Returns [`StoreError::InvalidConfig`] for an empty or unusable endpoint,
    /// or if the HTTP client cannot be built.
    pub fn new(config: HttpStoreConfig) -> Result<Self, StoreError> {
        let raw = config.endpoint.trim().trim_end_matches('/');
        if raw.is_empty() {
            return Err(StoreError::InvalidConfig("endpoint is empty".to_string()));
        }
        let endpoint = Url::parse(raw)
            .map_err(|e| StoreError::InvalidConfig(format!("endpoint {raw:?}: {e}")))?;
        if endpoint.cannot_be_a_base() {
            return Err(StoreError::InvalidConfig(format!(
                "endpoint {raw:?} cannot carry a path"
            )));
        }

        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|e| StoreError::InvalidConfig(e.to_string()))?;

        Ok(Self {
            client,
            endpoint,
            folder: config.folder,
            api_token: config.api_token,
        })
    }

    /// Collection folder this client composes into
    #[inline]
    #[must_use]
    pub fn folder(&self) -> &str {
        &self.folder
    }

    /// Endpoint extended by `segments`, each encoded as one path segment
    fn url(&self, segments: &[&str]) -> Result<Url, StoreError> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|()| {
                StoreError::InvalidConfig(format!("endpoint {} cannot carry a path", self.endpoint))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, StoreError> {
        self.authorize(request).send().await.map_err(transport)
    }
}

fn transport(err: reqwest::Error) -> StoreError {
    StoreError::Transport(err.to_string())
}

async fn rejected(response: Response) -> StoreError {
    let status = response.status().as_u16();
    let message = response.text().await.unwrap_or_default();
    StoreError::Rejected { status, message }
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, StoreError> {
    if !response.status().is_success() {
        return Err(rejected(response).await);
    }
    response
        .json::<T>()
        .await
        .map_err(|e| StoreError::InvalidResponse(e.to_string()))
}

#[async_trait]
impl ArtifactStore for HttpArtifactStore {
    async fn store(&self, image: &RawImage) -> Result<Artifact, StoreError> {
        let mut part = Part::bytes(image.bytes.to_vec())
            .file_name(image.file_name.clone().unwrap_or_else(|| "upload".to_string()));
        if let Some(content_type) = &image.content_type {
            part = part
                .mime_str(content_type)
                .map_err(|e| StoreError::InvalidConfig(e.to_string()))?;
        }
        let form = Form::new()
            .part("file", part)
            .text("width", image.width.to_string())
            .text("height", image.height.to_string());

        let response = self
            .send(self.client.post(self.url(&["artifacts"])?).multipart(form))
            .await?;
        read_json(response).await
    }

    async fn compose(
        &self,
        base: &ArtifactId,
        overlays: &[OverlayDirective],
    ) -> Result<Artifact, StoreError> {
        let body = ComposeRequest {
            folder: &self.folder,
            overlays,
        };
        let response = self
            .send(
                self.client
                    .post(self.url(&["artifacts", base.as_str(), "compose"])?)
                    .json(&body),
            )
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound(base.clone()));
        }
        read_json(response).await
    }

    async fn delete(&self, id: &ArtifactId) -> Result<(), StoreError> {
        let response = self
            .send(self.client.delete(self.url(&["artifacts", id.as_str()])?))
            .await?;

        let status = response.status();
        if status.is_success() || status == StatusCode::NOT_FOUND {
            Ok(())
        } else {
            Err(rejected(response).await)
        }
    }

    async fn list(&self) -> Result<Vec<Artifact>, StoreError> {
        let response = self
            .send(
                self.client
                    .get(self.url(&["artifacts"])?)
                    .query(&[("folder", self.folder.as_str())]),
            )
            .await?;
        read_json(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_endpoint_is_rejected() {
        let err = HttpArtifactStore::new(HttpStoreConfig::new("  ")).unwrap_err();
        assert!(matches!(err, StoreError::InvalidConfig(_)));
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let store = HttpArtifactStore::new(HttpStoreConfig::new("http://media.local/api/")).unwrap();
        assert_eq!(
            store.url(&["artifacts"]).unwrap().as_str(),
            "http://media.local/api/artifacts"
        );
    }

    #[test]
    fn ids_are_single_encoded_segments() {
        let store = HttpArtifactStore::new(HttpStoreConfig::new("http://media.local")).unwrap();

        let url = store.url(&["artifacts", "charts/abc", "compose"]).unwrap();
        assert_eq!(url.path(), "/artifacts/charts%2Fabc/compose");

        let url = store.url(&["artifacts", "a?folder=other#x"]).unwrap();
        assert_eq!(url.query(), None);
        assert_eq!(url.fragment(), None);
        assert_eq!(url.path(), "/artifacts/a%3Ffolder=other%23x");
    }

    #[test]
    fn unparsable_endpoint_is_rejected() {
        let err = HttpArtifactStore::new(HttpStoreConfig::new("media.local/api")).unwrap_err();
        assert!(matches!(err, StoreError::InvalidConfig(_)));
    }

    #[test]
    fn config_defaults_fill_missing_fields() {
        let config: HttpStoreConfig =
            serde_json::from_str(r#"{"endpoint":"http://m"}"#).unwrap();
        assert_eq!(config.folder, "collages");
        assert_eq!(config.connect_timeout_secs, 10);
    }
}
