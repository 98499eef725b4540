//! warp routes
//!
//! - `GET /images` lists the collection (through the listing cache)
//! - `POST /images` composes the multipart `images` batch
//! - any other method on `/images` answers 405
//! - `GET /health` for liveness checks

use crate::cache::ListingCache;
use crate::config::{ServerConfig, StoreSettings};
use crate::envelope::{failure, message, success, ErrorBody, SuccessEnvelope};
use crate::multipart::read_batch;
use collage_core::CollageOrchestrator;
use collage_store::{ArtifactStore, HttpArtifactStore, MemoryArtifactStore, StoreError};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use warp::http::{Method, StatusCode};
use warp::multipart::FormData;
use warp::reply::{Json, WithStatus};
use warp::{Filter, Rejection, Reply};

/// Shared request state
#[derive(Debug, Clone)]
pub struct AppState {
    orchestrator: CollageOrchestrator,
    listing: ListingCache,
    max_body_bytes: u64,
}

impl AppState {
    #[must_use]
    pub fn new(orchestrator: CollageOrchestrator, listing: ListingCache, max_body_bytes: u64) -> Self {
        Self {
            orchestrator,
            listing,
            max_body_bytes,
        }
    }

    /// State for `config`, with its store backend built
    ///
    /// # Errors
    /// Fails if the remote store settings are unusable.
    pub fn from_config(config: &ServerConfig) -> Result<Self, StoreError> {
        let store = build_store(&config.store)?;
        Ok(Self::new(
            CollageOrchestrator::new(store, config.collage.clone()),
            ListingCache::new(config.listing_cache_ttl()),
            config.max_body_bytes,
        ))
    }

    #[inline]
    #[must_use]
    pub fn orchestrator(&self) -> &CollageOrchestrator {
        &self.orchestrator
    }
}

/// Instantiate the configured store backend
///
/// # Errors
/// Fails if the remote store settings are unusable.
pub fn build_store(settings: &StoreSettings) -> Result<Arc<dyn ArtifactStore>, StoreError> {
    let store: Arc<dyn ArtifactStore> = match settings {
        StoreSettings::Memory => Arc::new(MemoryArtifactStore::new()),
        StoreSettings::Http(http) => Arc::new(HttpArtifactStore::new(http.clone())?),
    };
    Ok(store)
}

/// `GET /health` body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    pub status: String,
    pub version: String,
}

/// All routes, with rejection recovery and request tracing
pub fn routes(state: AppState) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let images = warp::path("images").and(warp::path::end());

    let list = images
        .and(method_is(Method::GET))
        .and(with_state(state.clone()))
        .and_then(list_images);

    let create = images
        .and(method_is(Method::POST))
        .and(warp::multipart::form().max_length(state.max_body_bytes))
        .and(with_state(state))
        .and_then(create_collage);

    let other = images.and(warp::method()).and_then(method_not_allowed);

    let health = warp::path("health")
        .and(warp::path::end())
        .and(method_is(Method::GET))
        .map(|| {
            warp::reply::json(&Health {
                status: "ok".to_string(),
                version: crate::VERSION.to_string(),
            })
        });

    list.or(create)
        .or(other)
        .or(health)
        .recover(handle_rejection)
        .with(warp::trace::request())
}

/// Method guard that rejects as not-found, leaving 405 to the fallback route
fn method_is(expected: Method) -> impl Filter<Extract = (), Error = Rejection> + Clone {
    warp::method()
        .and_then(move |method: Method| {
            let matched = method == expected;
            async move {
                if matched {
                    Ok(())
                } else {
                    Err(warp::reject::not_found())
                }
            }
        })
        .untuple_one()
}

fn with_state(state: AppState) -> impl Filter<Extract = (AppState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

async fn list_images(state: AppState) -> Result<WithStatus<Json>, Rejection> {
    let orchestrator = &state.orchestrator;
    match state.listing.try_get_or_fetch(|| orchestrator.list()).await {
        Ok(listing) => Ok(success(StatusCode::OK, &SuccessEnvelope::new(listing.as_slice()))),
        Err(err) => {
            tracing::warn!(error = %err, "Listing failed");
            Ok(failure(StatusCode::BAD_REQUEST, ErrorBody::from(&err)))
        }
    }
}

async fn create_collage(form: FormData, state: AppState) -> Result<WithStatus<Json>, Rejection> {
    let batch = match read_batch(form).await {
        Ok(batch) => batch,
        Err(err) => {
            tracing::info!(error = %err, "Unusable upload");
            return Ok(failure(
                StatusCode::BAD_REQUEST,
                ErrorBody::new(err.kind(), err.to_string()),
            ));
        }
    };

    match state.orchestrator.compose_batch(&batch).await {
        Ok(outcome) => {
            state.listing.invalidate().await;
            let envelope = SuccessEnvelope::new(outcome.artifact).with_warnings(outcome.cleanup);
            Ok(success(StatusCode::CREATED, &envelope))
        }
        Err(err) => Ok(failure(StatusCode::BAD_REQUEST, ErrorBody::from(&err))),
    }
}

async fn method_not_allowed(method: Method) -> Result<WithStatus<Json>, Rejection> {
    // GET and POST reach here only when their own route rejected the request
    if method == Method::GET || method == Method::POST {
        return Err(warp::reject::not_found());
    }
    Ok(message(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed"))
}

async fn handle_rejection(err: Rejection) -> Result<WithStatus<Json>, Infallible> {
    if err.is_not_found() {
        return Ok(message(StatusCode::NOT_FOUND, "Not found"));
    }
    if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        return Ok(failure(
            StatusCode::PAYLOAD_TOO_LARGE,
            ErrorBody::new("invalid_request", "request body exceeds the configured limit"),
        ));
    }

    tracing::debug!(rejection = ?err, "Rejected request");
    Ok(failure(
        StatusCode::BAD_REQUEST,
        ErrorBody::new("invalid_request", describe(&err)),
    ))
}

/// Client-facing cause of a rejected request
fn describe(err: &Rejection) -> String {
    if let Some(missing) = err.find::<warp::reject::MissingHeader>() {
        return format!("missing {} header", missing.name());
    }
    if let Some(invalid) = err.find::<warp::reject::InvalidHeader>() {
        return format!("invalid {} header", invalid.name());
    }
    if err.find::<warp::reject::LengthRequired>().is_some() {
        return "content-length header is required".to_string();
    }
    if err.find::<warp::reject::UnsupportedMediaType>().is_some() {
        return "unsupported media type".to_string();
    }
    "malformed request".to_string()
}
