//! Collage Server - HTTP surface for chart collages
//!
//! Provides:
//! - warp routes for submitting batches and listing collages
//! - TOML server configuration
//! - A capture batch type and HTTP client for producers
//!
//! # Example
//!
//! ```rust,ignore
//! use collage_server::{serve, ServerConfig};
//!
//! # async fn example() -> Result<(), collage_server::ServeError> {
//! let config = ServerConfig::load("collage.toml")?;
//! serve(config, async { let _ = tokio::signal::ctrl_c().await; }).await
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod api;
pub mod cache;
pub mod capture;
pub mod client;
pub mod config;
pub mod envelope;
pub mod multipart;

pub use api::{build_store, routes, AppState};
pub use cache::ListingCache;
pub use capture::{CaptureBatch, CaptureError};
pub use client::{ClientError, CollageClient, Submission};
pub use config::{ConfigError, ServerConfig, StoreOverrides, StoreSettings};
pub use envelope::{ErrorBody, ErrorEnvelope, SuccessEnvelope};
pub use multipart::{read_batch, IntakeError, IMAGES_FIELD};

use collage_store::StoreError;
use std::future::Future;

/// Server startup failure
#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    /// Configuration failed validation
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Store backend could not be built
    #[error("store setup failed: {0}")]
    Store(#[from] StoreError),

    /// Listen address unavailable
    #[error("cannot bind: {0}")]
    Bind(#[from] warp::Error),
}

/// Run the server until `shutdown` resolves
///
/// # Errors
/// Fails if the store cannot be set up or the address cannot be bound.
pub async fn serve<F>(config: ServerConfig, shutdown: F) -> Result<(), ServeError>
where
    F: Future<Output = ()> + Send + 'static,
{
    config.validate()?;
    let state = AppState::from_config(&config)?;
    let backend = match &config.store {
        StoreSettings::Memory => "memory",
        StoreSettings::Http(_) => "http",
    };

    let (addr, server) =
        warp::serve(routes(state)).try_bind_with_graceful_shutdown(config.bind, shutdown)?;
    tracing::info!(%addr, store = backend, "Collage server listening");

    server.await;
    tracing::info!("Collage server stopped");
    Ok(())
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
