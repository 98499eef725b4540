//! Short-lived cache of the collection listing using moka
//!
//! The listing is the only read path, so a single entry suffices. Every
//! successful compose invalidates it, keeping a user's own collage
//! visible on the very next listing. A listing fetched across an
//! invalidation is returned to its caller but never cached.

use collage_store::Artifact;
use moka::future::Cache;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Cached collection listing
#[derive(Debug, Clone)]
pub struct ListingCache {
    inner: Option<Cache<(), Arc<Vec<Artifact>>>>,
    generation: Arc<AtomicU64>,
}

impl ListingCache {
    /// Cache entries live for `ttl`; `None` disables caching
    #[must_use]
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            inner: ttl.map(|ttl| Cache::builder().max_capacity(1).time_to_live(ttl).build()),
            generation: Arc::default(),
        }
    }

    /// Caching disabled
    #[inline]
    #[must_use]
    pub fn disabled() -> Self {
        Self::new(None)
    }

    /// Cached listing, or the result of `fetch` (cached on success)
    pub async fn try_get_or_fetch<E, F, Fut>(&self, fetch: F) -> Result<Arc<Vec<Artifact>>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<Artifact>, E>>,
    {
        let Some(cache) = &self.inner else {
            return fetch().await.map(Arc::new);
        };

        if let Some(hit) = cache.get(&()).await {
            return Ok(hit);
        }

        let started = self.generation.load(Ordering::SeqCst);
        let listing = Arc::new(fetch().await?);
        if self.generation.load(Ordering::SeqCst) == started {
            cache.insert((), listing.clone()).await;
            // an invalidation may have slipped in between the check and the insert
            if self.generation.load(Ordering::SeqCst) != started {
                cache.invalidate(&()).await;
            }
        }
        Ok(listing)
    }

    /// Drop the cached listing
    #[inline]
    pub async fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(cache) = &self.inner {
            cache.invalidate(&()).await;
        }
    }
}
