//! Collage Orchestrator
//!
//! Drives one batch end to end:
//! 1. Upload every raw image, in batch order
//! 2. Take the last upload as the base, plan the rest as overlays
//! 3. Request one composition
//! 4. Delete the overlay sources, now baked into the composite
//!
//! Upload and compose failures abort the batch. Cleanup failures are reported
//! next to the composite, never instead of it.

use crate::error::CollageError;
use crate::layout::plan_overlays;
use crate::phase::{validate_transition, BatchPhase, IllegalTransition};
use crate::types::{BatchId, CleanupFailure, CleanupPartialFailure, CollageConfig, CollageOutcome};
use collage_store::{Artifact, ArtifactId, ArtifactStore, RawImage, StoreError, StoreOperation};
use futures::stream::{FuturesUnordered, StreamExt};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;

/// Phase tracker for a single batch
#[derive(Debug)]
struct BatchRun {
    id: BatchId,
    phase: BatchPhase,
    history: Vec<BatchPhase>,
}

impl BatchRun {
    fn new() -> Self {
        Self {
            id: BatchId::new(),
            phase: BatchPhase::Receiving,
            history: vec![BatchPhase::Receiving],
        }
    }

    fn advance(&mut self, to: BatchPhase) -> Result<(), IllegalTransition> {
        validate_transition(self.phase, to)?;
        tracing::debug!(from = %self.phase, to = %to, "phase transition");
        self.phase = to;
        self.history.push(to);
        Ok(())
    }
}

/// Uploads that completed before one failed
struct UploadFailure {
    index: usize,
    stored: Vec<Artifact>,
    source: StoreError,
}

async fn with_timeout<T>(
    operation: StoreOperation,
    after: Duration,
    call: impl Future<Output = Result<T, StoreError>>,
) -> Result<T, StoreError> {
    match tokio::time::timeout(after, call).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::Timeout { operation, after }),
    }
}

fn ids(artifacts: &[Artifact]) -> Vec<ArtifactId> {
    artifacts.iter().map(|a| a.id.clone()).collect()
}

/// Turns ordered image batches into single collage artifacts
#[derive(Clone)]
pub struct CollageOrchestrator {
    store: Arc<dyn ArtifactStore>,
    config: CollageConfig,
}

impl std::fmt::Debug for CollageOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollageOrchestrator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl CollageOrchestrator {
    /// Create orchestrator over a store
    #[inline]
    #[must_use]
    pub fn new(store: Arc<dyn ArtifactStore>, config: CollageConfig) -> Self {
        Self { store, config }
    }

    /// Get configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &CollageConfig {
        &self.config
    }

    /// Get the underlying store
    #[inline]
    #[must_use]
    pub fn store(&self) -> &Arc<dyn ArtifactStore> {
        &self.store
    }

    /// Compose one ordered batch into a collage
    ///
    /// # Arguments
    /// * `batch` - Raw images; order decides grid placement, the last is the base
    ///
    /// # Returns
    /// The composite plus cleanup details
    ///
    /// # Errors
    /// - `CollageError::EmptyBatch` before any store call
    /// - `CollageError::Store` if an upload (or the compose transport) fails
    /// - `CollageError::Compose` if the store rejects the directive set
    pub async fn compose_batch(&self, batch: &[RawImage]) -> Result<CollageOutcome, CollageError> {
        let mut run = BatchRun::new();
        let span = tracing::info_span!("collage_batch", batch_id = %run.id, images = batch.len());

        let result = self
            .run_batch(&mut run, batch)
            .instrument(span.clone())
            .await;

        let _entered = span.enter();
        match result {
            Ok(outcome) => {
                tracing::info!(
                    artifact = %outcome.artifact.id,
                    deleted = outcome.deleted.len(),
                    clean = outcome.is_clean(),
                    "batch composed"
                );
                Ok(outcome)
            }
            Err(err) => {
                if !run.phase.is_terminal() {
                    run.advance(BatchPhase::Failed)?;
                }
                tracing::error!(
                    kind = err.kind(),
                    orphaned = err.orphaned().len(),
                    "batch failed: {}",
                    err
                );
                Err(err)
            }
        }
    }

    /// List stored collages
    ///
    /// # Errors
    /// Store failure or timeout.
    pub async fn list(&self) -> Result<Vec<Artifact>, StoreError> {
        let artifacts =
            with_timeout(StoreOperation::List, self.config.list_timeout(), self.store.list()).await?;
        tracing::debug!(count = artifacts.len(), "listed collages");
        Ok(artifacts)
    }

    async fn run_batch(
        &self,
        run: &mut BatchRun,
        batch: &[RawImage],
    ) -> Result<CollageOutcome, CollageError> {
        if batch.is_empty() {
            return Err(CollageError::EmptyBatch);
        }
        if batch.len() > self.config.max_images {
            return Err(CollageError::BatchTooLarge {
                size: batch.len(),
                max: self.config.max_images,
            });
        }

        run.advance(BatchPhase::Uploading)?;
        let mut uploaded = match self.upload_all(batch).await {
            Ok(uploaded) => uploaded,
            Err(failure) => {
                let orphaned = self.compensate(ids(&failure.stored)).await;
                return Err(CollageError::Store {
                    phase: BatchPhase::Uploading,
                    index: Some(failure.index),
                    orphaned,
                    source: failure.source,
                });
            }
        };
        tracing::info!(uploaded = uploaded.len(), "uploads complete");

        run.advance(BatchPhase::Composing)?;
        let Some(base) = uploaded.pop() else {
            return Err(CollageError::EmptyBatch);
        };
        let sources = uploaded;
        let overlays = plan_overlays(&ids(&sources));

        let composite = match with_timeout(
            StoreOperation::Compose,
            self.config.compose_timeout(),
            self.store.compose(&base.id, &overlays),
        )
        .await
        {
            Ok(composite) => composite,
            Err(source) => {
                let mut left = ids(&sources);
                left.push(base.id.clone());
                let orphaned = self.compensate(left).await;
                return Err(if source.is_rejection() {
                    CollageError::Compose {
                        base: base.id,
                        orphaned,
                        source,
                    }
                } else {
                    CollageError::Store {
                        phase: BatchPhase::Composing,
                        index: None,
                        orphaned,
                        source,
                    }
                });
            }
        };
        tracing::info!(
            artifact = %composite.id,
            base = %base.id,
            overlays = overlays.len(),
            width = composite.width,
            height = composite.height,
            "composite created"
        );

        run.advance(BatchPhase::CleaningUp)?;
        let mut redundant = ids(&sources);
        if self.config.discard_base && composite.id != base.id {
            redundant.push(base.id.clone());
        }
        let (deleted, failures) = self.delete_all(&redundant).await;

        run.advance(BatchPhase::Done)?;
        Ok(CollageOutcome {
            batch_id: run.id,
            artifact: composite,
            base: base.id,
            overlays,
            deleted,
            cleanup: (!failures.is_empty()).then_some(CleanupPartialFailure { failures }),
            phases: run.history.clone(),
        })
    }

    /// Upload the batch, at most `upload_concurrency` at a time
    ///
    /// Results keep batch order whatever order they complete in. After the
    /// first failure no further upload starts, but those already in flight
    /// are awaited so every artifact that reached the store is accounted for.
    async fn upload_all(&self, batch: &[RawImage]) -> Result<Vec<Artifact>, UploadFailure> {
        let timeout = self.config.upload_timeout();
        let upload = move |index: usize| {
            let image = &batch[index];
            async move {
                let result =
                    with_timeout(StoreOperation::Store, timeout, self.store.store(image)).await;
                (index, result)
            }
        };

        let mut pending = 0..batch.len();
        let mut in_flight = FuturesUnordered::new();
        in_flight.extend(pending.by_ref().take(self.config.upload_concurrency.max(1)).map(upload));

        let mut slots: Vec<Option<Artifact>> = vec![None; batch.len()];
        let mut failure: Option<(usize, StoreError)> = None;
        while let Some((index, result)) = in_flight.next().await {
            match result {
                Ok(artifact) => {
                    tracing::debug!(index, id = %artifact.id, "uploaded");
                    slots[index] = Some(artifact);
                }
                Err(source) => {
                    tracing::warn!(index, "upload failed: {}", source);
                    // report the earliest failing position
                    if failure.as_ref().map_or(true, |(first, _)| index < *first) {
                        failure = Some((index, source));
                    }
                }
            }
            if failure.is_none() {
                in_flight.extend(pending.next().map(upload));
            }
        }

        let stored: Vec<Artifact> = slots.into_iter().flatten().collect();
        match failure {
            Some((index, source)) => Err(UploadFailure {
                index,
                stored,
                source,
            }),
            None => Ok(stored),
        }
    }

    /// Delete each id, continuing past failures
    async fn delete_all(&self, targets: &[ArtifactId]) -> (Vec<ArtifactId>, Vec<CleanupFailure>) {
        let mut deleted = Vec::with_capacity(targets.len());
        let mut failures = Vec::new();

        for id in targets {
            match with_timeout(
                StoreOperation::Delete,
                self.config.delete_timeout(),
                self.store.delete(id),
            )
            .await
            {
                Ok(()) => deleted.push(id.clone()),
                Err(err) => {
                    tracing::warn!(id = %id, "cleanup delete failed: {}", err);
                    failures.push(CleanupFailure {
                        id: id.clone(),
                        reason: err.to_string(),
                    });
                }
            }
        }
        (deleted, failures)
    }

    /// Roll back uploads of an aborted batch when configured to
    ///
    /// Returns what is still in the store afterwards.
    async fn compensate(&self, uploaded: Vec<ArtifactId>) -> Vec<ArtifactId> {
        if !self.config.rollback_on_failure || uploaded.is_empty() {
            return uploaded;
        }
        let (deleted, failures) = self.delete_all(&uploaded).await;
        tracing::info!(
            deleted = deleted.len(),
            remaining = failures.len(),
            "rolled back aborted batch"
        );
        failures.into_iter().map(|f| f.id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use collage_store::MemoryArtifactStore;

    fn orchestrator() -> CollageOrchestrator {
        CollageOrchestrator::new(Arc::new(MemoryArtifactStore::new()), CollageConfig::new())
    }

    #[test]
    fn batch_run_records_history() {
        let mut run = BatchRun::new();
        run.advance(BatchPhase::Uploading).unwrap();
        run.advance(BatchPhase::Failed).unwrap();

        assert_eq!(
            run.history,
            vec![BatchPhase::Receiving, BatchPhase::Uploading, BatchPhase::Failed]
        );
        assert!(run.advance(BatchPhase::Composing).is_err());
    }

    #[tokio::test]
    async fn empty_batch_fails_fast() {
        let err = orchestrator().compose_batch(&[]).await.unwrap_err();
        assert!(matches!(err, CollageError::EmptyBatch));
    }

    #[tokio::test]
    async fn oversized_batch_is_rejected() {
        let orchestrator = CollageOrchestrator::new(
            Arc::new(MemoryArtifactStore::new()),
            CollageConfig::new().with_max_images(2),
        );
        let batch = vec![RawImage::new(vec![1], 1, 1); 3];

        let err = orchestrator.compose_batch(&batch).await.unwrap_err();
        assert!(matches!(err, CollageError::BatchTooLarge { size: 3, max: 2 }));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_calls_time_out() {
        let err = with_timeout(StoreOperation::Compose, Duration::from_secs(5), async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok::<_, StoreError>(())
        })
        .await
        .unwrap_err();

        assert!(matches!(
            err,
            StoreError::Timeout {
                operation: StoreOperation::Compose,
                ..
            }
        ));
    }
}
