//! Batch coordinator - runs the per-item pipeline over many uploads
//!
//! Each item runs validate -> stage -> transform -> finalize in its own task. A semaphore
//! bounds how many items are in flight, and results are collected in input order no
//! matter which item finishes first. A failing or panicking item never affects its
//! siblings; only cancellation fails the batch as a whole.

use std::sync::Arc;
use std::time::Duration;

use pixdrop_core::config::PipelineConfig;
use pixdrop_core::constants::DEFAULT_MAX_CONCURRENT_ITEMS;
use pixdrop_core::models::{DecodeLimits, TransformSpec, UploadItem, ValidationPolicy};
use pixdrop_storage::StagingStore;
use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;

use crate::batch::state::{ItemProgress, ItemState};
use crate::batch::types::{BatchReport, ItemReport, ProcessingResult};
use crate::cleanup::CleanupCoordinator;
use crate::error::{panic_message, BatchError, ProcessingError};
use crate::image::{ImageTransformer, TransformOutcome};
use crate::validator::MediaValidator;

/// Everything an item task needs, shared between tasks.
struct ItemPipeline {
    store: Arc<dyn StagingStore>,
    validator: MediaValidator,
    transformer: ImageTransformer,
    cleanup: CleanupCoordinator,
    spec: TransformSpec,
    progress: Option<mpsc::Sender<ItemProgress>>,
}

/// Fans uploads out over the item pipeline and fans results back in.
pub struct BatchCoordinator {
    store: Arc<dyn StagingStore>,
    policy: ValidationPolicy,
    spec: TransformSpec,
    decode_limits: DecodeLimits,
    max_concurrent_items: usize,
    batch_timeout: Option<Duration>,
    progress: Option<mpsc::Sender<ItemProgress>>,
}

impl BatchCoordinator {
    pub fn new(
        store: Arc<dyn StagingStore>,
        policy: ValidationPolicy,
        spec: TransformSpec,
    ) -> Self {
        Self {
            store,
            policy,
            spec,
            decode_limits: DecodeLimits::default(),
            max_concurrent_items: DEFAULT_MAX_CONCURRENT_ITEMS,
            batch_timeout: None,
            progress: None,
        }
    }

    pub fn from_config(store: Arc<dyn StagingStore>, config: &PipelineConfig) -> Self {
        Self::new(store, config.policy.clone(), config.transform.clone())
            .with_max_concurrent_items(config.max_concurrent_items)
            .with_decode_limits(config.decode_limits)
            .with_batch_timeout(config.batch_timeout)
    }

    pub fn with_max_concurrent_items(mut self, max: usize) -> Self {
        self.max_concurrent_items = max.max(1);
        self
    }

    pub fn with_decode_limits(mut self, limits: DecodeLimits) -> Self {
        self.decode_limits = limits;
        self
    }

    /// Cancel batches started with `process_batch_with_cancel` that run longer than `timeout`.
    pub fn with_batch_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.batch_timeout = timeout;
        self
    }

    /// Report every item state transition on `sender`.
    ///
    /// Sends wait for buffer space, so the receiver must be drained while the batch runs.
    /// An undrained receiver stalls every item once the channel is full; dropping the
    /// receiver is fine and turns progress reporting off.
    pub fn with_progress(mut self, sender: mpsc::Sender<ItemProgress>) -> Self {
        self.progress = Some(sender);
        self
    }

    /// Process every item. Never fails: each item's outcome is in the report at its
    /// input position.
    pub async fn process_batch(&self, items: Vec<UploadItem>) -> BatchReport {
        self.execute(items, &CancellationToken::new()).await
    }

    /// Process every item unless `token` is cancelled or the batch timeout elapses.
    ///
    /// Cancelled items stop at their next stage boundary and remove whatever they staged
    /// or derived. A cancelled batch reports no results. Dropping the returned future
    /// cancels the batch the same way.
    pub async fn process_batch_with_cancel(
        &self,
        items: Vec<UploadItem>,
        token: CancellationToken,
    ) -> Result<BatchReport, BatchError> {
        let batch_token = token.child_token();
        let execute = self.execute(items, &batch_token);

        let report = match self.batch_timeout {
            Some(timeout) => {
                tokio::pin!(execute);
                tokio::select! {
                    report = &mut execute => report,
                    _ = tokio::time::sleep(timeout) => {
                        tracing::warn!(timeout_ms = timeout.as_millis() as u64, "Batch timed out");
                        batch_token.cancel();
                        execute.await
                    }
                }
            }
            None => execute.await,
        };

        if token.is_cancelled() {
            return Err(BatchError::Cancelled);
        }
        if batch_token.is_cancelled() {
            return Err(BatchError::TimedOut(self.batch_timeout.unwrap_or_default()));
        }
        Ok(report)
    }

    async fn execute(&self, items: Vec<UploadItem>, token: &CancellationToken) -> BatchReport {
        let total = items.len();
        let start = std::time::Instant::now();
        tracing::info!(
            items = total,
            max_concurrent_items = self.max_concurrent_items,
            "Starting batch"
        );

        let pipeline = Arc::new(ItemPipeline {
            store: Arc::clone(&self.store),
            validator: MediaValidator::from_policy(self.policy.clone()),
            transformer: ImageTransformer::new(Arc::clone(&self.store))
                .with_limits(self.decode_limits),
            cleanup: CleanupCoordinator::new(Arc::clone(&self.store)),
            spec: self.spec.clone(),
            progress: self.progress.clone(),
        });
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent_items));

        // Item tasks outlive this future; if it is dropped they must still be told to stop.
        let guard = token.clone().drop_guard();

        let mut handles = Vec::with_capacity(total);
        for (index, item) in items.into_iter().enumerate() {
            let filename = item.filename.clone();
            let pipeline = Arc::clone(&pipeline);
            let semaphore = Arc::clone(&semaphore);
            let token = token.clone();

            let handle = tokio::spawn(async move {
                run_item(&pipeline, index, item, &semaphore, &token).await
            });
            handles.push((index, filename, handle));
        }

        let mut reports = Vec::with_capacity(total);
        for (index, filename, handle) in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => {
                    let message = panic_message(e);
                    tracing::error!(
                        index = index,
                        filename = %filename,
                        error = %message,
                        "Item task panicked"
                    );
                    ProcessingResult::Failed(ProcessingError::TaskPanicked(message))
                }
            };
            reports.push(ItemReport {
                index,
                filename,
                result,
            });
        }
        guard.disarm();

        let report = BatchReport::new(reports);
        tracing::info!(
            items = report.len(),
            succeeded = report.succeeded(),
            fallbacks = report.fallbacks(),
            rejected = report.rejected(),
            failed = report.failed(),
            cancelled = token.is_cancelled(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Batch finished"
        );
        report
    }
}

/// Current state of one item, mirrored to the progress channel.
struct ItemTracker<'a> {
    index: usize,
    filename: String,
    state: ItemState,
    progress: Option<&'a mpsc::Sender<ItemProgress>>,
}

impl<'a> ItemTracker<'a> {
    async fn new(
        index: usize,
        filename: String,
        progress: Option<&'a mpsc::Sender<ItemProgress>>,
    ) -> ItemTracker<'a> {
        let tracker = ItemTracker {
            index,
            filename,
            state: ItemState::Received,
            progress,
        };
        tracker.emit().await;
        tracker
    }

    async fn advance(&mut self, next: ItemState) {
        if !self.state.can_transition_to(next) {
            tracing::warn!(
                index = self.index,
                from = ?self.state,
                to = ?next,
                "Invalid item state transition"
            );
            return;
        }
        self.state = next;
        self.emit().await;
    }

    async fn emit(&self) {
        tracing::debug!(
            index = self.index,
            filename = %self.filename,
            state = ?self.state,
            "Item state"
        );
        if let Some(progress) = self.progress {
            progress
                .send(ItemProgress {
                    index: self.index,
                    filename: self.filename.clone(),
                    state: self.state,
                })
                .await
                .ok();
        }
    }

    async fn finish(mut self, terminal: ItemState, result: ProcessingResult) -> ProcessingResult {
        self.advance(terminal).await;
        self.advance(ItemState::Finalized).await;
        result
    }

    async fn cancel(self) -> ProcessingResult {
        tracing::debug!(index = self.index, state = ?self.state, "Item cancelled");
        self.finish(
            ItemState::Failed,
            ProcessingResult::Failed(ProcessingError::Cancelled),
        )
        .await
    }
}

async fn run_item(
    pipeline: &ItemPipeline,
    index: usize,
    item: UploadItem,
    semaphore: &Semaphore,
    token: &CancellationToken,
) -> ProcessingResult {
    let mut tracker =
        ItemTracker::new(index, item.filename.clone(), pipeline.progress.as_ref()).await;

    let _permit = tokio::select! {
        biased;
        _ = token.cancelled() => return tracker.cancel().await,
        permit = semaphore.acquire() => match permit {
            Ok(permit) => permit,
            Err(_) => return tracker.cancel().await,
        },
    };

    tracker.advance(ItemState::Validating).await;
    let accepted = match pipeline.validator.validate(&item) {
        Ok(accepted) => accepted,
        Err(e) => {
            tracing::info!(
                index = index,
                filename = %item.filename,
                kind = e.kind(),
                error = %e,
                "Upload rejected"
            );
            return tracker
                .finish(ItemState::Rejected, ProcessingResult::Rejected(e))
                .await;
        }
    };
    tracing::debug!(
        index = index,
        extension = %accepted.extension,
        content_type = %accepted.content_type,
        "Upload accepted"
    );

    if token.is_cancelled() {
        return tracker.cancel().await;
    }

    let staged = match pipeline.store.stage(item).await {
        Ok(staged) => staged,
        Err(e) => {
            tracing::error!(index = index, error = %e, "Failed to stage upload");
            return tracker
                .finish(ItemState::Failed, ProcessingResult::Failed(e.into()))
                .await;
        }
    };
    tracker.advance(ItemState::Staged).await;

    if token.is_cancelled() {
        pipeline.cleanup.discard(&[staged.name]).await.ok();
        return tracker.cancel().await;
    }

    tracker.advance(ItemState::Transforming).await;
    let outcome = match pipeline.transformer.transform(&staged, &pipeline.spec).await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!(
                index = index,
                key = %staged.name,
                error = %e,
                "Failed to read staged upload"
            );
            pipeline.cleanup.discard(&[staged.name]).await.ok();
            return tracker
                .finish(ItemState::Failed, ProcessingResult::Failed(e.into()))
                .await;
        }
    };

    if token.is_cancelled() {
        let mut keys = vec![staged.name];
        if let TransformOutcome::Derived(derived) = outcome {
            keys.push(derived.name);
        }
        pipeline.cleanup.discard(&keys).await.ok();
        return tracker.cancel().await;
    }

    let transformed = if outcome.is_fallback() {
        ItemState::FallenBack
    } else {
        ItemState::Derived
    };
    tracker.advance(transformed).await;

    let finalized = pipeline.cleanup.finalize(staged, outcome).await;
    if let Some(e) = &finalized.cleanup_error {
        tracing::warn!(index = index, error = %e, "Staged original left behind");
    }

    tracker.advance(ItemState::Finalized).await;
    finalized.result
}

#[cfg(test)]
mod tests {
    use super::*;
    use pixdrop_storage::LocalStagingStore;
    use tempfile::tempdir;

    fn gif_bytes() -> Vec<u8> {
        let img = image::DynamicImage::ImageRgba8(image::RgbaImage::from_pixel(
            4,
            4,
            image::Rgba([10, 20, 30, 255]),
        ));
        let mut buffer = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut buffer), image::ImageFormat::Gif)
            .unwrap();
        buffer
    }

    async fn coordinator(dir: &std::path::Path) -> BatchCoordinator {
        let store = LocalStagingStore::new(dir).await.unwrap();
        BatchCoordinator::new(
            Arc::new(store),
            ValidationPolicy::default(),
            TransformSpec::default(),
        )
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let dir = tempdir().unwrap();
        let report = coordinator(dir.path()).await.process_batch(vec![]).await;
        assert!(report.is_empty());
    }

    #[tokio::test]
    async fn test_progress_reports_every_transition() {
        let dir = tempdir().unwrap();
        let (tx, mut rx) = mpsc::channel(64);
        let coordinator = coordinator(dir.path()).await.with_progress(tx);

        let report = coordinator
            .process_batch(vec![UploadItem::new("tiny.gif", "image/gif", gif_bytes())])
            .await;
        assert_eq!(report.succeeded(), 1);
        drop(coordinator);

        let mut states = Vec::new();
        while let Some(progress) = rx.recv().await {
            assert_eq!(progress.index, 0);
            assert_eq!(progress.filename, "tiny.gif");
            states.push(progress.state);
        }
        assert_eq!(
            states,
            vec![
                ItemState::Received,
                ItemState::Validating,
                ItemState::Staged,
                ItemState::Transforming,
                ItemState::Derived,
                ItemState::Finalized,
            ]
        );
    }

    #[tokio::test]
    async fn test_rejected_item_progress() {
        let dir = tempdir().unwrap();
        let (tx, mut rx) = mpsc::channel(64);
        let coordinator = coordinator(dir.path()).await.with_progress(tx);

        coordinator
            .process_batch(vec![UploadItem::new("notes.txt", "text/plain", vec![1])])
            .await;
        drop(coordinator);

        let mut states = Vec::new();
        while let Some(progress) = rx.recv().await {
            states.push(progress.state);
        }
        assert_eq!(
            states,
            vec![
                ItemState::Received,
                ItemState::Validating,
                ItemState::Rejected,
                ItemState::Finalized,
            ]
        );
    }

    #[tokio::test]
    async fn test_cancelled_item_reaches_terminal_state() {
        let dir = tempdir().unwrap();
        let (tx, mut rx) = mpsc::channel(64);
        let coordinator = coordinator(dir.path()).await.with_progress(tx);
        let token = CancellationToken::new();
        token.cancel();

        let result = coordinator
            .process_batch_with_cancel(
                vec![UploadItem::new("tiny.gif", "image/gif", gif_bytes())],
                token,
            )
            .await;
        assert!(matches!(result, Err(BatchError::Cancelled)));
        drop(coordinator);

        let mut states = Vec::new();
        while let Some(progress) = rx.recv().await {
            states.push(progress.state);
        }
        assert_eq!(
            states,
            vec![ItemState::Received, ItemState::Failed, ItemState::Finalized]
        );
    }

    #[tokio::test]
    async fn test_from_config() {
        let dir = tempdir().unwrap();
        let store = LocalStagingStore::new(dir.path()).await.unwrap();
        let config = PipelineConfig {
            max_concurrent_items: 0,
            batch_timeout: Some(Duration::from_secs(5)),
            ..PipelineConfig::default()
        };

        let coordinator = BatchCoordinator::from_config(Arc::new(store), &config);
        assert_eq!(coordinator.max_concurrent_items, 1);
        assert_eq!(coordinator.batch_timeout, Some(Duration::from_secs(5)));
    }
}
