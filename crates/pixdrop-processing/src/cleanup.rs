use std::sync::Arc;

use pixdrop_core::models::StagedFile;
use pixdrop_storage::{StagingStore, StorageError};

use crate::batch::ProcessingResult;
use crate::image::TransformOutcome;

/// Final result of an item plus any non-fatal cleanup problem.
#[derive(Debug)]
pub struct Finalized {
    pub result: ProcessingResult,
    /// Set when the staged original could not be removed after a successful derivation.
    pub cleanup_error: Option<StorageError>,
}

/// Owns removal of staged originals once they are no longer the deliverable.
pub struct CleanupCoordinator {
    store: Arc<dyn StagingStore>,
}

impl CleanupCoordinator {
    pub fn new(store: Arc<dyn StagingStore>) -> Self {
        Self { store }
    }

    /// Turn a transform outcome into the item's result.
    ///
    /// A derivative makes the staged original redundant, so it is deleted; failing to
    /// delete it is logged and reported but does not change the result. On fallback the
    /// staged original is the deliverable and is kept.
    pub async fn finalize(&self, staged: StagedFile, outcome: TransformOutcome) -> Finalized {
        match outcome {
            TransformOutcome::Derived(derived) => {
                let cleanup_error = match self.store.delete(&staged.name).await {
                    Ok(()) => None,
                    Err(e) => {
                        tracing::warn!(
                            key = %staged.name,
                            derived = %derived.name,
                            error = %e,
                            "Failed to remove staged original after derivation"
                        );
                        Some(e)
                    }
                };
                Finalized {
                    result: ProcessingResult::Succeeded(derived),
                    cleanup_error,
                }
            }
            TransformOutcome::Fallback { reason } => Finalized {
                result: ProcessingResult::SucceededWithFallback { staged, reason },
                cleanup_error: None,
            },
        }
    }

    /// Remove every file in `keys`, e.g. the artefacts of a cancelled item.
    ///
    /// All keys are attempted; the last failure, if any, is returned.
    pub async fn discard(&self, keys: &[String]) -> Result<(), StorageError> {
        let mut failure = None;
        for key in keys {
            if let Err(e) = self.store.delete(key).await {
                tracing::warn!(key = %key, error = %e, "Failed to discard file");
                failure = Some(e);
            }
        }
        match failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
