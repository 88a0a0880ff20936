//! Pixdrop Processing Library
//!
//! The upload pipeline: validation, image transformation, cleanup of staged originals and
//! the batch coordinator that runs all of it concurrently over many uploads.
//!
//! ```text
//! UploadItem -> MediaValidator -> StagingStore::stage -> ImageTransformer
//!            -> CleanupCoordinator::finalize -> ProcessingResult
//! ```

pub mod batch;
pub mod cleanup;
pub mod compression;
pub mod error;
pub mod image;
pub mod publish;
pub mod validator;

// Re-export commonly used types
pub use batch::{
    BatchCoordinator, BatchReport, ItemProgress, ItemReport, ItemState, ProcessingResult,
    ReportEntry,
};
pub use cleanup::{CleanupCoordinator, Finalized};
pub use compression::ImageCompressor;
pub use crate::image::{ImageResize, ImageTransformer, TransformOutcome};
pub use error::{BatchError, ProcessingError, TransformError};
pub use publish::{publish_report, PublishOutcome};
pub use validator::{
    content_type_for_extension, Accepted, MediaValidator, TypeRejection, ValidationError,
};
