//! Image transformer - turns a staged original into its derivative
//!
//! Decode, resize and encode are CPU-bound and run on the blocking pool. Any failure in
//! that stage, a panic included, becomes a `TransformOutcome::Fallback` so the caller can
//! keep serving the untouched staged original.

use std::io::Cursor;
use std::sync::Arc;

use bytes::Bytes;
use image::{GenericImageView, ImageReader, Limits};
use pixdrop_core::models::{
    AppliedTransform, DecodeLimits, DerivedFile, StagedFile, TransformSpec,
};
use pixdrop_storage::{derived_name, StagingStore, StorageError};

use crate::compression::ImageCompressor;
use crate::error::{panic_message, TransformError};
use crate::image::resize::ImageResize;

/// Result of transforming one staged file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransformOutcome {
    Derived(DerivedFile),
    /// No derivative was produced; the staged original is the deliverable.
    Fallback { reason: TransformError },
}

impl TransformOutcome {
    pub fn is_fallback(&self) -> bool {
        matches!(self, TransformOutcome::Fallback { .. })
    }
}

/// An encoded derivative that has not been written yet.
#[derive(Debug, Clone)]
pub struct RenderedImage {
    pub data: Bytes,
    pub source_width: u32,
    pub source_height: u32,
    pub width: u32,
    pub height: u32,
}

/// Produces derivatives for staged files.
pub struct ImageTransformer {
    store: Arc<dyn StagingStore>,
    limits: DecodeLimits,
}

impl ImageTransformer {
    pub fn new(store: Arc<dyn StagingStore>) -> Self {
        Self {
            store,
            limits: DecodeLimits::default(),
        }
    }

    pub fn with_limits(mut self, limits: DecodeLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Decode `data`, fit it within `spec.max_width` x `spec.max_height` and re-encode it.
    pub fn render(
        data: &[u8],
        spec: &TransformSpec,
        limits: DecodeLimits,
    ) -> Result<RenderedImage, TransformError> {
        let mut reader = ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .map_err(|e| TransformError::Decode(e.to_string()))?;

        let mut decode_limits = Limits::default();
        decode_limits.max_image_width = Some(limits.max_dimension);
        decode_limits.max_image_height = Some(limits.max_dimension);
        decode_limits.max_alloc = Some(limits.max_alloc_bytes);
        reader.limits(decode_limits);

        let img = reader
            .decode()
            .map_err(|e| TransformError::Decode(e.to_string()))?;
        let (source_width, source_height) = img.dimensions();

        let resized = ImageResize::fit_image(&img, spec.max_width, spec.max_height);
        let output = resized.as_ref().unwrap_or(&img);
        let (width, height) = output.dimensions();

        let data = ImageCompressor::compress(output, spec.encoding, spec.quality)?;

        Ok(RenderedImage {
            data,
            source_width,
            source_height,
            width,
            height,
        })
    }

    /// Transform a staged file according to `spec`.
    ///
    /// Failing to read the staged file is the only error, always reported as `ReadFailed`;
    /// every decode, encode or derivative write problem is reported as a fallback.
    pub async fn transform(
        &self,
        staged: &StagedFile,
        spec: &TransformSpec,
    ) -> Result<TransformOutcome, StorageError> {
        let data = self.store.read(&staged.name).await.map_err(|e| match e {
            StorageError::NotFound(key) => {
                StorageError::ReadFailed(format!("staged file {} is missing", key))
            }
            other => other,
        })?;
        let start = std::time::Instant::now();

        let limits = self.limits;
        let render_spec = spec.clone();
        let rendered = run_blocking(move || Self::render(&data, &render_spec, limits)).await;

        let rendered = match rendered {
            Ok(rendered) => rendered,
            Err(reason) => {
                tracing::warn!(
                    key = %staged.name,
                    error = %reason,
                    kind = reason.kind(),
                    "Transform failed, falling back to staged original"
                );
                return Ok(TransformOutcome::Fallback { reason });
            }
        };

        let name = derived_name(&staged.id, spec.encoding.extension());
        let stored = match self.store.write_derived(&name, rendered.data.to_vec()).await {
            Ok(stored) => stored,
            Err(e) => {
                let reason = TransformError::Write(e.to_string());
                tracing::warn!(
                    key = %name,
                    error = %e,
                    "Derivative write failed, falling back to staged original"
                );
                return Ok(TransformOutcome::Fallback { reason });
            }
        };

        tracing::info!(
            key = %stored.name,
            source = %staged.name,
            width = rendered.width,
            height = rendered.height,
            size_bytes = stored.size_bytes,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Derived image"
        );

        Ok(TransformOutcome::Derived(DerivedFile {
            id: staged.id.clone(),
            name: stored.name,
            content_type: spec.encoding.mime_type().to_string(),
            size_bytes: stored.size_bytes,
            path: stored.path,
            transform: AppliedTransform {
                max_width: spec.max_width,
                max_height: spec.max_height,
                source_width: rendered.source_width,
                source_height: rendered.source_height,
                width: rendered.width,
                height: rendered.height,
                encoding: spec.encoding,
                quality: spec.quality,
            },
        }))
    }
}

/// Run a CPU-bound image job on the blocking pool; a panic becomes `TransformError::Panicked`.
pub(crate) async fn run_blocking<T, F>(job: F) -> Result<T, TransformError>
where
    F: FnOnce() -> Result<T, TransformError> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(job).await {
        Ok(result) => result,
        Err(e) => Err(TransformError::Panicked(panic_message(e))),
    }
}
