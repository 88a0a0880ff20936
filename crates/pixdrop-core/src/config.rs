//! Configuration module
//!
//! The pipeline is configured explicitly: the upload directory, validation policy and
//! transform parameters are handed to the stores and coordinators at construction time.
//! `PipelineConfig::from_env` builds a configuration from `PIXDROP_*` variables (a `.env`
//! file is honoured); unset variables fall back to the values in `constants`.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{
    DEFAULT_ALLOWED_CONTENT_TYPES, DEFAULT_ALLOWED_EXTENSIONS, DEFAULT_MAX_CONCURRENT_ITEMS,
    DEFAULT_MAX_DECODE_ALLOC_MB, DEFAULT_MAX_DECODE_DIMENSION, DEFAULT_MAX_DIMENSION,
    DEFAULT_MAX_FILE_SIZE_MB, DEFAULT_QUALITY, DEFAULT_UPLOAD_DIR,
};
use crate::models::{DecodeLimits, OutputEncoding, TransformSpec, ValidationPolicy};

/// Pipeline configuration
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Root directory for staged files and derivatives.
    pub upload_dir: PathBuf,
    pub policy: ValidationPolicy,
    pub transform: TransformSpec,
    /// Upper bound on items processed at the same time within one batch.
    pub max_concurrent_items: usize,
    /// Cancel a batch that runs longer than this.
    pub batch_timeout: Option<Duration>,
    pub decode_limits: DecodeLimits,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from(DEFAULT_UPLOAD_DIR),
            policy: ValidationPolicy::default(),
            transform: TransformSpec::default(),
            max_concurrent_items: DEFAULT_MAX_CONCURRENT_ITEMS,
            batch_timeout: None,
            decode_limits: DecodeLimits::default(),
        }
    }
}

impl PipelineConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let upload_dir = env::var("PIXDROP_UPLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_UPLOAD_DIR));

        let max_file_size_mb = env::var("PIXDROP_MAX_FILE_SIZE_MB")
            .unwrap_or_else(|_| DEFAULT_MAX_FILE_SIZE_MB.to_string())
            .parse::<usize>()
            .unwrap_or(DEFAULT_MAX_FILE_SIZE_MB);

        let allowed_extensions = env::var("PIXDROP_ALLOWED_EXTENSIONS")
            .map(|s| split_list(&s))
            .unwrap_or_else(|_| to_owned_list(DEFAULT_ALLOWED_EXTENSIONS));

        let allowed_content_types = env::var("PIXDROP_ALLOWED_CONTENT_TYPES")
            .map(|s| split_list(&s))
            .unwrap_or_else(|_| to_owned_list(DEFAULT_ALLOWED_CONTENT_TYPES));

        let encoding = match env::var("PIXDROP_OUTPUT_FORMAT") {
            Ok(value) => value.parse::<OutputEncoding>()?,
            Err(_) => OutputEncoding::Jpeg,
        };

        let transform = TransformSpec {
            max_width: env::var("PIXDROP_MAX_WIDTH")
                .unwrap_or_else(|_| DEFAULT_MAX_DIMENSION.to_string())
                .parse()
                .unwrap_or(DEFAULT_MAX_DIMENSION),
            max_height: env::var("PIXDROP_MAX_HEIGHT")
                .unwrap_or_else(|_| DEFAULT_MAX_DIMENSION.to_string())
                .parse()
                .unwrap_or(DEFAULT_MAX_DIMENSION),
            encoding,
            quality: env::var("PIXDROP_QUALITY")
                .unwrap_or_else(|_| DEFAULT_QUALITY.to_string())
                .parse()
                .map_err(|_| {
                    anyhow::anyhow!("PIXDROP_QUALITY must be a number between 0 and 100")
                })?,
        };

        let max_concurrent_items = env::var("PIXDROP_MAX_CONCURRENT_ITEMS")
            .unwrap_or_else(|_| DEFAULT_MAX_CONCURRENT_ITEMS.to_string())
            .parse()
            .unwrap_or(DEFAULT_MAX_CONCURRENT_ITEMS);

        let batch_timeout = env::var("PIXDROP_BATCH_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);

        let decode_limits = DecodeLimits {
            max_dimension: env::var("PIXDROP_MAX_DECODE_DIMENSION")
                .unwrap_or_else(|_| DEFAULT_MAX_DECODE_DIMENSION.to_string())
                .parse()
                .unwrap_or(DEFAULT_MAX_DECODE_DIMENSION),
            max_alloc_bytes: env::var("PIXDROP_MAX_DECODE_ALLOC_MB")
                .unwrap_or_else(|_| DEFAULT_MAX_DECODE_ALLOC_MB.to_string())
                .parse::<u64>()
                .unwrap_or(DEFAULT_MAX_DECODE_ALLOC_MB)
                * 1024
                * 1024,
        };

        let config = PipelineConfig {
            upload_dir,
            policy: ValidationPolicy::new(
                allowed_extensions,
                allowed_content_types,
                max_file_size_mb * 1024 * 1024,
            ),
            transform,
            max_concurrent_items,
            batch_timeout,
            decode_limits,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.policy.allowed_extensions.is_empty() {
            return Err(anyhow::anyhow!(
                "PIXDROP_ALLOWED_EXTENSIONS must list at least one extension"
            ));
        }

        if self.policy.max_file_size == 0 {
            return Err(anyhow::anyhow!(
                "PIXDROP_MAX_FILE_SIZE_MB must be greater than zero"
            ));
        }

        if self.max_concurrent_items == 0 {
            return Err(anyhow::anyhow!(
                "PIXDROP_MAX_CONCURRENT_ITEMS must be greater than zero"
            ));
        }

        if self.decode_limits.max_dimension == 0 {
            return Err(anyhow::anyhow!(
                "PIXDROP_MAX_DECODE_DIMENSION must be greater than zero"
            ));
        }

        self.transform.validate()?;

        Ok(())
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

fn to_owned_list(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}
