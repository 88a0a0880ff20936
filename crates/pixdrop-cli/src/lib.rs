use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use pixdrop_core::config::PipelineConfig;
use pixdrop_core::models::{OutputEncoding, UploadItem};
use pixdrop_processing::content_type_for_extension;

/// Command-line overrides for the environment configuration.
#[derive(clap::Args, Debug, Default, Clone)]
pub struct PipelineOverrides {
    /// Directory for staged files and derivatives
    #[arg(long, value_name = "DIR")]
    pub upload_dir: Option<PathBuf>,

    /// Maximum derivative width
    #[arg(long)]
    pub max_width: Option<u32>,

    /// Maximum derivative height
    #[arg(long)]
    pub max_height: Option<u32>,

    /// Output format: jpeg, png or webp
    #[arg(long)]
    pub format: Option<OutputEncoding>,

    /// Output quality (0-100)
    #[arg(long)]
    pub quality: Option<u8>,

    /// Maximum upload size in megabytes
    #[arg(long)]
    pub max_size_mb: Option<usize>,

    /// Number of files processed at the same time
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Abort the batch after this many seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,
}

impl PipelineOverrides {
    /// Apply the overrides on top of `config` and re-validate it.
    pub fn apply(&self, mut config: PipelineConfig) -> anyhow::Result<PipelineConfig> {
        if let Some(dir) = &self.upload_dir {
            config.upload_dir = dir.clone();
        }
        if let Some(width) = self.max_width {
            config.transform.max_width = width;
        }
        if let Some(height) = self.max_height {
            config.transform.max_height = height;
        }
        if let Some(format) = self.format {
            config.transform.encoding = format;
        }
        if let Some(quality) = self.quality {
            config.transform.quality = quality;
        }
        if let Some(mb) = self.max_size_mb {
            config.policy.max_file_size = mb * 1024 * 1024;
        }
        if let Some(concurrency) = self.concurrency {
            config.max_concurrent_items = concurrency;
        }
        if let Some(secs) = self.timeout_secs {
            config.batch_timeout = Some(Duration::from_secs(secs));
        }

        config.validate()?;
        Ok(config)
    }
}

/// Build an upload item from a file on disk. The content type is derived from the
/// extension.
pub async fn item_from_path(path: &Path) -> anyhow::Result<UploadItem> {
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("Invalid file name: {}", path.display()))?
        .to_string();

    let content_type = path
        .extension()
        .and_then(|e| e.to_str())
        .and_then(content_type_for_extension)
        .unwrap_or("application/octet-stream");

    Ok(UploadItem::new(filename, content_type, data))
}

/// Initialize tracing for CLI binaries.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}
