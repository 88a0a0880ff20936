use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pixdrop_cli::{init_tracing, item_from_path, PipelineOverrides};
use pixdrop_core::config::PipelineConfig;
use pixdrop_processing::{publish_report, BatchCoordinator, ItemProgress, PublishOutcome};
use pixdrop_storage::{AssetStore, LocalAssetStore, LocalStagingStore};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

const DEFAULT_PUBLISH_DIR: &str = "public";
const DEFAULT_PUBLISH_URL: &str = "http://localhost:5000/uploads";

#[derive(Parser, Debug)]
#[command(name = "pixdrop")]
#[command(about = "Validate, stage and normalize image uploads")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Process files as one batch and print the JSON report
    Process {
        /// Files to upload
        #[arg(required = true)]
        files: Vec<PathBuf>,

        #[command(flatten)]
        overrides: PipelineOverrides,

        /// Publish deliverables to this asset directory
        #[arg(long, value_name = "DIR")]
        publish_dir: Option<PathBuf>,

        /// Base URL of published assets
        #[arg(long, default_value = DEFAULT_PUBLISH_URL)]
        publish_url: String,
    },

    /// Manage published assets
    Assets {
        /// Asset directory
        #[arg(long, default_value = DEFAULT_PUBLISH_DIR)]
        dir: PathBuf,

        /// Base URL of published assets
        #[arg(long, default_value = DEFAULT_PUBLISH_URL)]
        url: String,

        #[command(subcommand)]
        action: AssetsAction,
    },
}

#[derive(Subcommand, Debug)]
enum AssetsAction {
    /// List assets
    List {
        /// Maximum number of assets to list
        #[arg(long, default_value = "30")]
        max: usize,
    },
    /// Delete an asset by public id
    Delete { public_id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Command::Process {
            files,
            overrides,
            publish_dir,
            publish_url,
        } => process(files, overrides, publish_dir, publish_url).await,
        Command::Assets { dir, url, action } => {
            let assets = LocalAssetStore::new(&dir, url)
                .await
                .context("Failed to open asset directory")?;
            match action {
                AssetsAction::List { max } => {
                    let records = assets.list(max).await?;
                    println!("{}", serde_json::to_string_pretty(&records)?);
                }
                AssetsAction::Delete { public_id } => {
                    let deleted = assets.delete(&public_id).await?;
                    if !deleted {
                        anyhow::bail!("No asset with public id {}", public_id);
                    }
                    println!("Deleted {}", public_id);
                }
            }
            Ok(())
        }
    }
}

async fn process(
    files: Vec<PathBuf>,
    overrides: PipelineOverrides,
    publish_dir: Option<PathBuf>,
    publish_url: String,
) -> Result<()> {
    let config = overrides.apply(PipelineConfig::from_env()?)?;

    let mut items = Vec::with_capacity(files.len());
    for path in &files {
        items.push(item_from_path(path).await?);
    }

    let staging = Arc::new(
        LocalStagingStore::new(&config.upload_dir)
            .await
            .context("Failed to open upload directory")?,
    );

    let (progress_tx, mut progress_rx) = mpsc::channel::<ItemProgress>(64);
    let progress = tokio::spawn(async move {
        while let Some(update) = progress_rx.recv().await {
            tracing::info!(
                index = update.index,
                filename = %update.filename,
                state = ?update.state,
                "Progress"
            );
        }
    });

    let token = CancellationToken::new();
    let ctrl_c = {
        let token = token.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupted, cancelling batch");
                token.cancel();
            }
        })
    };

    let coordinator =
        BatchCoordinator::from_config(staging.clone(), &config).with_progress(progress_tx);
    let result = coordinator.process_batch_with_cancel(items, token).await;
    drop(coordinator);
    ctrl_c.abort();
    progress.await.ok();

    let report = result?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    if let Some(dir) = publish_dir {
        let assets = LocalAssetStore::new(&dir, publish_url)
            .await
            .context("Failed to open publish directory")?;
        for outcome in publish_report(&report, &*staging, &assets).await {
            match outcome {
                PublishOutcome::Published(record) => {
                    tracing::info!(public_id = %record.public_id, url = %record.url, "Published")
                }
                PublishOutcome::Skipped => {}
                PublishOutcome::Failed(e) => tracing::error!(error = %e, "Publish failed"),
            }
        }
    }

    tracing::info!(
        succeeded = report.succeeded(),
        fallbacks = report.fallbacks(),
        rejected = report.rejected(),
        failed = report.failed(),
        "Done"
    );
    Ok(())
}
