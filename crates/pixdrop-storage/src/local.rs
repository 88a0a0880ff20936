use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use pixdrop_core::constants::FALLBACK_EXTENSION;
use pixdrop_core::models::{StagedFile, UploadItem};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::keys::{partial_name, validate_key, NameAllocator};
use crate::traits::{StagingStore, StorageError, StorageResult, StoredObject};

/// Local filesystem staging store
///
/// Staged files and derivatives live flat under `base_path`. Clones share the name
/// allocator, so concurrent stagers never collide.
#[derive(Clone)]
pub struct LocalStagingStore {
    base_path: PathBuf,
    names: Arc<NameAllocator>,
}

impl LocalStagingStore {
    /// Create a new LocalStagingStore, creating `base_path` if needed.
    pub async fn new(base_path: impl Into<PathBuf>) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create upload directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalStagingStore {
            base_path,
            names: Arc::new(NameAllocator::new()),
        })
    }

    fn key_to_path(&self, key: &str) -> StorageResult<PathBuf> {
        validate_key(key)?;
        Ok(self.base_path.join(key))
    }

    /// Write `data` to a hidden partial file, sync it, then rename it to `name`.
    ///
    /// Refuses to replace an existing file. On any error the partial file is removed.
    async fn write_atomic(&self, name: &str, data: &[u8]) -> StorageResult<PathBuf> {
        let path = self.key_to_path(name)?;
        let partial = self.base_path.join(partial_name(name));

        if fs::try_exists(&path).await.unwrap_or(false) {
            return Err(StorageError::WriteFailed(format!(
                "{} already exists",
                path.display()
            )));
        }

        let result = async {
            let mut file = fs::File::create(&partial).await?;
            file.write_all(data).await?;
            file.sync_all().await?;
            drop(file);
            fs::rename(&partial, &path).await
        }
        .await;

        if let Err(e) = result {
            if let Err(cleanup) = fs::remove_file(&partial).await {
                if cleanup.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(
                        path = %partial.display(),
                        error = %cleanup,
                        "Failed to remove partial file"
                    );
                }
            }
            return Err(StorageError::WriteFailed(format!(
                "Failed to write {}: {}",
                path.display(),
                e
            )));
        }

        Ok(path)
    }
}

#[async_trait]
impl StagingStore for LocalStagingStore {
    async fn stage(&self, item: UploadItem) -> StorageResult<StagedFile> {
        let extension = item
            .extension()
            .unwrap_or_else(|| FALLBACK_EXTENSION.to_string());
        let content_type = item.normalized_content_type();
        let allocated = self.names.allocate(&extension);
        let size = item.data.len();
        let start = std::time::Instant::now();

        let path = self.write_atomic(&allocated.name, &item.data).await?;

        tracing::info!(
            path = %path.display(),
            key = %allocated.name,
            original_filename = %item.filename,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Staged upload"
        );

        Ok(StagedFile {
            id: allocated.id,
            name: allocated.name,
            extension,
            content_type,
            original_filename: item.filename,
            size_bytes: size as u64,
            path,
        })
    }

    async fn write_derived(&self, name: &str, data: Vec<u8>) -> StorageResult<StoredObject> {
        let size = data.len();
        let start = std::time::Instant::now();

        let path = self.write_atomic(name, &data).await?;

        tracing::info!(
            path = %path.display(),
            key = %name,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Wrote derivative"
        );

        Ok(StoredObject {
            name: name.to_string(),
            path,
            size_bytes: size as u64,
        })
    }

    async fn read(&self, key: &str) -> StorageResult<Vec<u8>> {
        let path = self.key_to_path(key)?;

        match fs::read(&path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(key.to_string()))
            }
            Err(e) => Err(StorageError::ReadFailed(format!(
                "Failed to read file {}: {}",
                path.display(),
                e
            ))),
        }
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        let path = self.key_to_path(key)?;
        let start = std::time::Instant::now();

        match fs::remove_file(&path).await {
            Ok(()) => {
                tracing::info!(
                    path = %path.display(),
                    key = %key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Deleted stored file"
                );
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::DeleteFailed(format!(
                "Failed to delete file {}: {}",
                path.display(),
                e
            ))),
        }
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        let path = self.key_to_path(key)?;
        Ok(fs::try_exists(&path).await.unwrap_or(false))
    }
}
