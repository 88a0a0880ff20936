use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::fs;

use crate::keys::validate_key;
use crate::traits::{AssetRecord, AssetStore, StorageError, StorageResult};

/// Asset store backed by a local directory, served under `base_url`.
#[derive(Debug, Clone)]
pub struct LocalAssetStore {
    base_path: PathBuf,
    base_url: String,
}

impl LocalAssetStore {
    pub async fn new(
        base_path: impl Into<PathBuf>,
        base_url: impl Into<String>,
    ) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create asset directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalAssetStore {
            base_path,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url_for(&self, name: &str) -> String {
        format!("{}/{}", self.base_url, urlencoding::encode(name))
    }

    async fn record_for(&self, path: &Path, name: &str) -> StorageResult<AssetRecord> {
        let metadata = fs::metadata(path).await.map_err(|e| {
            StorageError::ReadFailed(format!("Failed to stat {}: {}", path.display(), e))
        })?;
        let created_at = metadata
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());

        Ok(AssetRecord {
            public_id: public_id_of(name).to_string(),
            name: name.to_string(),
            url: self.url_for(name),
            content_type: content_type_of(name).to_string(),
            size_bytes: metadata.len(),
            created_at,
        })
    }

    /// Visible file names in the asset directory, sorted.
    async fn names(&self) -> StorageResult<Vec<String>> {
        let mut entries = fs::read_dir(&self.base_path).await.map_err(|e| {
            StorageError::ReadFailed(format!(
                "Failed to list {}: {}",
                self.base_path.display(),
                e
            ))
        })?;

        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StorageError::ReadFailed(e.to_string()))?
        {
            let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);
            let name = entry.file_name().to_string_lossy().to_string();
            if is_file && !name.starts_with('.') {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }
}

fn public_id_of(name: &str) -> &str {
    match name.rfind('.') {
        Some(idx) if idx > 0 => &name[..idx],
        _ => name,
    }
}

fn content_type_of(name: &str) -> &'static str {
    let ext = name.rsplit('.').next().unwrap_or("").to_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}

#[async_trait]
impl AssetStore for LocalAssetStore {
    async fn upload(
        &self,
        name: &str,
        content_type: &str,
        data: Vec<u8>,
    ) -> StorageResult<AssetRecord> {
        validate_key(name)?;
        let path = self.base_path.join(name);
        let size = data.len();

        fs::write(&path, &data).await.map_err(|e| {
            StorageError::WriteFailed(format!("Failed to write {}: {}", path.display(), e))
        })?;

        tracing::info!(
            path = %path.display(),
            key = %name,
            size_bytes = size,
            "Published asset"
        );

        let mut record = self.record_for(&path, name).await?;
        record.content_type = content_type.to_string();
        Ok(record)
    }

    async fn list(&self, max_results: usize) -> StorageResult<Vec<AssetRecord>> {
        let mut records = Vec::new();
        for name in self.names().await?.into_iter().take(max_results) {
            let path = self.base_path.join(&name);
            records.push(self.record_for(&path, &name).await?);
        }
        Ok(records)
    }

    async fn delete(&self, public_id: &str) -> StorageResult<bool> {
        validate_key(public_id)?;

        let mut deleted = false;
        for name in self.names().await? {
            if public_id_of(&name) != public_id {
                continue;
            }
            let path = self.base_path.join(&name);
            match fs::remove_file(&path).await {
                Ok(()) => deleted = true,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(StorageError::DeleteFailed(format!(
                        "Failed to delete {}: {}",
                        path.display(),
                        e
                    )))
                }
            }
        }

        tracing::info!(public_id = %public_id, deleted, "Asset delete");
        Ok(deleted)
    }
}
