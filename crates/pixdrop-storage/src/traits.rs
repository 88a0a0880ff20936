//! Storage abstraction traits
//!
//! `StagingStore` owns the lifecycle of staged originals and derivatives on the local
//! side; `AssetStore` is the pluggable remote collaborator finalized files can be pushed to.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pixdrop_core::models::{StagedFile, UploadItem};
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Read failed: {0}")]
    ReadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl StorageError {
    /// Machine-readable error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            StorageError::WriteFailed(_) => "write_failed",
            StorageError::ReadFailed(_) => "read_failed",
            StorageError::DeleteFailed(_) => "delete_failed",
            StorageError::NotFound(_) => "not_found",
            StorageError::InvalidKey(_) => "invalid_key",
            StorageError::ConfigError(_) => "config_error",
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// A file written by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub name: String,
    pub path: PathBuf,
    pub size_bytes: u64,
}

/// Persists uploads under unique names and hands out their bytes.
///
/// Implementations must never expose a partially written file under its final name, and
/// name generation must be safe under concurrent `stage` calls.
#[async_trait]
pub trait StagingStore: Send + Sync {
    /// Persist the raw bytes of an accepted upload under a fresh unique name.
    ///
    /// Any failure is reported as `WriteFailed`; nothing is left behind under the final name.
    async fn stage(&self, item: UploadItem) -> StorageResult<StagedFile>;

    /// Write a derivative under `name` with the same atomicity guarantee as `stage`.
    async fn write_derived(&self, name: &str, data: Vec<u8>) -> StorageResult<StoredObject>;

    /// Read a stored file in full.
    async fn read(&self, key: &str) -> StorageResult<Vec<u8>>;

    /// Delete a stored file. Deleting a file that does not exist is not an error.
    async fn delete(&self, key: &str) -> StorageResult<()>;

    async fn exists(&self, key: &str) -> StorageResult<bool>;
}

/// An asset pushed to an `AssetStore`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetRecord {
    pub public_id: String,
    pub name: String,
    pub url: String,
    pub content_type: String,
    pub size_bytes: u64,
    pub created_at: DateTime<Utc>,
}

/// Remote asset store capability (upload, list, delete by identifier).
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Upload `data` under `name`. The public id is the name without its extension.
    async fn upload(&self, name: &str, content_type: &str, data: Vec<u8>)
        -> StorageResult<AssetRecord>;

    /// List at most `max_results` assets, ordered by name.
    async fn list(&self, max_results: usize) -> StorageResult<Vec<AssetRecord>>;

    /// Delete an asset. Returns `false` when nothing matched `public_id`.
    async fn delete(&self, public_id: &str) -> StorageResult<bool>;
}
