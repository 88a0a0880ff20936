//! Pixdrop Storage Library
//!
//! This crate provides the staging store that persists accepted uploads and their
//! derivatives, and the asset store abstraction used to push finalized files elsewhere.
//!
//! # Naming
//!
//! All files live flat under one root directory:
//!
//! - **Staged**: `{id}.{original extension}`
//! - **Derivative**: `{id}-processed.{target extension}`
//!
//! where `{id}` is `{unix millis}-{sequence}-{random}`. In-progress writes use a hidden
//! `.{name}.partial` file that is renamed into place once fully synced. Name generation
//! is centralized in the `keys` module.

pub mod assets;
pub mod keys;
pub mod local;
pub mod traits;

// Re-export commonly used types
pub use assets::LocalAssetStore;
pub use keys::{derived_name, NameAllocator, StagedName};
pub use local::LocalStagingStore;
pub use traits::{AssetRecord, AssetStore, StagingStore, StorageError, StorageResult, StoredObject};
