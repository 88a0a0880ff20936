use std::path::PathBuf;

use serde::Serialize;

use super::transform::OutputEncoding;

/// The persisted, unmodified copy of an accepted upload.
///
/// Created by the staging store, read by the transformer and removed once a derivative
/// exists. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StagedFile {
    /// Collision-resistant identifier shared with the derivative name.
    pub id: String,
    /// `{id}.{extension}`; also the storage key.
    pub name: String,
    pub extension: String,
    pub content_type: String,
    pub original_filename: String,
    pub size_bytes: u64,
    pub path: PathBuf,
}

/// Parameters a derivative was produced with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AppliedTransform {
    pub max_width: u32,
    pub max_height: u32,
    pub source_width: u32,
    pub source_height: u32,
    pub width: u32,
    pub height: u32,
    pub encoding: OutputEncoding,
    pub quality: u8,
}

/// Output of a successful transformation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DerivedFile {
    pub id: String,
    /// `{id}-processed.{target extension}`; also the storage key.
    pub name: String,
    pub content_type: String,
    pub size_bytes: u64,
    pub path: PathBuf,
    pub transform: AppliedTransform,
}
