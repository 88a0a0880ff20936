//! Defaults shared across crates.

/// Directory (relative to the working directory) used when none is configured.
pub const DEFAULT_UPLOAD_DIR: &str = "uploads";

/// Inserted between the staged id and the target extension of a derivative.
pub const PROCESSED_SUFFIX: &str = "-processed";

/// Appended to hidden in-progress files before they are renamed into place.
pub const PARTIAL_SUFFIX: &str = ".partial";

/// Extension used for staged files whose upload carried none.
pub const FALLBACK_EXTENSION: &str = "bin";

pub const DEFAULT_MAX_FILE_SIZE_MB: usize = 5;
pub const DEFAULT_MAX_DIMENSION: u32 = 800;
pub const DEFAULT_QUALITY: u8 = 80;
pub const DEFAULT_MAX_CONCURRENT_ITEMS: usize = 4;

/// Largest width or height the decoder will accept.
pub const DEFAULT_MAX_DECODE_DIMENSION: u32 = 16_384;
pub const DEFAULT_MAX_DECODE_ALLOC_MB: u64 = 512;

pub const DEFAULT_ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif"];
pub const DEFAULT_ALLOWED_CONTENT_TYPES: &[&str] = &["image/jpeg", "image/png", "image/gif"];
