//! Shared name generation and key validation.
//!
//! Id format: `{unix millis}-{sequence}-{8 hex chars of a v4 uuid}`. The sequence number
//! makes ids unique within one allocator even when the clock does not advance; the random
//! suffix keeps separate processes sharing a directory from colliding.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use pixdrop_core::constants::{PARTIAL_SUFFIX, PROCESSED_SUFFIX};
use uuid::Uuid;

use crate::traits::{StorageError, StorageResult};

/// A freshly allocated staged name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedName {
    pub id: String,
    pub name: String,
}

/// Thread-safe allocator for staged names.
#[derive(Debug, Default)]
pub struct NameAllocator {
    sequence: AtomicU64,
}

impl NameAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&self, extension: &str) -> StagedName {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        let random = Uuid::new_v4().simple().to_string();
        let id = format!(
            "{}-{}-{}",
            Utc::now().timestamp_millis(),
            sequence,
            &random[..8]
        );
        let name = format!("{}.{}", id, extension);
        StagedName { id, name }
    }
}

/// Name of the derivative for staged id `id`.
pub fn derived_name(id: &str, extension: &str) -> String {
    format!("{}{}.{}", id, PROCESSED_SUFFIX, extension)
}

/// Hidden in-progress name for `name`.
pub fn partial_name(name: &str) -> String {
    format!(".{}{}", name, PARTIAL_SUFFIX)
}

/// Keys are flat file names: no separators, no traversal, not hidden.
pub fn validate_key(key: &str) -> StorageResult<()> {
    if key.is_empty()
        || key.contains("..")
        || key.contains('/')
        || key.contains('\\')
        || key.starts_with('.')
    {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn test_allocate_format() {
        let allocator = NameAllocator::new();
        let staged = allocator.allocate("png");
        assert!(staged.name.ends_with(".png"));
        assert!(staged.name.starts_with(&staged.id));

        let parts: Vec<&str> = staged.id.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert!(parts[0].parse::<i64>().is_ok());
        assert_eq!(parts[1], "0");
        assert_eq!(parts[2].len(), 8);
    }

    #[test]
    fn test_allocate_unique_across_threads() {
        let allocator = Arc::new(NameAllocator::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let allocator = Arc::clone(&allocator);
                std::thread::spawn(move || {
                    (0..500)
                        .map(|_| allocator.allocate("jpg").name)
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for name in handle.join().unwrap() {
                assert!(seen.insert(name), "duplicate staged name");
            }
        }
        assert_eq!(seen.len(), 4000);
    }

    #[test]
    fn test_derived_and_partial_names() {
        assert_eq!(derived_name("17-0-abcd1234", "jpg"), "17-0-abcd1234-processed.jpg");
        assert_eq!(partial_name("a.png"), ".a.png.partial");
    }

    #[test]
    fn test_validate_key() {
        assert!(validate_key("17-0-abcd1234.png").is_ok());
        assert!(validate_key("").is_err());
        assert!(validate_key("../etc/passwd").is_err());
        assert!(validate_key("nested/file.png").is_err());
        assert!(validate_key("nested\\file.png").is_err());
        assert!(validate_key(".a.png.partial").is_err());
    }
}
