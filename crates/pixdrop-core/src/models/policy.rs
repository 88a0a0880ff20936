use crate::constants::{
    DEFAULT_ALLOWED_CONTENT_TYPES, DEFAULT_ALLOWED_EXTENSIONS, DEFAULT_MAX_FILE_SIZE_MB,
};

/// Which uploads are accepted: extension and content type allow-lists plus a size ceiling.
///
/// Entries are stored lowercased; comparisons against them are case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ValidationPolicy {
    pub allowed_extensions: Vec<String>,
    pub allowed_content_types: Vec<String>,
    pub max_file_size: usize,
}

impl ValidationPolicy {
    pub fn new<E, C>(allowed_extensions: E, allowed_content_types: C, max_file_size: usize) -> Self
    where
        E: IntoIterator,
        E::Item: AsRef<str>,
        C: IntoIterator,
        C::Item: AsRef<str>,
    {
        Self {
            allowed_extensions: normalize(allowed_extensions),
            allowed_content_types: normalize(allowed_content_types),
            max_file_size,
        }
    }

    pub fn allows_extension(&self, extension: &str) -> bool {
        let extension = extension.to_lowercase();
        self.allowed_extensions.iter().any(|e| *e == extension)
    }

    pub fn allows_content_type(&self, content_type: &str) -> bool {
        let content_type = content_type.to_lowercase();
        self.allowed_content_types.iter().any(|c| *c == content_type)
    }
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self::new(
            DEFAULT_ALLOWED_EXTENSIONS.iter(),
            DEFAULT_ALLOWED_CONTENT_TYPES.iter(),
            DEFAULT_MAX_FILE_SIZE_MB * 1024 * 1024,
        )
    }
}

fn normalize<I>(values: I) -> Vec<String>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    values
        .into_iter()
        .map(|v| v.as_ref().trim().trim_start_matches('.').to_lowercase())
        .filter(|v| !v.is_empty())
        .collect()
}
