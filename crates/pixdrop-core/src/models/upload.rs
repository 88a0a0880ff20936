use std::fmt;
use std::path::Path;

/// A single file submitted for processing.
///
/// The pipeline takes ownership of the content for the duration of processing; it is
/// moved from stage to stage and never shared between items.
#[derive(Clone)]
pub struct UploadItem {
    pub filename: String,
    pub content_type: String,
    /// Byte length announced by the client. Must equal `data.len()`.
    pub declared_size: usize,
    pub data: Vec<u8>,
}

impl UploadItem {
    /// Build an item whose declared size is taken from the content itself.
    pub fn new(
        filename: impl Into<String>,
        content_type: impl Into<String>,
        data: Vec<u8>,
    ) -> Self {
        Self {
            filename: filename.into(),
            content_type: content_type.into(),
            declared_size: data.len(),
            data,
        }
    }

    /// Override the declared size, e.g. with a `Content-Length` reported by the client.
    pub fn with_declared_size(mut self, declared_size: usize) -> Self {
        self.declared_size = declared_size;
        self
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Lowercased extension of the client filename, if any.
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.filename)
            .extension()
            .and_then(|e| e.to_str())
            .filter(|e| !e.is_empty())
            .map(|e| e.to_lowercase())
    }

    /// Content type without parameters, lowercased (`image/JPEG; q=1` -> `image/jpeg`).
    pub fn normalized_content_type(&self) -> String {
        self.content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_lowercase()
    }
}

impl fmt::Debug for UploadItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadItem")
            .field("filename", &self.filename)
            .field("content_type", &self.content_type)
            .field("declared_size", &self.declared_size)
            .field("len", &self.data.len())
            .finish()
    }
}
