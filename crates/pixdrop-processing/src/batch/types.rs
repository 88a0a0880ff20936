use pixdrop_core::models::{DerivedFile, StagedFile};
use serde::ser::{Serialize, SerializeSeq, Serializer};

use crate::error::{ProcessingError, TransformError};
use crate::validator::ValidationError;

/// Outcome of one item. Exactly one variant per input item.
#[derive(Debug)]
pub enum ProcessingResult {
    Succeeded(DerivedFile),
    /// The transform failed; the staged original is delivered unchanged.
    SucceededWithFallback {
        staged: StagedFile,
        reason: TransformError,
    },
    Rejected(ValidationError),
    Failed(ProcessingError),
}

/// The file a successful item hands back to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deliverable<'a> {
    pub name: &'a str,
    pub content_type: &'a str,
    pub size_bytes: u64,
}

impl ProcessingResult {
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            ProcessingResult::Succeeded(_) | ProcessingResult::SucceededWithFallback { .. }
        )
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, ProcessingResult::SucceededWithFallback { .. })
    }

    pub fn deliverable(&self) -> Option<Deliverable<'_>> {
        match self {
            ProcessingResult::Succeeded(derived) => Some(Deliverable {
                name: &derived.name,
                content_type: &derived.content_type,
                size_bytes: derived.size_bytes,
            }),
            ProcessingResult::SucceededWithFallback { staged, .. } => Some(Deliverable {
                name: &staged.name,
                content_type: &staged.content_type,
                size_bytes: staged.size_bytes,
            }),
            ProcessingResult::Rejected(_) | ProcessingResult::Failed(_) => None,
        }
    }
}

/// Result for the item at `index` in the request.
#[derive(Debug)]
pub struct ItemReport {
    pub index: usize,
    pub filename: String,
    pub result: ProcessingResult,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    Accepted,
    Rejected,
    Failed,
}

/// Serialized form of one item in a batch report.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportEntry {
    pub status: EntryStatus,
    pub filename: String,
    pub fallback: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub derived_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub byte_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
}

impl ReportEntry {
    fn new(status: EntryStatus, filename: &str) -> Self {
        Self {
            status,
            filename: filename.to_string(),
            fallback: false,
            derived_name: None,
            byte_size: None,
            width: None,
            height: None,
            error_kind: None,
            error_detail: None,
        }
    }

    fn with_error(mut self, kind: &str, detail: String) -> Self {
        self.error_kind = Some(kind.to_string());
        self.error_detail = Some(detail);
        self
    }
}

impl From<&ItemReport> for ReportEntry {
    fn from(item: &ItemReport) -> Self {
        match &item.result {
            ProcessingResult::Succeeded(derived) => ReportEntry {
                derived_name: Some(derived.name.clone()),
                byte_size: Some(derived.size_bytes),
                width: Some(derived.transform.width),
                height: Some(derived.transform.height),
                ..ReportEntry::new(EntryStatus::Accepted, &item.filename)
            },
            ProcessingResult::SucceededWithFallback { staged, reason } => ReportEntry {
                fallback: true,
                derived_name: Some(staged.name.clone()),
                byte_size: Some(staged.size_bytes),
                ..ReportEntry::new(EntryStatus::Accepted, &item.filename)
            }
            .with_error(reason.kind(), reason.to_string()),
            ProcessingResult::Rejected(e) => {
                ReportEntry::new(EntryStatus::Rejected, &item.filename)
                    .with_error(e.kind(), e.to_string())
            }
            ProcessingResult::Failed(e) => ReportEntry::new(EntryStatus::Failed, &item.filename)
                .with_error(e.kind(), e.to_string()),
        }
    }
}

/// Per-item results of a batch, index-aligned with the request.
#[derive(Debug, Default)]
pub struct BatchReport {
    items: Vec<ItemReport>,
}

impl BatchReport {
    pub(crate) fn new(items: Vec<ItemReport>) -> Self {
        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[ItemReport] {
        &self.items
    }

    pub fn get(&self, index: usize) -> Option<&ItemReport> {
        self.items.get(index)
    }

    pub fn succeeded(&self) -> usize {
        self.count(|r| matches!(r, ProcessingResult::Succeeded(_)))
    }

    pub fn fallbacks(&self) -> usize {
        self.count(ProcessingResult::is_fallback)
    }

    pub fn rejected(&self) -> usize {
        self.count(|r| matches!(r, ProcessingResult::Rejected(_)))
    }

    pub fn failed(&self) -> usize {
        self.count(|r| matches!(r, ProcessingResult::Failed(_)))
    }

    fn count(&self, predicate: impl Fn(&ProcessingResult) -> bool) -> usize {
        self.items.iter().filter(|item| predicate(&item.result)).count()
    }
}

impl Serialize for BatchReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.items.len()))?;
        for item in &self.items {
            seq.serialize_element(&ReportEntry::from(item))?;
        }
        seq.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pixdrop_core::models::{AppliedTransform, OutputEncoding};
    use pixdrop_storage::StorageError;
    use serde_json::json;
    use std::path::PathBuf;

    fn staged() -> StagedFile {
        StagedFile {
            id: "1-0-abcdef01".to_string(),
            name: "1-0-abcdef01.png".to_string(),
            extension: "png".to_string(),
            content_type: "image/png".to_string(),
            original_filename: "cat.png".to_string(),
            size_bytes: 42,
            path: PathBuf::from("uploads/1-0-abcdef01.png"),
        }
    }

    fn derived() -> DerivedFile {
        DerivedFile {
            id: "1-0-abcdef01".to_string(),
            name: "1-0-abcdef01-processed.jpg".to_string(),
            content_type: "image/jpeg".to_string(),
            size_bytes: 1234,
            path: PathBuf::from("uploads/1-0-abcdef01-processed.jpg"),
            transform: AppliedTransform {
                max_width: 800,
                max_height: 800,
                source_width: 2000,
                source_height: 1000,
                width: 800,
                height: 400,
                encoding: OutputEncoding::Jpeg,
                quality: 80,
            },
        }
    }

    fn report() -> BatchReport {
        let results = vec![
            ProcessingResult::Succeeded(derived()),
            ProcessingResult::SucceededWithFallback {
                staged: staged(),
                reason: TransformError::Decode("bad header".to_string()),
            },
            ProcessingResult::Rejected(ValidationError::TooLarge {
                size: 10,
                max: 5,
            }),
            ProcessingResult::Failed(ProcessingError::Storage(StorageError::WriteFailed(
                "disk full".to_string(),
            ))),
        ];
        BatchReport::new(
            results
                .into_iter()
                .enumerate()
                .map(|(index, result)| ItemReport {
                    index,
                    filename: format!("file{}", index),
                    result,
                })
                .collect(),
        )
    }

    #[test]
    fn test_counters() {
        let report = report();
        assert_eq!(report.len(), 4);
        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.fallbacks(), 1);
        assert_eq!(report.rejected(), 1);
        assert_eq!(report.failed(), 1);
    }

    #[test]
    fn test_deliverable() {
        let report = report();
        assert_eq!(
            report.get(0).unwrap().result.deliverable().unwrap().name,
            "1-0-abcdef01-processed.jpg"
        );
        assert_eq!(
            report.get(1).unwrap().result.deliverable().unwrap().name,
            "1-0-abcdef01.png"
        );
        assert!(report.get(2).unwrap().result.deliverable().is_none());
    }

    #[test]
    fn test_serialize_report() {
        let value = serde_json::to_value(report()).unwrap();
        assert_eq!(
            value,
            json!([
                {
                    "status": "accepted",
                    "filename": "file0",
                    "fallback": false,
                    "derivedName": "1-0-abcdef01-processed.jpg",
                    "byteSize": 1234,
                    "width": 800,
                    "height": 400
                },
                {
                    "status": "accepted",
                    "filename": "file1",
                    "fallback": true,
                    "derivedName": "1-0-abcdef01.png",
                    "byteSize": 42,
                    "errorKind": "decode_failed",
                    "errorDetail": "Failed to decode image: bad header"
                },
                {
                    "status": "rejected",
                    "filename": "file2",
                    "fallback": false,
                    "errorKind": "too_large",
                    "errorDetail": "File too large: 10 bytes (max: 5 bytes)"
                },
                {
                    "status": "failed",
                    "filename": "file3",
                    "fallback": false,
                    "errorKind": "write_failed",
                    "errorDetail": "Write failed: disk full"
                }
            ])
        );
    }
}
