use pixdrop_storage::StorageError;

/// Errors from the decode/resize/encode stage. Never terminal for an item: each one
/// downgrades the outcome to a fallback on the staged original.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransformError {
    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("Failed to encode image: {0}")]
    Encode(String),

    #[error("Failed to write derivative: {0}")]
    Write(String),

    #[error("Image task panicked: {0}")]
    Panicked(String),
}

impl TransformError {
    pub fn kind(&self) -> &'static str {
        match self {
            TransformError::Decode(_) => "decode_failed",
            TransformError::Encode(_) => "encode_failed",
            TransformError::Write(_) => "derivative_write_failed",
            TransformError::Panicked(_) => "transform_panicked",
        }
    }
}

/// Terminal per-item failures.
#[derive(Debug, thiserror::Error)]
pub enum ProcessingError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Item task panicked: {0}")]
    TaskPanicked(String),

    #[error("Item was cancelled")]
    Cancelled,
}

impl ProcessingError {
    pub fn kind(&self) -> &'static str {
        match self {
            ProcessingError::Storage(e) => e.kind(),
            ProcessingError::TaskPanicked(_) => "task_panicked",
            ProcessingError::Cancelled => "cancelled",
        }
    }
}

/// Whole-batch failures. Only cancellation can fail a batch.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BatchError {
    #[error("Batch was cancelled")]
    Cancelled,

    #[error("Batch timed out after {0:?}")]
    TimedOut(std::time::Duration),
}

impl BatchError {
    pub fn kind(&self) -> &'static str {
        match self {
            BatchError::Cancelled => "cancelled",
            BatchError::TimedOut(_) => "timed_out",
        }
    }
}

/// Render a panic payload caught by a `JoinError`.
pub(crate) fn panic_message(err: tokio::task::JoinError) -> String {
    if err.is_cancelled() {
        return "task was cancelled".to_string();
    }
    let payload = err.into_panic();
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(TransformError::Decode("x".into()).kind(), "decode_failed");
        assert_eq!(
            ProcessingError::from(StorageError::WriteFailed("disk full".into())).kind(),
            "write_failed"
        );
        assert_eq!(
            ProcessingError::TaskPanicked("boom".into()).kind(),
            "task_panicked"
        );
    }

    #[tokio::test]
    async fn test_panic_message() {
        let handle = tokio::spawn(async {
            if true {
                panic!("boom");
            }
        });
        let err = handle.await.unwrap_err();
        assert_eq!(panic_message(err), "boom");
    }
}
