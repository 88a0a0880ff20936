use pixdrop_core::models::{UploadItem, ValidationPolicy};

/// Why an upload's type was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TypeRejection {
    #[error("filename has no extension")]
    MissingExtension,

    #[error("extension {extension} is not allowed (allowed: {allowed:?})")]
    Extension {
        extension: String,
        allowed: Vec<String>,
    },

    #[error("content type {content_type} is not allowed (allowed: {allowed:?})")]
    ContentType {
        content_type: String,
        allowed: Vec<String>,
    },

    #[error("content type {content_type} does not match extension '{extension}' (expected one of: {expected})")]
    Mismatch {
        extension: String,
        content_type: String,
        expected: String,
    },
}

/// Validation errors for uploads
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Unsupported file type: {0}")]
    UnsupportedType(TypeRejection),

    #[error("File too large: {size} bytes (max: {max} bytes)")]
    TooLarge { size: usize, max: usize },

    #[error("Empty file")]
    Empty,

    #[error("Declared size {declared} does not match content length {actual}")]
    SizeMismatch { declared: usize, actual: usize },
}

impl ValidationError {
    pub fn kind(&self) -> &'static str {
        match self {
            ValidationError::UnsupportedType(_) => "unsupported_type",
            ValidationError::TooLarge { .. } => "too_large",
            ValidationError::Empty => "empty",
            ValidationError::SizeMismatch { .. } => "size_mismatch",
        }
    }
}

/// Normalized metadata of an upload that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Accepted {
    pub extension: String,
    pub content_type: String,
}

/// Upload validator
///
/// Pure: inspects metadata and length only, never touches the filesystem.
#[derive(Debug, Clone)]
pub struct MediaValidator {
    policy: ValidationPolicy,
}

impl MediaValidator {
    pub fn new(
        max_file_size: usize,
        allowed_extensions: Vec<String>,
        allowed_content_types: Vec<String>,
    ) -> Self {
        Self::from_policy(ValidationPolicy::new(
            allowed_extensions,
            allowed_content_types,
            max_file_size,
        ))
    }

    pub fn from_policy(policy: ValidationPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &ValidationPolicy {
        &self.policy
    }

    /// Validate an upload item against the policy.
    ///
    /// Checks run in a fixed order (empty, size mismatch, too large, extension, content
    /// type, extension/content type agreement) so the reported error is deterministic.
    pub fn validate(&self, item: &UploadItem) -> Result<Accepted, ValidationError> {
        let content_type = item.normalized_content_type();

        self.validate_declared_size(item.declared_size, item.len())?;
        self.validate_file_size(item.len())?;
        let extension = self.validate_extension(&item.filename)?;
        self.validate_content_type(&content_type)?;
        self.validate_extension_content_type_match(&extension, &content_type)?;

        Ok(Accepted {
            extension,
            content_type,
        })
    }

    pub fn validate_declared_size(
        &self,
        declared: usize,
        actual: usize,
    ) -> Result<(), ValidationError> {
        if actual == 0 {
            return Err(ValidationError::Empty);
        }
        if declared != actual {
            return Err(ValidationError::SizeMismatch { declared, actual });
        }
        Ok(())
    }

    /// Validate file size
    pub fn validate_file_size(&self, size: usize) -> Result<(), ValidationError> {
        if size == 0 {
            return Err(ValidationError::Empty);
        }

        if size > self.policy.max_file_size {
            return Err(ValidationError::TooLarge {
                size,
                max: self.policy.max_file_size,
            });
        }

        Ok(())
    }

    /// Validate file extension, returning it lowercased.
    pub fn validate_extension(&self, filename: &str) -> Result<String, ValidationError> {
        let extension = std::path::Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .filter(|e| !e.is_empty())
            .map(|e| e.to_lowercase())
            .ok_or(ValidationError::UnsupportedType(
                TypeRejection::MissingExtension,
            ))?;

        if !self.policy.allows_extension(&extension) {
            return Err(ValidationError::UnsupportedType(TypeRejection::Extension {
                extension,
                allowed: self.policy.allowed_extensions.clone(),
            }));
        }

        Ok(extension)
    }

    /// Validate content type
    pub fn validate_content_type(&self, content_type: &str) -> Result<(), ValidationError> {
        if !self.policy.allows_content_type(content_type) {
            return Err(ValidationError::UnsupportedType(
                TypeRejection::ContentType {
                    content_type: content_type.to_string(),
                    allowed: self.policy.allowed_content_types.clone(),
                },
            ));
        }

        Ok(())
    }

    /// Reject a content type that contradicts the extension (e.g. `photo.png` sent as
    /// `image/jpeg`). Unknown extensions skip the cross-check.
    pub fn validate_extension_content_type_match(
        &self,
        extension: &str,
        content_type: &str,
    ) -> Result<(), ValidationError> {
        let expected = match expected_content_types(extension) {
            Some(expected) => expected,
            None => {
                tracing::debug!(
                    extension = %extension,
                    content_type = %content_type,
                    "Unknown extension, skipping Content-Type/extension cross-validation"
                );
                return Ok(());
            }
        };

        let normalized = content_type.to_lowercase();
        if !expected.iter().any(|ct| *ct == normalized) {
            return Err(ValidationError::UnsupportedType(TypeRejection::Mismatch {
                extension: extension.to_string(),
                content_type: content_type.to_string(),
                expected: expected.join(", "),
            }));
        }

        Ok(())
    }
}

impl Default for MediaValidator {
    fn default() -> Self {
        Self::from_policy(ValidationPolicy::default())
    }
}

fn expected_content_types(extension: &str) -> Option<&'static [&'static str]> {
    let expected: &'static [&'static str] = match extension {
        "jpg" | "jpeg" => &["image/jpeg"],
        "png" => &["image/png"],
        "gif" => &["image/gif"],
        "webp" => &["image/webp"],
        "avif" => &["image/avif"],
        "bmp" => &["image/bmp"],
        "tif" | "tiff" => &["image/tiff"],
        "ico" => &["image/x-icon", "image/vnd.microsoft.icon"],
        _ => return None,
    };
    Some(expected)
}

/// Canonical content type for a file extension, if it is a known image type.
pub fn content_type_for_extension(extension: &str) -> Option<&'static str> {
    expected_content_types(&extension.to_lowercase()).and_then(|types| types.first().copied())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> MediaValidator {
        MediaValidator::new(
            1024 * 1024, // 1MB
            vec!["jpg".to_string(), "png".to_string()],
            vec!["image/jpeg".to_string(), "image/png".to_string()],
        )
    }

    fn item(filename: &str, content_type: &str, len: usize) -> UploadItem {
        UploadItem::new(filename, content_type, vec![0u8; len])
    }

    #[test]
    fn test_validate_accepts_allowed_upload() {
        let accepted = validator()
            .validate(&item("Photo.JPG", "image/JPEG", 100))
            .unwrap();
        assert_eq!(accepted.extension, "jpg");
        assert_eq!(accepted.content_type, "image/jpeg");
    }

    #[test]
    fn test_validate_strips_content_type_parameters() {
        let accepted = validator()
            .validate(&item("a.png", "image/png; charset=binary", 10))
            .unwrap();
        assert_eq!(accepted.content_type, "image/png");
    }

    #[test]
    fn test_validate_file_size() {
        let validator = validator();

        assert!(validator.validate_file_size(1000).is_ok());
        assert!(validator.validate_file_size(1024 * 1024).is_ok());

        assert!(matches!(
            validator.validate_file_size(0),
            Err(ValidationError::Empty)
        ));

        assert!(matches!(
            validator.validate_file_size(1024 * 1024 + 1),
            Err(ValidationError::TooLarge { .. })
        ));
    }

    #[test]
    fn test_validate_extension() {
        let validator = validator();

        assert_eq!(validator.validate_extension("test.jpg").unwrap(), "jpg");
        assert_eq!(validator.validate_extension("test.PNG").unwrap(), "png");

        assert!(matches!(
            validator.validate_extension("test.gif"),
            Err(ValidationError::UnsupportedType(TypeRejection::Extension { .. }))
        ));

        assert!(matches!(
            validator.validate_extension("noextension"),
            Err(ValidationError::UnsupportedType(
                TypeRejection::MissingExtension
            ))
        ));

        assert!(matches!(
            validator.validate_extension("trailing."),
            Err(ValidationError::UnsupportedType(
                TypeRejection::MissingExtension
            ))
        ));
    }

    #[test]
    fn test_validate_content_type() {
        let validator = validator();

        assert!(validator.validate_content_type("image/jpeg").is_ok());
        assert!(validator.validate_content_type("IMAGE/PNG").is_ok());

        assert!(matches!(
            validator.validate_content_type("image/gif"),
            Err(ValidationError::UnsupportedType(
                TypeRejection::ContentType { .. }
            ))
        ));
    }

    #[test]
    fn test_extension_content_type_mismatch() {
        let err = validator()
            .validate(&item("photo.png", "image/jpeg", 10))
            .unwrap_err();
        assert!(matches!(
            err,
            ValidationError::UnsupportedType(TypeRejection::Mismatch { .. })
        ));
        assert_eq!(err.kind(), "unsupported_type");
    }

    #[test]
    fn test_unknown_extension_skips_cross_check() {
        let validator = MediaValidator::new(
            1024,
            vec!["raw".to_string()],
            vec!["application/octet-stream".to_string()],
        );
        assert!(validator
            .validate(&item("shot.raw", "application/octet-stream", 10))
            .is_ok());
    }

    #[test]
    fn test_declared_size_mismatch() {
        let upload = item("a.jpg", "image/jpeg", 10).with_declared_size(12);
        let err = validator().validate(&upload).unwrap_err();
        assert_eq!(
            err,
            ValidationError::SizeMismatch {
                declared: 12,
                actual: 10
            }
        );
        assert_eq!(err.kind(), "size_mismatch");
    }

    #[test]
    fn test_check_order_is_deterministic() {
        let validator = validator();

        // Empty wins over everything else.
        let err = validator.validate(&item("a.exe", "text/plain", 0)).unwrap_err();
        assert_eq!(err, ValidationError::Empty);

        // Size is checked before type.
        let err = validator
            .validate(&item("a.exe", "text/plain", 2 * 1024 * 1024))
            .unwrap_err();
        assert!(matches!(err, ValidationError::TooLarge { .. }));

        // Extension is checked before content type.
        let err = validator.validate(&item("a.exe", "text/plain", 10)).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::UnsupportedType(TypeRejection::Extension { .. })
        ));
    }

    #[test]
    fn test_default_policy_rejects_ten_megabyte_png() {
        let err = MediaValidator::default()
            .validate(&item("big.png", "image/png", 10 * 1024 * 1024))
            .unwrap_err();
        assert_eq!(err.kind(), "too_large");
    }

    #[test]
    fn test_content_type_for_extension() {
        assert_eq!(content_type_for_extension("JPG"), Some("image/jpeg"));
        assert_eq!(content_type_for_extension("gif"), Some("image/gif"));
        assert_eq!(content_type_for_extension("exe"), None);
    }
}
