use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use crate::constants::{
    DEFAULT_MAX_DECODE_ALLOC_MB, DEFAULT_MAX_DECODE_DIMENSION, DEFAULT_MAX_DIMENSION,
    DEFAULT_QUALITY,
};

/// Encoding of derivative files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputEncoding {
    Jpeg,
    Png,
    WebP,
}

impl OutputEncoding {
    /// Extension used for derivative names.
    pub fn extension(self) -> &'static str {
        match self {
            OutputEncoding::Jpeg => "jpg",
            OutputEncoding::Png => "png",
            OutputEncoding::WebP => "webp",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            OutputEncoding::Jpeg => "image/jpeg",
            OutputEncoding::Png => "image/png",
            OutputEncoding::WebP => "image/webp",
        }
    }
}

impl FromStr for OutputEncoding {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(OutputEncoding::Jpeg),
            "png" => Ok(OutputEncoding::Png),
            "webp" => Ok(OutputEncoding::WebP),
            _ => Err(anyhow::anyhow!("Invalid output encoding: {}", s)),
        }
    }
}

impl Display for OutputEncoding {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            OutputEncoding::Jpeg => write!(f, "jpeg"),
            OutputEncoding::Png => write!(f, "png"),
            OutputEncoding::WebP => write!(f, "webp"),
        }
    }
}

/// Parameters of the derivative: fit within `max_width` x `max_height` (aspect ratio
/// preserved, never enlarged), re-encoded as `encoding` at `quality` (0-100).
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TransformSpec {
    pub max_width: u32,
    pub max_height: u32,
    pub encoding: OutputEncoding,
    pub quality: u8,
}

impl TransformSpec {
    pub fn new(max_width: u32, max_height: u32, encoding: OutputEncoding, quality: u8) -> Self {
        Self {
            max_width,
            max_height,
            encoding,
            quality,
        }
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.max_width == 0 || self.max_height == 0 {
            return Err(anyhow::anyhow!(
                "Transform bounds must be positive (got {}x{})",
                self.max_width,
                self.max_height
            ));
        }
        if self.quality > 100 {
            return Err(anyhow::anyhow!(
                "Quality must be between 0 and 100 (got {})",
                self.quality
            ));
        }
        Ok(())
    }
}

impl Default for TransformSpec {
    fn default() -> Self {
        Self::new(
            DEFAULT_MAX_DIMENSION,
            DEFAULT_MAX_DIMENSION,
            OutputEncoding::Jpeg,
            DEFAULT_QUALITY,
        )
    }
}

/// Resource ceilings applied while decoding untrusted input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeLimits {
    pub max_dimension: u32,
    pub max_alloc_bytes: u64,
}

impl Default for DecodeLimits {
    fn default() -> Self {
        Self {
            max_dimension: DEFAULT_MAX_DECODE_DIMENSION,
            max_alloc_bytes: DEFAULT_MAX_DECODE_ALLOC_MB * 1024 * 1024,
        }
    }
}
