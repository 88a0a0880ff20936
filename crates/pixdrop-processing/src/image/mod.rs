//! Image processing module
//!
//! - Resize geometry and filter selection (resize)
//! - Decode/resize/encode of staged files into derivatives (transformer)

pub mod resize;
pub mod transformer;

pub use resize::ImageResize;
pub use transformer::{ImageTransformer, RenderedImage, TransformOutcome};
