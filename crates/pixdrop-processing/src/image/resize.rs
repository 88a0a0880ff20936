use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};

/// Image resize operations
pub struct ImageResize;

impl ImageResize {
    /// Largest size that fits within `max_width` x `max_height` while keeping the aspect
    /// ratio. Never enlarges: an image that already fits keeps its size.
    pub fn fit_within(width: u32, height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
        if width == 0 || height == 0 {
            return (width, height);
        }
        if width <= max_width && height <= max_height {
            return (width, height);
        }

        let scale_width = max_width as f64 / width as f64;
        let scale_height = max_height as f64 / height as f64;
        let scale = scale_width.min(scale_height).min(1.0);

        let new_width = ((width as f64 * scale).round() as u32).clamp(1, max_width.max(1));
        let new_height = ((height as f64 * scale).round() as u32).clamp(1, max_height.max(1));

        (new_width, new_height)
    }

    /// Select appropriate filter type based on resize ratio
    pub fn select_filter(
        orig_width: u32,
        orig_height: u32,
        new_width: u32,
        new_height: u32,
    ) -> FilterType {
        let width_ratio = orig_width as f32 / new_width.max(1) as f32;
        let height_ratio = orig_height as f32 / new_height.max(1) as f32;
        let max_ratio = width_ratio.max(height_ratio);

        if max_ratio > 2.0 {
            FilterType::Triangle
        } else if max_ratio > 1.5 {
            FilterType::CatmullRom
        } else {
            FilterType::Lanczos3
        }
    }

    /// Resize image to exact dimensions
    pub fn resize_image(img: &DynamicImage, width: u32, height: u32) -> DynamicImage {
        let (orig_width, orig_height) = img.dimensions();
        let filter = Self::select_filter(orig_width, orig_height, width, height);
        img.resize_exact(width, height, filter)
    }

    /// Fit `img` within the bounds. Returns `None` when no resize is needed.
    pub fn fit_image(img: &DynamicImage, max_width: u32, max_height: u32) -> Option<DynamicImage> {
        let (width, height) = img.dimensions();
        let (new_width, new_height) = Self::fit_within(width, height, max_width, max_height);

        if (new_width, new_height) == (width, height) {
            None
        } else {
            Some(Self::resize_image(img, new_width, new_height))
        }
    }
}
