use std::io::Cursor;

use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, GenericImageView, ImageFormat};
use pixdrop_core::models::OutputEncoding;

use crate::error::TransformError;

/// Encodes derivatives in the configured output format.
pub struct ImageCompressor;

impl ImageCompressor {
    /// Encode `img` as `encoding` at `quality` (0-100). PNG ignores quality.
    pub fn compress(
        img: &DynamicImage,
        encoding: OutputEncoding,
        quality: u8,
    ) -> Result<Bytes, TransformError> {
        let data = match encoding {
            OutputEncoding::Jpeg => Self::compress_jpeg(img, quality)?,
            OutputEncoding::Png => Self::compress_png(img)?,
            OutputEncoding::WebP => Self::compress_webp(img, quality),
        };

        tracing::debug!(
            encoding = %encoding,
            quality = quality,
            size_bytes = data.len(),
            "Encoded derivative"
        );

        Ok(data)
    }

    /// Compress to JPEG. Alpha is flattened away.
    fn compress_jpeg(img: &DynamicImage, quality: u8) -> Result<Bytes, TransformError> {
        let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
        let mut buffer = Vec::new();

        let encoder = JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100));
        rgb.write_with_encoder(encoder)
            .map_err(|e| TransformError::Encode(e.to_string()))?;

        Ok(Bytes::from(buffer))
    }

    /// Compress to PNG
    fn compress_png(img: &DynamicImage) -> Result<Bytes, TransformError> {
        let mut buffer = Vec::new();
        let mut cursor = Cursor::new(&mut buffer);

        img.write_to(&mut cursor, ImageFormat::Png)
            .map_err(|e| TransformError::Encode(e.to_string()))?;

        Ok(Bytes::from(buffer))
    }

    /// Compress to lossy WebP
    fn compress_webp(img: &DynamicImage, quality: u8) -> Bytes {
        let (width, height) = img.dimensions();
        let rgba_img = img.to_rgba8();

        let encoder = webp::Encoder::from_rgba(&rgba_img, width, height);
        let webp_data = encoder.encode(quality.min(100) as f32);

        Bytes::copy_from_slice(&webp_data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn test_image() -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_fn(64, 48, |x, y| {
            Rgba([(x * 4) as u8, (y * 5) as u8, 128, if x < 32 { 255 } else { 0 }])
        }))
    }

    fn decode(data: &[u8]) -> DynamicImage {
        image::load_from_memory(data).unwrap()
    }

    #[test]
    fn test_compress_jpeg() {
        let data = ImageCompressor::compress(&test_image(), OutputEncoding::Jpeg, 80).unwrap();
        assert_eq!(image::guess_format(&data).unwrap(), ImageFormat::Jpeg);

        let decoded = decode(&data);
        assert_eq!(decoded.dimensions(), (64, 48));
        assert!(!decoded.color().has_alpha());
    }

    #[test]
    fn test_jpeg_quality_affects_size() {
        let img = test_image();
        let low = ImageCompressor::compress(&img, OutputEncoding::Jpeg, 10).unwrap();
        let high = ImageCompressor::compress(&img, OutputEncoding::Jpeg, 100).unwrap();
        assert!(low.len() < high.len());
    }

    #[test]
    fn test_jpeg_quality_zero_is_clamped() {
        assert!(ImageCompressor::compress(&test_image(), OutputEncoding::Jpeg, 0).is_ok());
    }

    #[test]
    fn test_compress_png_is_lossless() {
        let img = test_image();
        let data = ImageCompressor::compress(&img, OutputEncoding::Png, 10).unwrap();
        assert_eq!(image::guess_format(&data).unwrap(), ImageFormat::Png);
        assert_eq!(decode(&data).to_rgba8(), img.to_rgba8());
    }

    #[test]
    fn test_compress_webp() {
        let data = ImageCompressor::compress(&test_image(), OutputEncoding::WebP, 75).unwrap();
        assert_eq!(image::guess_format(&data).unwrap(), ImageFormat::WebP);
    }
}
