//! Image preprocessing - bounded resize and JPEG re-encode
//!
//! The analyzer only ever ships JPEG to the image host and the vision model:
//! the preprocessor decodes whatever was uploaded, downscales anything wider
//! than the configured bound, and re-encodes at a fixed quality.

use std::io::Cursor;

use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{GenericImageView, ImageReader};

pub struct ImagePreprocessor {
    max_width: u32,
    jpeg_quality: u8,
}

impl ImagePreprocessor {
    pub fn new(max_width: u32, jpeg_quality: u8) -> Self {
        Self {
            max_width,
            jpeg_quality,
        }
    }

    /// Content type of every buffer produced by [shrink](Self::shrink).
    pub fn output_content_type() -> &'static str {
        "image/jpeg"
    }

    /// Decode, downscale to the width bound (aspect ratio preserved), and
    /// re-encode as JPEG.
    pub fn shrink(&self, data: &[u8]) -> Result<Bytes, anyhow::Error> {
        let img = ImageReader::new(Cursor::new(data))
            .with_guessed_format()?
            .decode()?;
        let (width, height) = img.dimensions();

        let img = if width > self.max_width {
            let scale = self.max_width as f64 / width as f64;
            let target_height = ((height as f64 * scale).round() as u32).max(1);
            tracing::debug!(
                original_width = width,
                original_height = height,
                target_width = self.max_width,
                target_height,
                "Downscaling image"
            );
            img.resize(self.max_width, target_height, FilterType::Lanczos3)
        } else {
            img
        };

        let rgb = img.to_rgb8();
        let mut buffer = Vec::new();
        let mut encoder = JpegEncoder::new_with_quality(&mut buffer, self.jpeg_quality);
        encoder.encode_image(&rgb)?;

        Ok(Bytes::from(buffer))
    }
}
