//! Lossless image encoding of read-back pixels.

use image::codecs::png::{CompressionType, FilterType, PngEncoder as PngWriter};
use image::{ExtendedColorType, ImageEncoder as _};
use stillshot_core::{CaptureError, Result};

/// Turns tightly packed RGBA8 rows (top to bottom) into a compressed stream.
pub trait ImageEncoder {
    fn encode(&self, rgba: &[u8], width: u32, height: u32) -> Result<Vec<u8>>;

    /// File extension for the encoded stream, without the dot.
    fn extension(&self) -> &'static str;
}

/// PNG encoder.
#[derive(Debug, Clone, Copy, Default)]
pub struct PngEncoder {
    /// Trade encode time for smaller files.
    pub best_compression: bool,
}

impl ImageEncoder for PngEncoder {
    fn encode(&self, rgba: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
        let expected = width as u64 * height as u64 * 4;
        if width == 0 || height == 0 || rgba.len() as u64 != expected {
            return Err(CaptureError::EncodingFailure(format!(
                "expected {expected} bytes for {width}x{height} RGBA, got {}",
                rgba.len()
            )));
        }

        let compression = if self.best_compression {
            CompressionType::Best
        } else {
            CompressionType::Default
        };
        let mut out = Vec::with_capacity(rgba.len() / 2);
        PngWriter::new_with_quality(&mut out, compression, FilterType::Adaptive)
            .write_image(rgba, width, height, ExtendedColorType::Rgba8)
            .map_err(|e| CaptureError::EncodingFailure(e.to_string()))?;
        Ok(out)
    }

    fn extension(&self) -> &'static str {
        "png"
    }
}
