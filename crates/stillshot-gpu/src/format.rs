//! Texture formats and sampling options for render targets.

use half::f16;
use serde::{Deserialize, Serialize};

/// Color formats the capture pipeline can render into or read back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TextureFormat {
    /// 16-bit half-float RGBA (64 bits per pixel)
    Rgba16Float,
    /// 8-bit RGBA with sRGB encoding
    Rgba8UnormSrgb,
    /// 8-bit RGBA, linear. Supported everywhere.
    #[default]
    Rgba8Unorm,
    /// 8-bit BGRA, linear
    Bgra8Unorm,
}

impl TextureFormat {
    /// Bytes per pixel.
    pub fn bytes_per_pixel(self) -> u32 {
        match self {
            Self::Rgba16Float => 8,
            Self::Rgba8UnormSrgb | Self::Rgba8Unorm | Self::Bgra8Unorm => 4,
        }
    }

    /// Whether red and blue are swapped relative to RGBA.
    #[inline]
    pub fn is_bgra(self) -> bool {
        matches!(self, Self::Bgra8Unorm)
    }

    /// Whether the format packs 8 bits per channel.
    #[inline]
    pub fn is_8bit(self) -> bool {
        self.bytes_per_pixel() == 4
    }

    pub fn to_wgpu(self) -> wgpu::TextureFormat {
        match self {
            Self::Rgba16Float => wgpu::TextureFormat::Rgba16Float,
            Self::Rgba8UnormSrgb => wgpu::TextureFormat::Rgba8UnormSrgb,
            Self::Rgba8Unorm => wgpu::TextureFormat::Rgba8Unorm,
            Self::Bgra8Unorm => wgpu::TextureFormat::Bgra8Unorm,
        }
    }
}

/// Texture filtering used when the preview is displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FilterMode {
    Point,
    #[default]
    Bilinear,
}

impl FilterMode {
    pub fn to_wgpu(self) -> wgpu::FilterMode {
        match self {
            Self::Point => wgpu::FilterMode::Nearest,
            Self::Bilinear => wgpu::FilterMode::Linear,
        }
    }
}

/// Swap red and blue in place for tightly packed 8-bit pixels.
pub fn swizzle_bgra_rgba(pixels: &mut [u8]) {
    for px in pixels.chunks_exact_mut(4) {
        px.swap(0, 2);
    }
}

/// Convert little-endian `Rgba16Float` pixels to 8-bit RGBA.
///
/// Color channels are linear in the half-float target and come out sRGB
/// encoded, matching what an `Rgba8UnormSrgb` target stores. Alpha stays
/// linear.
pub fn rgba16f_to_rgba8(half_pixels: &[u8]) -> Vec<u8> {
    half_pixels
        .chunks_exact(8)
        .flat_map(|px| {
            let channel = |i: usize| f16::from_le_bytes([px[2 * i], px[2 * i + 1]]).to_f32();
            [
                unorm8(linear_to_srgb(channel(0))),
                unorm8(linear_to_srgb(channel(1))),
                unorm8(linear_to_srgb(channel(2))),
                unorm8(channel(3)),
            ]
        })
        .collect()
}

fn linear_to_srgb(v: f32) -> f32 {
    let v = if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) };
    if v <= 0.003_130_8 {
        v * 12.92
    } else {
        1.055 * v.powf(1.0 / 2.4) - 0.055
    }
}

fn unorm8(v: f32) -> u8 {
    let v = if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) };
    (v * 255.0).round() as u8
}
