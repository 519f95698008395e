//! Screen, resolution and rectangle primitives.

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// Smallest edge length, in pixels, of any derived resolution.
pub const MIN_DIMENSION: u32 = 16;

/// Current screen (or host viewport) size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScreenSize {
    pub width: u32,
    pub height: u32,
}

impl ScreenSize {
    /// Create a screen size. Zero edges are bumped to 1 so the aspect is finite.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
        }
    }

    /// Height over width.
    #[inline]
    pub fn aspect(self) -> f64 {
        self.height as f64 / self.width as f64
    }
}

impl Default for ScreenSize {
    fn default() -> Self {
        Self::new(1920, 1080)
    }
}

/// Output resolution. Height is always derived from a width and the screen aspect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    /// Derive a resolution from a requested width, keeping the screen aspect.
    ///
    /// Both axes are floor-clamped to [`MIN_DIMENSION`].
    pub fn from_width(width: u32, screen: ScreenSize) -> Self {
        let width = width.max(MIN_DIMENSION);
        let height = (width as f64 * screen.aspect()).round() as u32;
        Self {
            width,
            height: height.max(MIN_DIMENSION),
        }
    }

    /// Total pixel count.
    #[inline]
    pub fn pixels(self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// Normalized texture-space rectangle, origin bottom-left.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, Pod, Zeroable)]
#[repr(C)]
pub struct UvRect {
    pub u: f32,
    pub v: f32,
    pub w: f32,
    pub h: f32,
}

impl UvRect {
    /// The whole texture.
    pub const FULL: Self = Self {
        u: 0.0,
        v: 0.0,
        w: 1.0,
        h: 1.0,
    };

    #[inline]
    pub const fn new(u: f32, v: f32, w: f32, h: f32) -> Self {
        Self { u, v, w, h }
    }

    /// Check if a normalized point lies inside the rectangle.
    #[inline]
    pub fn contains(self, u: f32, v: f32) -> bool {
        u >= self.u && u < self.u + self.w && v >= self.v && v < self.v + self.h
    }
}

/// Pixel-space rectangle, origin bottom-left, matching [`UvRect`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    #[inline]
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle covering a whole `width` x `height` surface.
    pub const fn full(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    /// Area in pixels.
    #[inline]
    pub fn area(self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Row offset of this rectangle's top edge when rows are counted from the top.
    pub fn top_row(self, surface_height: u32) -> u32 {
        surface_height.saturating_sub(self.y + self.height)
    }
}
