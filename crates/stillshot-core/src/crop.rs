//! Crop transform: user-facing edge percentages to UV and pixel rectangles.
//!
//! Crop edges are entered as percentages per edge. Normalization turns them
//! into fractions and rescales opposing pairs so they never claim the whole
//! axis, which keeps every derived rectangle non-degenerate.

use crate::geometry::{PixelRect, UvRect};
use serde::{Deserialize, Serialize};

/// Opposing edges never sum past this after normalization.
pub const MAX_PAIR_SUM: f32 = 0.99;

/// Which edge of the crop region an edit applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CropEdge {
    Left,
    Top,
    Right,
    Bottom,
}

impl CropEdge {
    pub const ALL: [CropEdge; 4] = [Self::Left, Self::Top, Self::Right, Self::Bottom];
}

/// Raw crop, in percent of each axis (`0..=100`).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CropRegion {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl CropRegion {
    pub const NONE: Self = Self {
        left: 0.0,
        top: 0.0,
        right: 0.0,
        bottom: 0.0,
    };

    pub const fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Read one edge.
    pub fn edge(&self, edge: CropEdge) -> f32 {
        match edge {
            CropEdge::Left => self.left,
            CropEdge::Top => self.top,
            CropEdge::Right => self.right,
            CropEdge::Bottom => self.bottom,
        }
    }

    /// Set one edge, clamped to `0..=100`.
    pub fn set_edge(&mut self, edge: CropEdge, percent: f32) {
        let value = if percent.is_finite() {
            percent.clamp(0.0, 100.0)
        } else {
            0.0
        };
        match edge {
            CropEdge::Left => self.left = value,
            CropEdge::Top => self.top = value,
            CropEdge::Right => self.right = value,
            CropEdge::Bottom => self.bottom = value,
        }
    }

    /// Whether no edge is cropped.
    pub fn is_empty(&self) -> bool {
        self.left <= 0.0 && self.top <= 0.0 && self.right <= 0.0 && self.bottom <= 0.0
    }

    /// Convert percentages to fractions with opposing pairs kept below a full axis.
    pub fn normalize(&self) -> NormalizedCrop {
        let frac = |p: f32| {
            if p.is_finite() {
                p.clamp(0.0, 100.0) / 100.0
            } else {
                0.0
            }
        };
        let (left, right) = fit_pair(frac(self.left), frac(self.right));
        let (top, bottom) = fit_pair(frac(self.top), frac(self.bottom));
        NormalizedCrop {
            left,
            top,
            right,
            bottom,
        }
    }
}

/// Scale a pair down proportionally if it claims the whole axis.
fn fit_pair(a: f32, b: f32) -> (f32, f32) {
    let sum = a + b;
    if sum >= 1.0 {
        let scale = MAX_PAIR_SUM / sum;
        (a * scale, b * scale)
    } else {
        (a, b)
    }
}

/// Crop in fractions `0..1`; `left + right < 1` and `top + bottom < 1`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NormalizedCrop {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl NormalizedCrop {
    /// Visible fraction of the horizontal axis.
    #[inline]
    pub fn visible_width(&self) -> f64 {
        1.0 - self.left as f64 - self.right as f64
    }

    /// Visible fraction of the vertical axis.
    #[inline]
    pub fn visible_height(&self) -> f64 {
        1.0 - self.top as f64 - self.bottom as f64
    }

    /// Texture-space rectangle (origin bottom-left).
    pub fn to_uv_rect(&self) -> UvRect {
        UvRect::new(
            self.left,
            self.bottom,
            1.0 - self.left - self.right,
            1.0 - self.top - self.bottom,
        )
    }

    /// Pixel rectangle inside a `render_width` x `render_height` surface.
    ///
    /// Each edge rounds independently; width and height never drop below 1.
    pub fn to_pixel_rect(&self, render_width: u32, render_height: u32) -> PixelRect {
        let (x0, x1) = pixel_span(
            self.left as f64,
            1.0 - self.right as f64,
            render_width,
        );
        let (y0, y1) = pixel_span(
            self.bottom as f64,
            1.0 - self.top as f64,
            render_height,
        );
        PixelRect::new(x0, y0, x1 - x0, y1 - y0)
    }

    /// Output size after cropping an `original_width` x `original_height` image.
    pub fn cropped_resolution(&self, original_width: u32, original_height: u32) -> (u32, u32) {
        let width = (original_width as f64 * self.visible_width()).round() as u32;
        let height = (original_height as f64 * self.visible_height()).round() as u32;
        (width.max(1), height.max(1))
    }
}

/// Round both ends of a span and keep it at least one pixel inside `extent`.
fn pixel_span(start: f64, end: f64, extent: u32) -> (u32, u32) {
    let extent = extent.max(1);
    let lo = ((start * extent as f64).round() as u32).min(extent - 1);
    let hi = ((end * extent as f64).round() as u32).min(extent);
    (lo, hi.max(lo + 1))
}

/// Single-entry cache for [`NormalizedCrop::cropped_resolution`].
///
/// Keyed by the original size and the normalized crop; owners call
/// [`CropResolutionCache::invalidate`] whenever a crop edge changes.
#[derive(Debug, Default)]
pub struct CropResolutionCache {
    entry: Option<CacheEntry>,
}

#[derive(Debug)]
struct CacheEntry {
    original: (u32, u32),
    crop: NormalizedCrop,
    result: (u32, u32),
}

impl CropResolutionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cropped size, recomputed only when the key changes.
    pub fn get(
        &mut self,
        crop: &NormalizedCrop,
        original_width: u32,
        original_height: u32,
    ) -> (u32, u32) {
        let original = (original_width, original_height);
        if let Some(entry) = &self.entry {
            if entry.original == original && entry.crop == *crop {
                return entry.result;
            }
        }
        let result = crop.cropped_resolution(original_width, original_height);
        self.entry = Some(CacheEntry {
            original,
            crop: *crop,
            result,
        });
        result
    }

    pub fn invalidate(&mut self) {
        self.entry = None;
    }

    pub fn is_cached(&self) -> bool {
        self.entry.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_cropped_resolution_scenario() {
        let crop = CropRegion::new(10.0, 0.0, 10.0, 0.0).normalize();
        assert_eq!(crop.cropped_resolution(1000, 800), (800, 800));
    }

    #[test]
    fn test_normalize_scales_overlapping_pair() {
        let crop = CropRegion::new(80.0, 0.0, 40.0, 0.0).normalize();
        assert!((crop.left + crop.right - MAX_PAIR_SUM).abs() < 1e-5);
        // Proportions survive the rescale.
        assert!((crop.left / crop.right - 2.0).abs() < 1e-4);
        assert_eq!(crop.top, 0.0);
    }

    #[test]
    fn test_normalize_clamps_out_of_range() {
        let crop = CropRegion::new(-5.0, 150.0, f32::NAN, 0.0).normalize();
        assert_eq!(crop.left, 0.0);
        assert_eq!(crop.right, 0.0);
        assert!(crop.top < 1.0);
    }

    #[test]
    fn test_uv_rect_origin_bottom_left() {
        let crop = CropRegion::new(10.0, 20.0, 30.0, 5.0).normalize();
        let uv = crop.to_uv_rect();
        assert!((uv.u - 0.1).abs() < 1e-6);
        assert!((uv.v - 0.05).abs() < 1e-6);
        assert!((uv.w - 0.6).abs() < 1e-6);
        assert!((uv.h - 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_pixel_rect_rounds_edges() {
        let crop = CropRegion::new(10.0, 25.0, 10.0, 25.0).normalize();
        let rect = crop.to_pixel_rect(1000, 800);
        assert_eq!(rect, PixelRect::new(100, 200, 800, 400));
    }

    #[test]
    fn test_pixel_rect_never_empty() {
        let crop = CropRegion::new(100.0, 100.0, 100.0, 100.0).normalize();
        let rect = crop.to_pixel_rect(4, 4);
        assert!(rect.width >= 1);
        assert!(rect.height >= 1);
        assert!(rect.x + rect.width <= 4);
        assert!(rect.y + rect.height <= 4);
    }

    #[test]
    fn test_set_edge_clamps() {
        let mut crop = CropRegion::NONE;
        crop.set_edge(CropEdge::Left, 140.0);
        crop.set_edge(CropEdge::Bottom, -3.0);
        assert_eq!(crop.edge(CropEdge::Left), 100.0);
        assert_eq!(crop.edge(CropEdge::Bottom), 0.0);
    }

    #[test]
    fn test_cache_hits_and_invalidates() {
        let mut cache = CropResolutionCache::new();
        let crop = CropRegion::new(10.0, 0.0, 10.0, 0.0).normalize();
        assert_eq!(cache.get(&crop, 1000, 800), (800, 800));
        assert!(cache.is_cached());

        let other = CropRegion::new(25.0, 0.0, 25.0, 0.0).normalize();
        assert_eq!(cache.get(&other, 1000, 800), (500, 800));

        cache.invalidate();
        assert!(!cache.is_cached());
    }

    proptest! {
        #[test]
        fn normalized_pairs_stay_below_one(
            l in 0.0f32..=100.0,
            t in 0.0f32..=100.0,
            r in 0.0f32..=100.0,
            b in 0.0f32..=100.0,
        ) {
            let crop = CropRegion::new(l, t, r, b).normalize();
            prop_assert!(crop.left + crop.right < 1.0);
            prop_assert!(crop.top + crop.bottom < 1.0);
            prop_assert!(crop.left >= 0.0 && crop.right >= 0.0);
        }

        #[test]
        fn cropped_resolution_is_never_zero(
            l in 0.0f32..=100.0,
            r in 0.0f32..=100.0,
            w in 1u32..8192,
            h in 1u32..8192,
        ) {
            let crop = CropRegion::new(l, l, r, r).normalize();
            let (cw, ch) = crop.cropped_resolution(w, h);
            prop_assert!(cw >= 1 && cw <= w);
            prop_assert!(ch >= 1 && ch <= h);
        }
    }
}
