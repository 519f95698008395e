//! Crop, zoom and width choices for one open capture panel.

use serde::{Deserialize, Serialize};
use stillshot_core::{
    CropEdge, CropRegion, CropResolutionCache, NormalizedCrop, UvRect, ZoomDirection, ZoomState,
};
use stillshot_gpu::BudgetContext;
use tracing::debug;

/// Persisted subset of a session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionState {
    pub crop: CropRegion,
    pub zoom: ZoomState,
    pub requested_width: u32,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            crop: CropRegion::NONE,
            zoom: ZoomState::default(),
            requested_width: 3840,
        }
    }
}

/// Everything a single capture needs besides the camera.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureRequest {
    pub requested_width: u32,
    pub crop: CropRegion,
    pub zoom: ZoomState,
    /// Storage name; a `capture_<uuid>` name is generated when unset.
    pub logical_name: Option<String>,
}

impl CaptureRequest {
    pub fn new(requested_width: u32) -> Self {
        Self {
            requested_width,
            crop: CropRegion::NONE,
            zoom: ZoomState::default(),
            logical_name: None,
        }
    }

    pub fn with_crop(mut self, crop: CropRegion) -> Self {
        self.crop = crop;
        self
    }

    pub fn with_zoom(mut self, zoom: ZoomState) -> Self {
        self.zoom = zoom;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.logical_name = Some(name.into());
        self
    }
}

/// Owns the user's crop and zoom for as long as the capture panel is open.
#[derive(Debug, Default)]
pub struct CaptureSession {
    state: SessionState,
    cache: CropResolutionCache,
}

impl CaptureSession {
    pub fn new(requested_width: u32) -> Self {
        Self::from_state(SessionState {
            requested_width,
            ..Default::default()
        })
    }

    pub fn from_state(state: SessionState) -> Self {
        Self {
            state,
            cache: CropResolutionCache::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    // ── Crop ─────────────────────────────────────────────────────

    pub fn crop(&self) -> CropRegion {
        self.state.crop
    }

    pub fn normalized_crop(&self) -> NormalizedCrop {
        self.state.crop.normalize()
    }

    pub fn set_crop_edge(&mut self, edge: CropEdge, percent: f32) {
        self.state.crop.set_edge(edge, percent);
        self.cache.invalidate();
    }

    pub fn set_crop(&mut self, crop: CropRegion) {
        for edge in CropEdge::ALL {
            self.state.crop.set_edge(edge, crop.edge(edge));
        }
        self.cache.invalidate();
    }

    pub fn reset_crop(&mut self) {
        self.set_crop(CropRegion::NONE);
    }

    /// Visible region in preview texture space.
    pub fn uv_rect(&self) -> UvRect {
        self.normalized_crop().to_uv_rect()
    }

    /// Output size after cropping an `original_width` x `original_height` render.
    pub fn cropped_resolution(&mut self, original_width: u32, original_height: u32) -> (u32, u32) {
        let crop = self.normalized_crop();
        self.cache.get(&crop, original_width, original_height)
    }

    // ── Zoom ─────────────────────────────────────────────────────

    pub fn zoom(&self) -> ZoomState {
        self.state.zoom
    }

    pub fn zoom_factor(&self) -> f32 {
        self.state.zoom.factor()
    }

    pub fn step_zoom(&mut self, direction: ZoomDirection) {
        self.state.zoom.step(direction);
        debug!("Zoom stepped to {:.3}", self.state.zoom.factor());
    }

    pub fn set_zoom_level(&mut self, level: f32) {
        self.state.zoom = ZoomState::from_level(level);
    }

    pub fn reset_zoom(&mut self) {
        self.state.zoom.reset();
    }

    // ── Width ────────────────────────────────────────────────────

    pub fn requested_width(&self) -> u32 {
        self.state.requested_width
    }

    pub fn set_requested_width(&mut self, width: u32) {
        self.state.requested_width = width;
    }

    /// Final image size for the current choices, after clamping and cropping.
    pub fn output_resolution(&mut self, ctx: &BudgetContext) -> (u32, u32) {
        let render = ctx.capture_resolution(self.state.requested_width);
        self.cropped_resolution(render.width, render.height)
    }

    pub fn request(&self) -> CaptureRequest {
        CaptureRequest::new(self.state.requested_width)
            .with_crop(self.state.crop)
            .with_zoom(self.state.zoom)
    }
}
