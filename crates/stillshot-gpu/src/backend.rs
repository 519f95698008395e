//! Render backend interface consumed by the capture and preview paths.

use crate::capability::CapabilityProfile;
use crate::format::{FilterMode, TextureFormat};
use stillshot_core::{CameraState, PixelRect, Result};

/// Opaque handle to a backend render target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId(pub u64);

/// Parameters for creating an off-screen render target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetDesc {
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub filter: FilterMode,
    /// MSAA sample count; 1 disables anti-aliasing.
    pub anti_aliasing: u8,
    pub with_depth: bool,
}

impl TargetDesc {
    pub fn new(width: u32, height: u32, format: TextureFormat) -> Self {
        Self {
            width,
            height,
            format,
            filter: FilterMode::default(),
            anti_aliasing: 1,
            with_depth: true,
        }
    }
}

/// Which attachments a clear touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClearFlags {
    All,
    DepthOnly,
    ColorOnly,
}

/// Renders cameras into off-screen targets and reads pixels back.
pub trait RenderBackend {
    fn create_target(&mut self, desc: &TargetDesc) -> Result<TargetId>;

    /// Release a target. Unknown ids are ignored.
    fn destroy_target(&mut self, target: TargetId);

    fn clear(&mut self, target: TargetId, flags: ClearFlags, color: [f32; 4]) -> Result<()>;

    fn render_camera(&mut self, camera: &CameraState, target: TargetId) -> Result<()>;

    /// Read `rect` (origin bottom-left) from a target.
    ///
    /// Returns `rect.width * rect.height` tightly packed pixels in `format`,
    /// rows ordered top to bottom.
    fn read_pixels(
        &mut self,
        target: TargetId,
        rect: PixelRect,
        format: TextureFormat,
    ) -> Result<Vec<u8>>;

    /// Drop any render-target binding left active by the last render.
    fn release_active_target(&mut self) {}
}

const SINGLE_CLEAR: &[ClearFlags] = &[ClearFlags::All];
const TRIPLE_CLEAR: &[ClearFlags] = &[ClearFlags::All, ClearFlags::DepthOnly, ClearFlags::ColorOnly];

/// Clear passes for this GPU and camera.
///
/// GPUs flagged for flaky single-pass clears get a full, a depth-only and a
/// color-only clear, but only when the clear color has some opacity.
pub fn clear_sequence(profile: &CapabilityProfile, camera: &CameraState) -> &'static [ClearFlags] {
    if profile.requires_multiple_clear() && camera.has_opaque_clear() {
        TRIPLE_CLEAR
    } else {
        SINGLE_CLEAR
    }
}

/// Run [`clear_sequence`] against a target.
pub fn apply_clear_policy<B: RenderBackend + ?Sized>(
    backend: &mut B,
    profile: &CapabilityProfile,
    camera: &CameraState,
    target: TargetId,
) -> Result<()> {
    for flags in clear_sequence(profile, camera) {
        backend.clear(target, *flags, camera.clear_color)?;
    }
    Ok(())
}
