//! Scripted render backend shared by the integration tests.

use std::collections::HashMap;
use stillshot_core::{CameraState, CaptureError, PixelRect, Result};
use stillshot_gpu::{ClearFlags, RenderBackend, TargetDesc, TargetId, TextureFormat};

/// Fill color every render produces, as RGBA.
pub const SCENE_RGBA: [u8; 4] = [40, 120, 200, 255];

#[derive(Debug, Default)]
pub struct MockBackend {
    next: u64,
    pub live: HashMap<TargetId, TargetDesc>,
    pub created: u32,
    pub destroyed: u32,
    /// Format of every target created, in order.
    pub formats: Vec<TextureFormat>,
    pub clears: Vec<(TargetId, ClearFlags)>,
    pub renders: Vec<(TargetId, CameraState)>,
    pub reads: Vec<PixelRect>,
    pub released: u32,
    /// Reject targets wider than this.
    pub max_width: Option<u32>,
    /// Fail this many reads before succeeding.
    pub failing_reads: u32,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject targets wider than `max_width`.
    pub fn with_max_width(mut self, max_width: u32) -> Self {
        self.max_width = Some(max_width);
        self
    }

    /// Fail the first `count` reads.
    pub fn with_failing_reads(mut self, count: u32) -> Self {
        self.failing_reads = count;
        self
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }
}

impl RenderBackend for MockBackend {
    fn create_target(&mut self, desc: &TargetDesc) -> Result<TargetId> {
        if self.max_width.is_some_and(|max| desc.width > max) {
            return Err(CaptureError::AllocationFailure {
                width: desc.width,
                height: desc.height,
                reason: "out of memory".into(),
            });
        }
        self.next += 1;
        let id = TargetId(self.next);
        self.live.insert(id, *desc);
        self.created += 1;
        self.formats.push(desc.format);
        Ok(id)
    }

    fn destroy_target(&mut self, target: TargetId) {
        if self.live.remove(&target).is_some() {
            self.destroyed += 1;
        }
    }

    fn clear(&mut self, target: TargetId, flags: ClearFlags, _color: [f32; 4]) -> Result<()> {
        self.clears.push((target, flags));
        Ok(())
    }

    fn render_camera(&mut self, camera: &CameraState, target: TargetId) -> Result<()> {
        if !self.live.contains_key(&target) {
            return Err(CaptureError::RenderFailure(format!("{target:?} not live")));
        }
        self.renders.push((target, *camera));
        Ok(())
    }

    fn read_pixels(
        &mut self,
        target: TargetId,
        rect: PixelRect,
        format: TextureFormat,
    ) -> Result<Vec<u8>> {
        self.reads.push(rect);
        if self.failing_reads > 0 {
            self.failing_reads -= 1;
            return Err(CaptureError::ReadbackFailure {
                attempts: 1,
                reason: "fence not signalled".into(),
            });
        }
        let desc = self
            .live
            .get(&target)
            .ok_or_else(|| CaptureError::RenderFailure(format!("{target:?} not live")))?;
        if rect.x + rect.width > desc.width || rect.y + rect.height > desc.height {
            return Err(CaptureError::ReadbackFailure {
                attempts: 1,
                reason: format!("{rect:?} outside {}x{}", desc.width, desc.height),
            });
        }

        let [r, g, b, a] = SCENE_RGBA;
        let pixel = if format.is_bgra() { [b, g, r, a] } else { SCENE_RGBA };
        Ok(pixel.repeat(rect.area() as usize))
    }

    fn release_active_target(&mut self) {
        self.released += 1;
    }
}
