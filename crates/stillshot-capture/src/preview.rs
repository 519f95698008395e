//! Live preview of the capture framing.
//!
//! Renders into a two-slot pool, alternating slots so the host can keep
//! displaying the last finished frame while the next one is drawn.

use crate::scheduler::{ActivityClass, AdaptiveUpdateScheduler};
use crate::session::CaptureSession;
use std::time::Instant;
use stillshot_core::{CameraState, CaptureSettings, PreviewSettings, Result, UvRect};
use stillshot_gpu::{
    apply_clear_policy, BudgetContext, FilterMode, RenderBackend, RenderResourcePool, TargetDesc,
    TargetId, TextureFormat, PREVIEW_SLOTS,
};
use tracing::debug;

/// A rendered preview frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreviewFrame {
    pub target: TargetId,
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    /// Part of the frame the current crop keeps.
    pub uv_rect: UvRect,
    pub slot: usize,
    /// The slot's target was (re)allocated for this frame.
    pub recreated: bool,
    pub activity: ActivityClass,
}

/// Scheduler-driven preview renderer.
#[derive(Debug)]
pub struct PreviewRenderer {
    scheduler: AdaptiveUpdateScheduler,
    pool: RenderResourcePool<PREVIEW_SLOTS>,
    box_size: PreviewSettings,
    next_slot: usize,
    last_frame: Option<PreviewFrame>,
}

impl PreviewRenderer {
    pub fn new(settings: &CaptureSettings) -> Self {
        Self {
            scheduler: AdaptiveUpdateScheduler::new(settings.scheduler),
            pool: RenderResourcePool::new(),
            box_size: settings.preview,
            next_slot: 0,
            last_frame: None,
        }
    }

    pub fn activity(&self) -> ActivityClass {
        self.scheduler.activity()
    }

    pub fn last_frame(&self) -> Option<&PreviewFrame> {
        self.last_frame.as_ref()
    }

    pub fn pool(&self) -> &RenderResourcePool<PREVIEW_SLOTS> {
        &self.pool
    }

    /// Force the next tick to render, e.g. after a crop or zoom edit.
    pub fn request_refresh(&mut self) {
        self.scheduler.request_refresh();
    }

    /// Resize the preview box; the next tick renders at the new size.
    pub fn set_box_size(&mut self, width: u32, height: u32) {
        if (self.box_size.width, self.box_size.height) != (width, height) {
            self.box_size = PreviewSettings { width, height };
            self.request_refresh();
        }
    }

    /// Preview size for the current box and screen aspect.
    pub fn frame_size(&self, ctx: &BudgetContext) -> (u32, u32) {
        ctx.fit_preview(self.box_size.width, self.box_size.height)
    }

    /// Per-frame entry point. Renders only when the scheduler says so.
    pub fn tick<B: RenderBackend + ?Sized>(
        &mut self,
        now: Instant,
        ctx: &BudgetContext,
        backend: &mut B,
        camera: &CameraState,
        session: &CaptureSession,
    ) -> Result<Option<PreviewFrame>> {
        let poll = self.scheduler.poll(now, &camera.pose);
        if !poll.due {
            return Ok(None);
        }

        let (width, height) = self.frame_size(ctx);
        let desc = TargetDesc {
            filter: FilterMode::Bilinear,
            anti_aliasing: camera.anti_aliasing.max(1),
            ..TargetDesc::new(width, height, ctx.profile().preview_format())
        };
        let slot = self.next_slot;
        let (entry, recreated) = self.pool.acquire(backend, slot, &desc)?;
        let entry = *entry;

        let view = camera.zoomed(session.zoom_factor());
        apply_clear_policy(backend, ctx.profile(), &view, entry.target)?;
        backend.render_camera(&view, entry.target)?;

        let frame = PreviewFrame {
            target: entry.target,
            width,
            height,
            format: entry.format,
            uv_rect: session.uv_rect(),
            slot,
            recreated,
            activity: poll.activity,
        };
        debug!(
            "Preview frame {}x{} in slot {} ({:?})",
            width, height, slot, poll.activity
        );
        self.next_slot = (slot + 1) % PREVIEW_SLOTS;
        self.last_frame = Some(frame);
        Ok(Some(frame))
    }

    /// Destroy the pooled targets. Call before dropping the renderer.
    pub fn shutdown<B: RenderBackend + ?Sized>(&mut self, backend: &mut B) {
        self.pool.invalidate_all(backend);
        self.last_frame = None;
        self.next_slot = 0;
        self.scheduler.reset();
    }
}
