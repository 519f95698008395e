//! Full-resolution capture.
//!
//! A capture walks `Idle -> Preparing -> Rendering -> ReadingBack ->
//! Encoding -> Restoring -> Idle`, or drops into `Failed` from any working
//! phase. The camera snapshot and the one-shot target live in a drop guard,
//! so restoring happens on success, on error, and when the capture future
//! is dropped part way through.

use crate::encoder::ImageEncoder;
use crate::session::CaptureRequest;
use crate::storage::StorageSink;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;
use stillshot_core::{CameraState, CaptureError, PixelRect, Resolution, Result};
use stillshot_gpu::format::swizzle_bgra_rgba;
use stillshot_gpu::{
    apply_clear_policy, BudgetContext, FilterMode, OneShotTarget, RenderBackend, TargetDesc,
    TextureFormat,
};
use tracing::{debug, info, warn};

// ── Phases ───────────────────────────────────────────────────────

/// Where the orchestrator is in its capture state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CapturePhase {
    #[default]
    Idle,
    Preparing,
    Rendering,
    ReadingBack,
    Encoding,
    Restoring,
    Failed,
}

impl CapturePhase {
    /// Whether a capture is in flight.
    pub fn is_busy(self) -> bool {
        !matches!(self, Self::Idle | Self::Failed)
    }
}

// ── Retry timer ──────────────────────────────────────────────────

/// Suspends a capture between read-back attempts without blocking the
/// thread driving it.
pub trait RetryTimer {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()>;
}

/// [`RetryTimer`] backed by the tokio timer wheel.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioTimer;

impl RetryTimer for TokioTimer {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> {
        tokio::time::sleep(duration)
    }
}

// ── Output ───────────────────────────────────────────────────────

/// A finished capture.
#[derive(Debug, Clone)]
pub struct CaptureOutput {
    /// Encoded image.
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Width the caller asked for, before clamping.
    pub requested_width: u32,
    /// Full render size before cropping.
    pub render_resolution: Resolution,
    /// Storage name for the image.
    pub logical_name: String,
    /// Read-back attempts it took.
    pub attempts: u32,
}

impl CaptureOutput {
    pub fn was_clamped(&self) -> bool {
        self.render_resolution.width < self.requested_width
    }

    /// Hand the encoded bytes to a storage sink.
    pub fn store(&self, sink: &dyn StorageSink) -> Result<PathBuf> {
        sink.write(&self.bytes, &self.logical_name)
    }
}

// ── Restore guard ────────────────────────────────────────────────

/// Holds everything a capture changes and puts it back on drop.
struct RestoreGuard<'a, B: RenderBackend + ?Sized> {
    backend: &'a mut B,
    camera: &'a mut CameraState,
    snapshot: CameraState,
    target: Option<OneShotTarget>,
}

impl<'a, B: RenderBackend + ?Sized> RestoreGuard<'a, B> {
    fn new(backend: &'a mut B, camera: &'a mut CameraState) -> Self {
        let snapshot = *camera;
        Self {
            backend,
            camera,
            snapshot,
            target: None,
        }
    }
}

impl<B: RenderBackend + ?Sized> Drop for RestoreGuard<'_, B> {
    fn drop(&mut self) {
        *self.camera = self.snapshot;
        if let Some(target) = self.target.take() {
            target.destroy(&mut *self.backend);
        }
        self.backend.release_active_target();
    }
}

/// Marks the phase `Failed` if a capture is abandoned mid-flight.
struct AbandonGuard<'a> {
    phase: &'a Mutex<CapturePhase>,
    armed: bool,
}

impl AbandonGuard<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for AbandonGuard<'_> {
    fn drop(&mut self) {
        let mut phase = self.phase.lock();
        if self.armed && phase.is_busy() {
            warn!("Capture abandoned in {:?}", *phase);
            *phase = CapturePhase::Failed;
        }
    }
}

// ── Orchestrator ─────────────────────────────────────────────────

/// Runs captures one at a time.
///
/// [`CaptureOrchestrator::capture`] borrows the orchestrator mutably for the
/// whole capture, so a second request cannot start until the first is done.
#[derive(Debug)]
pub struct CaptureOrchestrator<E: ImageEncoder, T: RetryTimer = TokioTimer> {
    encoder: E,
    timer: T,
    phase: Mutex<CapturePhase>,
    completed: u64,
    failed: u64,
}

impl<E: ImageEncoder> CaptureOrchestrator<E, TokioTimer> {
    pub fn new(encoder: E) -> Self {
        Self::with_timer(encoder, TokioTimer)
    }
}

impl<E: ImageEncoder, T: RetryTimer> CaptureOrchestrator<E, T> {
    pub fn with_timer(encoder: E, timer: T) -> Self {
        Self {
            encoder,
            timer,
            phase: Mutex::new(CapturePhase::Idle),
            completed: 0,
            failed: 0,
        }
    }

    pub fn phase(&self) -> CapturePhase {
        *self.phase.lock()
    }

    pub fn encoder(&self) -> &E {
        &self.encoder
    }

    pub fn completed_count(&self) -> u64 {
        self.completed
    }

    pub fn failed_count(&self) -> u64 {
        self.failed
    }

    /// Capture `camera` at the requested width, cropped and zoomed.
    ///
    /// The camera is restored and the capture target destroyed before this
    /// returns, whatever the outcome.
    pub async fn capture<B: RenderBackend + ?Sized>(
        &mut self,
        ctx: &BudgetContext,
        backend: &mut B,
        camera: &mut CameraState,
        request: &CaptureRequest,
    ) -> Result<CaptureOutput> {
        let abandon = AbandonGuard {
            phase: &self.phase,
            armed: true,
        };
        let mut guard = RestoreGuard::new(backend, camera);
        let outcome = self.run(ctx, &mut guard, request).await;
        if let Err(e) = &outcome {
            warn!("Capture failed in {:?}: {}", self.phase(), e);
            self.enter(CapturePhase::Failed);
        }

        self.enter(CapturePhase::Restoring);
        drop(guard);
        abandon.disarm();

        match outcome {
            Ok(output) => {
                self.completed += 1;
                self.enter(CapturePhase::Idle);
                info!(
                    "Captured {}x{} ({} bytes) as {}",
                    output.width,
                    output.height,
                    output.bytes.len(),
                    output.logical_name
                );
                Ok(output)
            }
            Err(e) => {
                self.failed += 1;
                self.enter(CapturePhase::Failed);
                Err(e)
            }
        }
    }

    async fn run<B: RenderBackend + ?Sized>(
        &self,
        ctx: &BudgetContext,
        guard: &mut RestoreGuard<'_, B>,
        request: &CaptureRequest,
    ) -> Result<CaptureOutput> {
        let profile = ctx.profile();

        self.enter(CapturePhase::Preparing);
        let resolution = ctx.capture_resolution(request.requested_width);
        let read_format = profile.optimal_read_format();
        let target = allocate_target(ctx, &mut *guard.backend, resolution)?;
        let target_id = target.id();
        guard.target = Some(target);

        self.enter(CapturePhase::Rendering);
        let render_camera = CameraState {
            anti_aliasing: 1,
            ..guard.snapshot.zoomed(request.zoom.factor())
        };
        *guard.camera = render_camera;
        apply_clear_policy(&mut *guard.backend, profile, &render_camera, target_id)?;
        guard.backend.render_camera(&render_camera, target_id)?;

        self.enter(CapturePhase::ReadingBack);
        let rect = request
            .crop
            .normalize()
            .to_pixel_rect(resolution.width, resolution.height);
        let attempts = profile.readback_attempts();
        let delay = Duration::from_millis(u64::from(profile.retry_delay_ms()));
        let (mut pixels, used) = read_with_retry(
            &self.timer,
            &mut *guard.backend,
            target_id,
            rect,
            read_format,
            attempts,
            delay,
        )
        .await?;
        if read_format.is_bgra() {
            swizzle_bgra_rgba(&mut pixels);
        }

        self.enter(CapturePhase::Encoding);
        let bytes = self.encoder.encode(&pixels, rect.width, rect.height)?;

        let logical_name = request
            .logical_name
            .clone()
            .unwrap_or_else(|| format!("capture_{}", uuid::Uuid::new_v4()));
        Ok(CaptureOutput {
            bytes,
            width: rect.width,
            height: rect.height,
            requested_width: request.requested_width,
            render_resolution: resolution,
            logical_name,
            attempts: used,
        })
    }

    fn enter(&self, phase: CapturePhase) {
        let mut current = self.phase.lock();
        debug!("Capture phase {:?} -> {:?}", *current, phase);
        *current = phase;
    }
}

/// Create the capture target, walking the render format chain until one
/// allocates. Formats wider than the budget allows at this size are skipped.
fn allocate_target<B: RenderBackend + ?Sized>(
    ctx: &BudgetContext,
    backend: &mut B,
    resolution: Resolution,
) -> Result<OneShotTarget> {
    let mut last_error = None;
    for &format in ctx.profile().render_format_chain() {
        if !ctx.render_format_fits(resolution, format) {
            debug!(
                "Skipping {:?} at {}x{}: over GPU budget",
                format, resolution.width, resolution.height
            );
            continue;
        }
        let desc = TargetDesc {
            filter: FilterMode::Bilinear,
            ..TargetDesc::new(resolution.width, resolution.height, format)
        };
        match OneShotTarget::create(backend, desc) {
            Ok(target) => return Ok(target),
            Err(e) => {
                warn!("Capture target {:?} unavailable: {}", format, e);
                last_error = Some(e);
            }
        }
    }
    Err(last_error.unwrap_or_else(|| CaptureError::AllocationFailure {
        width: resolution.width,
        height: resolution.height,
        reason: "no render format available".to_string(),
    }))
}

/// Read `rect` up to `attempts` times, sleeping `delay` between tries.
///
/// Returns the pixels and the attempt that produced them.
async fn read_with_retry<B: RenderBackend + ?Sized, T: RetryTimer>(
    timer: &T,
    backend: &mut B,
    target: stillshot_gpu::TargetId,
    rect: PixelRect,
    format: TextureFormat,
    attempts: u32,
    delay: Duration,
) -> Result<(Vec<u8>, u32)> {
    let attempts = attempts.max(1);
    let expected = rect.area() as usize * format.bytes_per_pixel() as usize;
    let mut reason = String::new();

    for attempt in 1..=attempts {
        match backend.read_pixels(target, rect, format) {
            Ok(pixels) if pixels.len() == expected => return Ok((pixels, attempt)),
            Ok(pixels) => {
                reason = format!("expected {expected} bytes, read {}", pixels.len());
            }
            Err(e) => reason = e.to_string(),
        }
        if attempt < attempts {
            debug!("Read-back attempt {}/{} failed: {}", attempt, attempts, reason);
            timer.sleep(delay).await;
        }
    }

    Err(CaptureError::ReadbackFailure { attempts, reason })
}
