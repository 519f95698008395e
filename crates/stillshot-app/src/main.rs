//! StillShot - high-resolution scene capture
//!
//! Headless entry point: opens the GPU, runs a few preview ticks while
//! orbiting the camera, then takes one full-resolution capture.

use anyhow::{Context, Result};
use glam::{Quat, Vec3};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use stillshot_capture::{
    CaptureOrchestrator, CaptureSession, DirectoryStorage, ImageEncoder, PngEncoder,
    PreviewRenderer,
};
use stillshot_core::{format_bytes, CameraPose, CameraState, CaptureSettings, ScreenSize};
use stillshot_gpu::{BudgetContext, EmptyScene, GpuContext, WgpuBackend};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

const PREVIEW_TICKS: u32 = 8;
const TICK_INTERVAL: Duration = Duration::from_millis(50);

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("StillShot starting...");

    let settings = match std::env::args().nth(1).map(PathBuf::from) {
        Some(path) => CaptureSettings::load(&path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => CaptureSettings::default(),
    };
    settings.validate()?;

    let gpu = GpuContext::new().await?;
    let screen = ScreenSize::default();
    let ctx = BudgetContext::from_source(&gpu, screen, settings.budget);
    report_budget(&ctx, settings.default_width);

    let mut backend = WgpuBackend::new(gpu, EmptyScene);
    let mut session = CaptureSession::new(settings.default_width);
    let mut preview = PreviewRenderer::new(&settings);
    let mut camera = CameraState::default();

    let start = Instant::now();
    let mut ticker = tokio::time::interval(TICK_INTERVAL);
    for tick in 0..PREVIEW_TICKS {
        ticker.tick().await;
        camera.pose = orbit(tick as f32 * 0.05);
        let now = start + TICK_INTERVAL * tick;
        if let Some(frame) = preview.tick(now, &ctx, &mut backend, &camera, &session)? {
            info!(
                "Preview {}x{} slot {} ({:?})",
                frame.width, frame.height, frame.slot, frame.activity
            );
        }
    }
    info!("Preview targets hold {}", format_bytes(backend.memory_usage()));

    let (width, height) = session.output_resolution(&ctx);
    info!("Capturing {}x{}", width, height);

    let mut orchestrator = CaptureOrchestrator::new(PngEncoder::default());
    let result = orchestrator
        .capture(&ctx, &mut backend, &mut camera, &session.request())
        .await;
    preview.shutdown(&mut backend);
    let output = result?;

    if output.was_clamped() {
        warn!(
            "Requested width {} exceeded the safe limit; captured at {}",
            output.requested_width, output.render_resolution.width
        );
    }

    let storage = settings
        .output_dir
        .clone()
        .map(DirectoryStorage::new)
        .unwrap_or_else(DirectoryStorage::pictures)
        .with_extension(orchestrator.encoder().extension());
    let path = output.store(&storage)?;
    info!("Wrote {} ({})", path.display(), format_bytes(output.bytes.len() as u64));

    Ok(())
}

/// Log the memory picture for a requested width.
fn report_budget(ctx: &BudgetContext, width: u32) {
    let profile = ctx.profile();
    let budgets = ctx.budgets();
    let estimate = ctx.estimate_memory(width);
    info!(
        "GPU '{}' {:?}, budgets: gpu {} / cpu {}",
        profile.gpu_name(),
        profile.platform_class(),
        format_bytes(budgets.gpu_bytes),
        format_bytes(budgets.cpu_bytes)
    );
    info!(
        "Width {}: gpu {} cpu {} ({:?}), raw output {}, max safe width {}",
        width,
        format_bytes(estimate.gpu_bytes),
        format_bytes(estimate.cpu_bytes),
        ctx.memory_status(width),
        format_bytes(ctx.estimator().output_size(width)),
        ctx.max_safe_width()
    );
}

/// Camera circling the origin at a fixed radius.
fn orbit(angle: f32) -> CameraPose {
    let position = Vec3::new(angle.sin(), 0.0, angle.cos()) * 5.0;
    CameraPose::new(position, Quat::from_rotation_y(angle))
}
