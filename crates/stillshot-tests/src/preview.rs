//! Integration tests for the preview pool and scheduler.

use crate::mock::MockBackend;
use glam::{Quat, Vec3};
use std::time::{Duration, Instant};
use stillshot_capture::{
    ActivityClass, CaptureOrchestrator, CaptureRequest, CaptureSession, PngEncoder,
    PreviewRenderer,
};
use stillshot_core::{BudgetFractions, CameraPose, CameraState, CaptureSettings, ScreenSize};
use stillshot_gpu::{
    BudgetContext, RenderResourcePool, StaticCapabilities, TargetDesc, TextureFormat,
};

fn ctx() -> BudgetContext {
    BudgetContext::from_source(
        &StaticCapabilities::desktop("Radeon Pro W7800", 32768, 65536),
        ScreenSize::new(1920, 1080),
        BudgetFractions::default(),
    )
}

#[test]
fn pool_reuse_and_destruction_counter() {
    let mut backend = MockBackend::new();
    let mut pool = RenderResourcePool::<2>::new();
    let square = TargetDesc::new(100, 100, TextureFormat::Rgba8Unorm);
    let wide = TargetDesc::new(200, 100, TextureFormat::Rgba8Unorm);

    let (first, created) = pool.acquire(&mut backend, 0, &square).unwrap();
    let first = first.target;
    assert!(created);

    let (again, created) = pool.acquire(&mut backend, 0, &square).unwrap();
    assert!(!created);
    assert_eq!(again.target, first);

    let (resized, created) = pool.acquire(&mut backend, 0, &wide).unwrap();
    assert!(created);
    assert_ne!(resized.target, first);
    assert_eq!(backend.destroyed, 1);
    assert!(!backend.live.contains_key(&first));
    assert_eq!(backend.live_count(), 1);

    pool.invalidate_all(&mut backend);
    assert_eq!(backend.live_count(), 0);
    assert_eq!(backend.created, backend.destroyed);
}

#[test]
fn moving_camera_refreshes_faster() {
    let ctx = ctx();
    let mut backend = MockBackend::new();
    let mut preview = PreviewRenderer::new(&CaptureSettings::default());
    let session = CaptureSession::default();
    let mut camera = CameraState::default();
    let start = Instant::now();

    let mut frames = 0;
    for step in 0..20u32 {
        // 0.05 units per 50 ms tick: steady motion, never a cut.
        camera.pose = CameraPose::new(Vec3::new(step as f32 * 0.05, 0.0, 0.0), Quat::IDENTITY);
        let now = start + Duration::from_millis(50) * step;
        if let Some(frame) = preview
            .tick(now, &ctx, &mut backend, &camera, &session)
            .unwrap()
        {
            frames += 1;
            if step > 0 {
                assert_eq!(frame.activity, ActivityClass::Moving);
            }
        }
    }
    // One frame every 100 ms over ~1 s, versus one per second when static.
    assert!(frames >= 9, "only {frames} preview frames");
    assert_eq!(preview.pool().live_count(), 2);

    preview.shutdown(&mut backend);
    assert_eq!(backend.live_count(), 0);
}

#[test]
fn screen_resize_reallocates_preview_targets() {
    let mut ctx = ctx();
    let mut backend = MockBackend::new();
    let mut preview = PreviewRenderer::new(&CaptureSettings::default());
    let session = CaptureSession::default();
    let camera = CameraState::default();
    let start = Instant::now();

    let wide = preview
        .tick(start, &ctx, &mut backend, &camera, &session)
        .unwrap()
        .unwrap();
    assert_eq!((wide.width, wide.height), (480, 270));

    ctx.set_screen_size(ScreenSize::new(1080, 1080));
    preview.request_refresh();
    let square = preview
        .tick(start + Duration::from_millis(1), &ctx, &mut backend, &camera, &session)
        .unwrap()
        .unwrap();
    assert_eq!((square.width, square.height), (270, 270));
    assert!(square.recreated);

    preview.shutdown(&mut backend);
    assert_eq!(backend.live_count(), 0);
}

#[tokio::test]
async fn capture_does_not_disturb_preview_pool() {
    let ctx = ctx();
    let mut backend = MockBackend::new();
    let mut preview = PreviewRenderer::new(&CaptureSettings::default());
    let session = CaptureSession::new(3840);
    let mut camera = CameraState::default();
    let start = Instant::now();

    preview
        .tick(start, &ctx, &mut backend, &camera, &session)
        .unwrap();
    let pooled = preview.last_frame().unwrap().target;

    let mut orchestrator = CaptureOrchestrator::new(PngEncoder::default());
    orchestrator
        .capture(&ctx, &mut backend, &mut camera, &CaptureRequest::new(640))
        .await
        .unwrap();

    assert_eq!(backend.live_count(), 1);
    assert!(backend.live.contains_key(&pooled));
    preview.shutdown(&mut backend);
}
