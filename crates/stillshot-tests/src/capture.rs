//! Integration tests for full-resolution capture.

use crate::mock::{MockBackend, SCENE_RGBA};
use stillshot_capture::{
    CaptureOrchestrator, CapturePhase, CaptureRequest, CaptureSession, DirectoryStorage,
    ImageEncoder, PngEncoder, RetryTimer,
};
use stillshot_core::{
    BudgetFractions, CameraState, CaptureError, CropEdge, CropRegion, Projection, ScreenSize,
    ZoomState,
};
use stillshot_gpu::{BudgetContext, PlatformClass, StaticCapabilities, TextureFormat};
use std::future::Future;
use std::time::Duration;

/// Timer that returns immediately so retry tests don't wait on the clock.
struct InstantTimer;

impl RetryTimer for InstantTimer {
    fn sleep(&self, _duration: Duration) -> impl Future<Output = ()> {
        std::future::ready(())
    }
}

fn synthetic_ctx() -> BudgetContext {
    let caps = StaticCapabilities {
        max_texture_size: Some(2600),
        ..StaticCapabilities::desktop("Synthetic GPU", 2048, 4096)
    };
    BudgetContext::from_source(&caps, ScreenSize::new(1920, 1080), BudgetFractions::default())
}

fn host_camera() -> CameraState {
    CameraState {
        projection: Projection::Perspective { fov_degrees: 60.0 },
        anti_aliasing: 8,
        clear_color: [0.1, 0.1, 0.1, 1.0],
        ..Default::default()
    }
}

fn decode(bytes: &[u8]) -> image::RgbaImage {
    image::load_from_memory(bytes).unwrap().to_rgba8()
}

#[tokio::test]
async fn capture_above_native_is_clamped() {
    let ctx = synthetic_ctx();
    let mut backend = MockBackend::new();
    let mut camera = host_camera();
    let mut orchestrator = CaptureOrchestrator::new(PngEncoder::default());

    let output = orchestrator
        .capture(&ctx, &mut backend, &mut camera, &CaptureRequest::new(3840))
        .await
        .unwrap();

    assert!(output.was_clamped());
    assert_eq!((output.width, output.height), (2600, 1463));
    let image = decode(&output.bytes);
    assert_eq!(image.dimensions(), (2600, 1463));
    assert_eq!(image.get_pixel(1300, 700).0, SCENE_RGBA);

    assert_eq!(backend.live_count(), 0);
    assert_eq!(camera, host_camera());
    assert_eq!(orchestrator.phase(), CapturePhase::Idle);
}

#[tokio::test]
async fn memory_budget_bounds_the_capture() {
    // 64 MB of GPU memory binds long before the 16384 texture limit.
    let caps = StaticCapabilities::desktop("Budget GPU", 64, 4096);
    let ctx = BudgetContext::from_source(&caps, ScreenSize::new(1920, 1080), BudgetFractions::default());
    let max = ctx.max_safe_width();
    assert!(max < 3840 && max < caps.max_texture_size.unwrap());

    let mut backend = MockBackend::new();
    let mut camera = host_camera();
    let mut orchestrator = CaptureOrchestrator::new(PngEncoder::default());

    let output = orchestrator
        .capture(&ctx, &mut backend, &mut camera, &CaptureRequest::new(3840))
        .await
        .unwrap();

    assert!(output.was_clamped());
    assert_eq!(output.width, max);
    assert!(ctx.estimate_memory(output.width).fits(&ctx.budgets()));
    assert!(!ctx.estimate_memory(output.width + 1).fits(&ctx.budgets()));
    // No headroom for half-float at the ceiling.
    assert_eq!(backend.formats, vec![TextureFormat::Rgba8UnormSrgb]);
    assert_eq!(backend.live_count(), 0);
    assert_eq!(camera, host_camera());
}

#[tokio::test]
async fn roomy_budget_renders_half_float() {
    let ctx = synthetic_ctx();
    let mut backend = MockBackend::new();
    let mut camera = host_camera();
    let mut orchestrator = CaptureOrchestrator::new(PngEncoder::default());

    let output = orchestrator
        .capture(&ctx, &mut backend, &mut camera, &CaptureRequest::new(1920))
        .await
        .unwrap();

    assert_eq!(backend.formats, vec![TextureFormat::Rgba16Float]);
    let image = decode(&output.bytes);
    assert_eq!(image.get_pixel(0, 0).0, SCENE_RGBA);
}

#[tokio::test]
async fn session_crop_and_zoom_reach_the_backend() {
    let ctx = synthetic_ctx();
    let mut backend = MockBackend::new();
    let mut camera = host_camera();
    let mut orchestrator = CaptureOrchestrator::new(PngEncoder::default());

    let mut session = CaptureSession::new(1000);
    session.set_crop_edge(CropEdge::Left, 10.0);
    session.set_crop_edge(CropEdge::Right, 10.0);
    session.set_zoom_level(2f32.ln());
    let expected = session.output_resolution(&ctx);

    let output = orchestrator
        .capture(&ctx, &mut backend, &mut camera, &session.request())
        .await
        .unwrap();

    assert_eq!((output.width, output.height), expected);
    assert_eq!(expected, (800, 563));
    let (_, rendered) = backend.renders[0];
    assert_eq!(rendered.anti_aliasing, 1);
    assert!(!rendered.is_orthographic());
    assert!((rendered.projection.value() - 30.0).abs() < 1e-3);
    assert_eq!(camera, host_camera());
}

#[test]
fn cropped_resolution_scenario() {
    let crop = CropRegion::new(10.0, 0.0, 10.0, 0.0).normalize();
    assert_eq!(crop.cropped_resolution(1000, 800), (800, 800));
}

#[tokio::test]
async fn allocation_failure_restores_everything() {
    let ctx = synthetic_ctx();
    let mut backend = MockBackend::new().with_max_width(1024);
    let mut camera = host_camera();
    let mut orchestrator = CaptureOrchestrator::new(PngEncoder::default());

    let err = orchestrator
        .capture(&ctx, &mut backend, &mut camera, &CaptureRequest::new(2048))
        .await
        .unwrap_err();

    assert!(matches!(err, CaptureError::AllocationFailure { width: 2048, .. }));
    assert!(backend.renders.is_empty());
    assert_eq!(backend.live_count(), 0);
    assert_eq!(backend.released, 1);
    assert_eq!(camera, host_camera());
    assert_eq!(orchestrator.phase(), CapturePhase::Failed);

    // The orchestrator accepts the next request after a failure.
    let output = orchestrator
        .capture(&ctx, &mut backend, &mut camera, &CaptureRequest::new(1024))
        .await
        .unwrap();
    assert_eq!(output.width, 1024);
    assert_eq!(orchestrator.phase(), CapturePhase::Idle);
}

#[tokio::test]
async fn problematic_gpu_retries_then_fails() {
    let caps = StaticCapabilities {
        driver_version: Some("OpenGL ES 2.0 build 1.13".into()),
        ..StaticCapabilities::desktop("Generic", 2048, 4096)
    };
    let ctx = BudgetContext::from_source(&caps, ScreenSize::new(640, 360), BudgetFractions::default());
    assert_eq!(ctx.profile().readback_attempts(), 3);

    let mut backend = MockBackend::new().with_failing_reads(100);
    let mut camera = host_camera();
    let mut orchestrator = CaptureOrchestrator::with_timer(PngEncoder::default(), InstantTimer);

    let err = orchestrator
        .capture(&ctx, &mut backend, &mut camera, &CaptureRequest::new(640))
        .await
        .unwrap_err();

    assert!(matches!(err, CaptureError::ReadbackFailure { attempts: 3, .. }));
    assert_eq!(backend.reads.len(), 3);
    assert_eq!(backend.live_count(), 0);
    assert_eq!(camera, host_camera());
}

#[tokio::test]
async fn mobile_retry_waits_between_attempts() {
    let caps = StaticCapabilities {
        platform: PlatformClass::Mobile,
        ..StaticCapabilities::desktop("Mali-G710", 4096, 8192)
    };
    let ctx = BudgetContext::from_source(&caps, ScreenSize::new(640, 360), BudgetFractions::default());

    let mut backend = MockBackend::new().with_failing_reads(2);
    let mut camera = host_camera();
    let mut orchestrator = CaptureOrchestrator::new(PngEncoder::default());

    let started = std::time::Instant::now();
    let output = orchestrator
        .capture(&ctx, &mut backend, &mut camera, &CaptureRequest::new(320))
        .await
        .unwrap();

    assert_eq!(output.attempts, 3);
    assert!(started.elapsed() >= Duration::from_millis(40));
}

#[tokio::test]
async fn capture_lands_in_directory_storage() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = synthetic_ctx();
    let mut backend = MockBackend::new();
    let mut camera = host_camera();
    let mut orchestrator = CaptureOrchestrator::new(PngEncoder::default());
    let storage =
        DirectoryStorage::new(dir.path()).with_extension(orchestrator.encoder().extension());

    let request = CaptureRequest::new(256)
        .with_zoom(ZoomState::from_factor(0.5))
        .with_name("overview");
    let output = orchestrator
        .capture(&ctx, &mut backend, &mut camera, &request)
        .await
        .unwrap();
    let path = output.store(&storage).unwrap();

    assert_eq!(path, dir.path().join("overview.png"));
    let image = decode(&std::fs::read(&path).unwrap());
    assert_eq!(image.dimensions(), (256, 144));
}
