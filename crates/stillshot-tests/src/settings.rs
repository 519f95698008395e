//! Integration tests for JSON settings and injected capabilities.

use std::io::Write;
use stillshot_capture::PreviewRenderer;
use stillshot_core::{CaptureError, CaptureSettings, ScreenSize};
use stillshot_gpu::{BudgetContext, PlatformClass, StaticCapabilities};

#[test]
fn settings_file_drives_budget_and_preview() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{
            "budget": {{ "gpu": 0.2, "cpu": 0.5 }},
            "preview": {{ "width": 320, "height": 320 }},
            "default_width": 2048
        }}"#
    )
    .unwrap();

    let settings = CaptureSettings::load(file.path()).unwrap();
    assert_eq!(settings.default_width, 2048);
    assert_eq!(settings.scheduler, Default::default());

    let caps = StaticCapabilities::desktop("Synthetic GPU", 1000, 1000);
    let ctx = BudgetContext::from_source(&caps, ScreenSize::new(1920, 1080), settings.budget);
    assert_eq!(ctx.budgets().gpu_bytes, (1000.0 * 1024.0 * 1024.0 * 0.2f64).floor() as u64);

    let preview = PreviewRenderer::new(&settings);
    assert_eq!(preview.frame_size(&ctx), (320, 180));
}

#[test]
fn invalid_settings_are_rejected() {
    let err = CaptureSettings::from_json_str(r#"{ "budget": { "gpu": 0.0, "cpu": 0.4 } }"#)
        .unwrap_err();
    assert!(matches!(err, CaptureError::InvalidSettings(_)));

    let err = CaptureSettings::from_json_str("{ not json").unwrap_err();
    assert!(matches!(err, CaptureError::Serialization(_)));

    let err = CaptureSettings::load(std::path::Path::new("/nonexistent/stillshot.json"))
        .unwrap_err();
    assert!(matches!(err, CaptureError::Io(_)));
}

#[test]
fn capabilities_from_json() {
    let caps: StaticCapabilities = serde_json::from_str(
        r#"{
            "gpu_name": "PowerVR Rogue GE8320",
            "driver_version": "OpenGL ES 3.2 build 1.13",
            "gpu_memory_mb": 1024,
            "system_memory_mb": 3072,
            "max_texture_size": 4096,
            "supported_formats": ["Rgba8Unorm"],
            "platform": "Mobile"
        }"#,
    )
    .unwrap();
    let ctx = BudgetContext::from_source(&caps, ScreenSize::new(2400, 1080), Default::default());
    let profile = ctx.profile();

    assert_eq!(profile.platform_class(), PlatformClass::Mobile);
    assert!(profile.is_problematic());
    assert!(!profile.is_fallback());
    assert_eq!(profile.readback_attempts(), 5);
    assert_eq!(profile.retry_delay_ms(), 20);
    assert!(ctx.max_safe_width() <= 4096);
}
