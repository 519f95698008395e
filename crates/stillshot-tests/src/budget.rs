//! Integration tests for budgets and the safe-width ceiling.

use stillshot_core::{BudgetFractions, MemoryStatus, Resolution, ScreenSize};
use stillshot_gpu::{BudgetContext, PlatformClass, StaticCapabilities};

fn synthetic(gpu_mb: u64, system_mb: u64, max_texture: u32) -> StaticCapabilities {
    StaticCapabilities {
        max_texture_size: Some(max_texture),
        ..StaticCapabilities::desktop("Synthetic GPU", gpu_mb, system_mb)
    }
}

fn context(caps: &StaticCapabilities, screen: ScreenSize) -> BudgetContext {
    BudgetContext::from_source(caps, screen, BudgetFractions::default())
}

#[test]
fn clamp_scenario_2gb_gpu() {
    let ctx = context(&synthetic(2048, 4096, 2600), ScreenSize::new(1920, 1080));
    assert_eq!(ctx.max_safe_width(), 2600);
    assert_eq!(ctx.clamp_width(3840), 2600);
    assert_eq!(
        ctx.capture_resolution(3840),
        Resolution {
            width: 2600,
            height: 1463
        }
    );
}

#[test]
fn max_safe_width_sits_on_the_boundary() {
    let screens = [
        ScreenSize::new(1920, 1080),
        ScreenSize::new(2560, 1440),
        ScreenSize::new(1080, 1920),
        ScreenSize::new(1000, 999),
    ];
    let budgets = [(64, 256), (256, 64), (512, 2048), (1024, 1024)];

    for screen in screens {
        for (gpu_mb, system_mb) in budgets {
            let ctx = context(&synthetic(gpu_mb, system_mb, 1 << 20), screen);
            let max = ctx.max_safe_width();
            let limit = ctx.budgets();
            assert!(
                ctx.estimate_memory(max).fits(&limit),
                "{screen:?} {gpu_mb}/{system_mb}: {max} should fit"
            );
            assert!(
                !ctx.estimate_memory(max + 1).fits(&limit),
                "{screen:?} {gpu_mb}/{system_mb}: {} should not fit",
                max + 1
            );
        }
    }
}

#[test]
fn portrait_screen_respects_texture_height() {
    let ctx = context(&synthetic(16384, 65536, 4096), ScreenSize::new(1080, 1920));
    let resolution = ctx.capture_resolution(8000);
    assert!(resolution.height <= 4096);
    assert!(resolution.width < 4096);
}

#[test]
fn missing_capabilities_fall_back_conservatively() {
    let caps = StaticCapabilities {
        gpu_name: Some("Unknown".into()),
        platform: PlatformClass::Desktop,
        ..Default::default()
    };
    let ctx = context(&caps, ScreenSize::new(1920, 1080));

    assert!(ctx.profile().is_fallback());
    assert_eq!(ctx.profile().max_texture_size(), 4096);
    assert_eq!(ctx.estimator().fractions(), BudgetFractions::CONSERVATIVE);
    // 512 MB * 0.25 bounds the GPU side.
    assert_eq!(ctx.budgets().gpu_bytes, 128 * 1024 * 1024);
    assert!(ctx.max_safe_width() <= 4096);
}

#[test]
fn memory_status_tracks_width() {
    let ctx = context(&synthetic(256, 1024, 16384), ScreenSize::new(1920, 1080));
    let max = ctx.max_safe_width();
    assert_eq!(ctx.memory_status(max / 4), MemoryStatus::Safe);
    assert_eq!(ctx.memory_status(max), MemoryStatus::NearLimit);
    assert_eq!(ctx.memory_status(max * 2), MemoryStatus::OverBudget);
}

#[test]
fn screen_change_rederives_ceiling() {
    let mut ctx = context(&synthetic(128, 512, 16384), ScreenSize::new(1920, 1080));
    let wide = ctx.max_safe_width();
    ctx.set_screen_size(ScreenSize::new(1080, 1080));
    let square = ctx.max_safe_width();
    assert!(square < wide);
    assert!(ctx.estimate_memory(square).fits(&ctx.budgets()));
}
