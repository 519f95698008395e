//! Explicit context for process-wide capture facts.
//!
//! Capability profile, memory budgets and the safe width are computed once
//! and read many times. They live in one value the host constructs and
//! passes to the capture and preview paths, so tests can hand in synthetic
//! GPUs without touching real hardware.

use crate::capability::{CapabilityProfile, CapabilitySource};
use crate::format::TextureFormat;
use crate::safety::ResolutionSafetyGuard;
use stillshot_core::memory::{COLOR_BYTES_PER_PIXEL, SAFETY_MULTIPLIER};
use stillshot_core::{
    BudgetFractions, MemoryBudget, MemoryEstimate, MemoryEstimator, MemoryStatus, Resolution,
    ScreenSize, MIN_DIMENSION,
};
use tracing::{info, warn};

/// Capability profile plus the memory estimator and safety guard built from it.
#[derive(Debug)]
pub struct BudgetContext {
    profile: CapabilityProfile,
    estimator: MemoryEstimator,
    guard: ResolutionSafetyGuard,
}

impl BudgetContext {
    /// Build a context from an already-computed profile.
    ///
    /// When the profile relied on fallback data the budget fractions are
    /// lowered to [`BudgetFractions::CONSERVATIVE`].
    pub fn new(profile: CapabilityProfile, screen: ScreenSize, fractions: BudgetFractions) -> Self {
        let fractions = if profile.is_fallback() {
            warn!("Using conservative memory budget fractions");
            BudgetFractions {
                gpu: fractions.gpu.min(BudgetFractions::CONSERVATIVE.gpu),
                cpu: fractions.cpu.min(BudgetFractions::CONSERVATIVE.cpu),
            }
        } else {
            fractions
        };
        let estimator = MemoryEstimator::new(screen, profile.memory(), fractions);
        let guard = ResolutionSafetyGuard::new(profile.max_texture_size());
        Self {
            profile,
            estimator,
            guard,
        }
    }

    /// Query a capability source once and build the context from it.
    pub fn from_source(
        source: &dyn CapabilitySource,
        screen: ScreenSize,
        fractions: BudgetFractions,
    ) -> Self {
        Self::new(CapabilityProfile::from_source(source), screen, fractions)
    }

    pub fn profile(&self) -> &CapabilityProfile {
        &self.profile
    }

    pub fn estimator(&self) -> &MemoryEstimator {
        &self.estimator
    }

    pub fn screen(&self) -> ScreenSize {
        self.estimator.screen()
    }

    /// Update the screen size; width-keyed caches are dropped.
    pub fn set_screen_size(&mut self, screen: ScreenSize) {
        self.estimator.set_screen(screen);
        self.guard.invalidate();
    }

    pub fn estimate_memory(&self, width: u32) -> MemoryEstimate {
        self.estimator.estimate(width)
    }

    pub fn budgets(&self) -> MemoryBudget {
        self.estimator.budgets()
    }

    pub fn max_safe_width(&self) -> u32 {
        self.guard.max_safe_width(&self.estimator)
    }

    pub fn memory_status(&self, width: u32) -> MemoryStatus {
        self.estimator.status(width)
    }

    /// Requested width clamped to the safe ceiling.
    pub fn clamp_width(&self, requested: u32) -> u32 {
        let width = self.guard.clamp(requested, &self.estimator);
        if width < requested {
            info!("Clamped capture width {} -> {}", requested, width);
        }
        width
    }

    /// Resolution a capture at `requested` width will actually use.
    pub fn capture_resolution(&self, requested: u32) -> Resolution {
        Resolution::from_width(self.clamp_width(requested), self.screen())
    }

    /// Whether a capture target of `format` still fits the GPU budget.
    ///
    /// Estimates assume 8-bit color; wider formats pay for the extra color
    /// bytes on top.
    pub fn render_format_fits(&self, resolution: Resolution, format: TextureFormat) -> bool {
        let extra = u64::from(format.bytes_per_pixel()).saturating_sub(COLOR_BYTES_PER_PIXEL);
        if extra == 0 {
            return true;
        }
        let base = MemoryEstimate::for_resolution(resolution);
        let extra_bytes = (resolution.pixels() as f64 * extra as f64 * SAFETY_MULTIPLIER).ceil() as u64;
        base.gpu_bytes.saturating_add(extra_bytes) <= self.budgets().gpu_bytes
    }

    /// Largest preview size with the screen aspect that fits inside a box.
    pub fn fit_preview(&self, box_width: u32, box_height: u32) -> (u32, u32) {
        let aspect = self.screen().aspect();
        let box_width = box_width.max(MIN_DIMENSION);
        let box_height = box_height.max(MIN_DIMENSION);
        let height_for_width = (box_width as f64 * aspect).round() as u32;
        if height_for_width <= box_height {
            (box_width, height_for_width.max(MIN_DIMENSION))
        } else {
            let width = (box_height as f64 / aspect).round() as u32;
            (width.clamp(MIN_DIMENSION, box_width), box_height)
        }
    }
}
