//! Largest capture width that stays inside the memory budget.
//!
//! GPU and CPU cost are both quadratic in width (`pixels = width² × aspect`),
//! so the ceiling has a closed form. Height rounding makes the closed form
//! off by a pixel or two; a short walk against the real estimator settles
//! the exact boundary.

use parking_lot::Mutex;
use stillshot_core::memory::{CPU_COST_PER_PIXEL, GPU_COST_PER_PIXEL};
use stillshot_core::{MemoryBudget, MemoryEstimator, ScreenSize, MIN_DIMENSION};
use tracing::debug;

/// Caches the safe width per screen size and budget.
#[derive(Debug)]
pub struct ResolutionSafetyGuard {
    max_texture_size: u32,
    cache: Mutex<Option<CachedWidth>>,
}

#[derive(Debug, Clone, Copy)]
struct CachedWidth {
    screen: ScreenSize,
    budget: MemoryBudget,
    width: u32,
}

impl ResolutionSafetyGuard {
    pub fn new(max_texture_size: u32) -> Self {
        Self {
            max_texture_size: max_texture_size.max(MIN_DIMENSION),
            cache: Mutex::new(None),
        }
    }

    /// Largest width whose estimate fits both budgets, clamped to
    /// `[MIN_DIMENSION, max texture size]`.
    ///
    /// A screen or budget change since the last call always re-derives.
    pub fn max_safe_width(&self, estimator: &MemoryEstimator) -> u32 {
        let screen = estimator.screen();
        let budget = estimator.budgets();

        let mut cache = self.cache.lock();
        if let Some(cached) = *cache {
            if cached.screen == screen && cached.budget == budget {
                return cached.width;
            }
        }

        let width = self.solve(estimator, screen, &budget);
        debug!(
            "Max safe width for {}x{} screen: {}",
            screen.width, screen.height, width
        );
        *cache = Some(CachedWidth {
            screen,
            budget,
            width,
        });
        width
    }

    /// Clamp a requested width to the safe range.
    pub fn clamp(&self, requested: u32, estimator: &MemoryEstimator) -> u32 {
        requested.clamp(MIN_DIMENSION, self.max_safe_width(estimator))
    }

    pub fn invalidate(&self) {
        *self.cache.lock() = None;
    }

    /// Upper width bound from the texture size limit on both axes.
    fn texture_limit(&self, screen: ScreenSize) -> u32 {
        let aspect = screen.aspect();
        let by_height = if aspect > 1.0 {
            (self.max_texture_size as f64 / aspect).floor() as u32
        } else {
            self.max_texture_size
        };
        by_height.min(self.max_texture_size).max(MIN_DIMENSION)
    }

    fn solve(&self, estimator: &MemoryEstimator, screen: ScreenSize, budget: &MemoryBudget) -> u32 {
        let aspect = screen.aspect();
        let gpu_width = (budget.gpu_bytes as f64 / (GPU_COST_PER_PIXEL * aspect)).sqrt();
        let cpu_width = (budget.cpu_bytes as f64 / (CPU_COST_PER_PIXEL * aspect)).sqrt();
        let closed_form = gpu_width.min(cpu_width).floor().min(u32::MAX as f64) as u32;

        let upper = self.texture_limit(screen);
        let mut width = closed_form.clamp(MIN_DIMENSION, upper);

        while width > MIN_DIMENSION && !estimator.estimate(width).fits(budget) {
            width -= 1;
        }
        while width < upper && estimator.estimate(width + 1).fits(budget) {
            width += 1;
        }
        width
    }
}
