//! Memory estimation and budgets for high-resolution captures.
//!
//! A capture allocates one color + depth render target on the GPU and one
//! read-back buffer on the CPU. Both scale with the pixel count, so both are
//! quadratic in the requested width for a fixed screen aspect.

use crate::geometry::{Resolution, ScreenSize};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use tracing::debug;

// ── Per-pixel costs ─────────────────────────────────────────────

pub const COLOR_BYTES_PER_PIXEL: u64 = 4;
pub const DEPTH_BYTES_PER_PIXEL: u64 = 4;
pub const CPU_BYTES_PER_PIXEL: u64 = 4;

/// Overhead factor for driver padding and allocation slack.
pub const SAFETY_MULTIPLIER: f64 = 1.15;

/// GPU bytes per pixel including the safety margin.
pub const GPU_COST_PER_PIXEL: f64 =
    (COLOR_BYTES_PER_PIXEL + DEPTH_BYTES_PER_PIXEL) as f64 * SAFETY_MULTIPLIER;

/// CPU bytes per pixel including the safety margin.
pub const CPU_COST_PER_PIXEL: f64 = CPU_BYTES_PER_PIXEL as f64 * SAFETY_MULTIPLIER;

pub const MIB: u64 = 1024 * 1024;

/// Estimates above this share of a budget are reported as near the limit.
pub const NEAR_LIMIT_RATIO: f64 = 0.8;

/// Widths kept in the estimate cache before the least recently used is evicted.
pub const ESTIMATE_CACHE_CAPACITY: usize = 32;

// ── Budget inputs ───────────────────────────────────────────────

/// Share of reported GPU and system memory considered safely allocatable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetFractions {
    pub gpu: f64,
    pub cpu: f64,
}

impl BudgetFractions {
    /// Fractions used when the platform could not report its memory.
    pub const CONSERVATIVE: Self = Self {
        gpu: 0.25,
        cpu: 0.25,
    };
}

impl Default for BudgetFractions {
    fn default() -> Self {
        Self { gpu: 0.4, cpu: 0.4 }
    }
}

/// Memory sizes reported by the platform, in MiB.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlatformMemory {
    pub gpu_mb: u64,
    pub system_mb: u64,
}

// ── Results ─────────────────────────────────────────────────────

/// Byte cost of one capture at a given resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemoryEstimate {
    pub resolution: Resolution,
    /// Color + depth target, with safety margin.
    pub gpu_bytes: u64,
    /// Read-back buffer, with safety margin.
    pub cpu_bytes: u64,
    /// Uncompressed output size, no margin.
    pub raw_bytes: u64,
}

impl MemoryEstimate {
    pub fn for_resolution(resolution: Resolution) -> Self {
        let pixels = resolution.pixels();
        Self {
            resolution,
            gpu_bytes: (pixels as f64 * GPU_COST_PER_PIXEL).ceil() as u64,
            cpu_bytes: (pixels as f64 * CPU_COST_PER_PIXEL).ceil() as u64,
            raw_bytes: pixels * CPU_BYTES_PER_PIXEL,
        }
    }

    /// Whether both byte counts fit inside `budget`.
    pub fn fits(&self, budget: &MemoryBudget) -> bool {
        self.gpu_bytes <= budget.gpu_bytes && self.cpu_bytes <= budget.cpu_bytes
    }
}

/// Allocation ceilings derived from platform memory and budget fractions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemoryBudget {
    pub gpu_bytes: u64,
    pub cpu_bytes: u64,
}

impl MemoryBudget {
    pub fn from_platform(memory: PlatformMemory, fractions: BudgetFractions) -> Self {
        Self {
            gpu_bytes: ((memory.gpu_mb * MIB) as f64 * fractions.gpu).floor() as u64,
            cpu_bytes: ((memory.system_mb * MIB) as f64 * fractions.cpu).floor() as u64,
        }
    }
}

/// How a requested width sits against the budget, for UI warnings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MemoryStatus {
    Safe,
    NearLimit,
    OverBudget,
}

impl MemoryStatus {
    pub fn classify(estimate: &MemoryEstimate, budget: &MemoryBudget) -> Self {
        if !estimate.fits(budget) {
            return Self::OverBudget;
        }
        let share = |used: u64, total: u64| {
            if total == 0 {
                1.0
            } else {
                used as f64 / total as f64
            }
        };
        let worst = share(estimate.gpu_bytes, budget.gpu_bytes)
            .max(share(estimate.cpu_bytes, budget.cpu_bytes));
        if worst > NEAR_LIMIT_RATIO {
            Self::NearLimit
        } else {
            Self::Safe
        }
    }
}

// ── Estimate cache ──────────────────────────────────────────────

/// Width-keyed estimates with least-recently-used eviction.
#[derive(Debug)]
struct EstimateCache {
    entries: HashMap<u32, MemoryEstimate>,
    /// Most recently used last.
    lru_order: VecDeque<u32>,
    capacity: usize,
}

impl EstimateCache {
    fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            lru_order: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    fn get_or_insert_with(&mut self, width: u32, f: impl FnOnce() -> MemoryEstimate) -> MemoryEstimate {
        if let Some(estimate) = self.entries.get(&width).copied() {
            self.lru_order.retain(|&w| w != width);
            self.lru_order.push_back(width);
            return estimate;
        }
        while self.entries.len() >= self.capacity {
            let Some(oldest) = self.lru_order.pop_front() else {
                break;
            };
            self.entries.remove(&oldest);
        }
        let estimate = f();
        self.entries.insert(width, estimate);
        self.lru_order.push_back(width);
        estimate
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.lru_order.clear();
    }
}

// ── Estimator ───────────────────────────────────────────────────

/// Cached estimator for one screen size and platform.
///
/// Estimates are cached by width only, up to [`ESTIMATE_CACHE_CAPACITY`]
/// widths; [`MemoryEstimator::set_screen`] drops them. Budgets are computed lazily and kept until
/// [`MemoryEstimator::invalidate_budgets`].
#[derive(Debug)]
pub struct MemoryEstimator {
    screen: ScreenSize,
    platform: PlatformMemory,
    fractions: BudgetFractions,
    estimates: Mutex<EstimateCache>,
    budgets: Mutex<Option<MemoryBudget>>,
}

impl MemoryEstimator {
    pub fn new(screen: ScreenSize, platform: PlatformMemory, fractions: BudgetFractions) -> Self {
        Self {
            screen,
            platform,
            fractions,
            estimates: Mutex::new(EstimateCache::new(ESTIMATE_CACHE_CAPACITY)),
            budgets: Mutex::new(None),
        }
    }

    pub fn screen(&self) -> ScreenSize {
        self.screen
    }

    pub fn fractions(&self) -> BudgetFractions {
        self.fractions
    }

    /// Change the screen size. Cached estimates are discarded.
    pub fn set_screen(&mut self, screen: ScreenSize) {
        if screen != self.screen {
            debug!(
                "Screen changed {}x{} -> {}x{}, dropping memory estimates",
                self.screen.width, self.screen.height, screen.width, screen.height
            );
            self.screen = screen;
            self.estimates.get_mut().clear();
        }
    }

    /// Estimated cost of capturing at `width` on the current screen.
    pub fn estimate(&self, width: u32) -> MemoryEstimate {
        let screen = self.screen;
        self.estimates
            .lock()
            .get_or_insert_with(width, || {
                MemoryEstimate::for_resolution(Resolution::from_width(width, screen))
            })
    }

    /// Number of widths currently cached.
    pub fn cached_estimates(&self) -> usize {
        self.estimates.lock().len()
    }

    /// Current allocation ceilings.
    pub fn budgets(&self) -> MemoryBudget {
        *self.budgets.lock().get_or_insert_with(|| {
            let budget = MemoryBudget::from_platform(self.platform, self.fractions);
            debug!(
                "Memory budget: GPU {} / CPU {}",
                format_bytes(budget.gpu_bytes),
                format_bytes(budget.cpu_bytes)
            );
            budget
        })
    }

    pub fn invalidate_budgets(&self) {
        *self.budgets.lock() = None;
    }

    /// Budget classification of a capture at `width`.
    pub fn status(&self, width: u32) -> MemoryStatus {
        MemoryStatus::classify(&self.estimate(width), &self.budgets())
    }

    /// Uncompressed output size for a capture at `width`.
    pub fn output_size(&self, width: u32) -> u64 {
        self.estimate(width).raw_bytes
    }
}

/// Human-readable byte count using binary units.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}
