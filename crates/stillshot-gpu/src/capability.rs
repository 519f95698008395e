//! GPU capability profiling.
//!
//! The capability source is queried once; everything the capture path needs
//! (quirk flags, formats, retry policy, memory sizes) is derived up front and
//! kept in an immutable [`CapabilityProfile`].
//!
//! Quirk detection is a best-effort substring match against a rule table.
//! It has not been verified against real driver behavior, so the table is
//! data the caller can replace rather than logic baked into control flow.

use crate::format::TextureFormat;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::borrow::Cow;
use stillshot_core::{CaptureError, PlatformMemory};
use tracing::{debug, warn};

// ── Local domain constants ──────────────────────────────────────

/// Substituted when the source reports no GPU memory.
pub const FALLBACK_GPU_MEMORY_MB: u64 = 512;
/// Substituted when the source reports no system memory.
pub const FALLBACK_SYSTEM_MEMORY_MB: u64 = 2048;
/// Substituted when the source reports no texture size limit.
pub const FALLBACK_MAX_TEXTURE_SIZE: u32 = 4096;

/// Driver/API version fragments that indicate a legacy graphics API.
pub const LEGACY_API_SIGNATURES: [&str; 4] = ["opengl es 2", "opengl 2.", "direct3d 9", "webgl 1"];

const GUARANTEED_FORMAT: TextureFormat = TextureFormat::Rgba8Unorm;
const RENDER_FORMAT_PREFERENCE: [TextureFormat; 3] = [
    TextureFormat::Rgba16Float,
    TextureFormat::Rgba8UnormSrgb,
    TextureFormat::Bgra8Unorm,
];
const READ_FORMAT_PREFERENCE: [TextureFormat; 2] =
    [TextureFormat::Rgba8Unorm, TextureFormat::Bgra8Unorm];
const MOBILE_FORMAT: TextureFormat = TextureFormat::Rgba8Unorm;

const MOBILE_RETRY_COUNT: u32 = 5;
const PROBLEMATIC_RETRY_COUNT: u32 = 3;
const MOBILE_RETRY_DELAY_MS: u32 = 20;
const DEFAULT_RETRY_DELAY_MS: u32 = 10;

// ── Source ──────────────────────────────────────────────────────

/// Broad platform family the host runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PlatformClass {
    #[default]
    Desktop,
    Mobile,
    Web,
}

/// Reports installed GPU and platform facts.
///
/// `None` means the platform could not tell; the profile then assumes
/// conservative defaults.
pub trait CapabilitySource {
    fn gpu_name(&self) -> Option<String>;
    fn driver_version(&self) -> Option<String>;
    fn gpu_memory_mb(&self) -> Option<u64>;
    fn system_memory_mb(&self) -> Option<u64>;
    fn max_texture_size(&self) -> Option<u32>;
    fn supports_format(&self, format: TextureFormat) -> bool;
    fn platform_class(&self) -> PlatformClass;
}

/// Fixed capability facts, e.g. loaded from JSON or built in tests.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticCapabilities {
    pub gpu_name: Option<String>,
    pub driver_version: Option<String>,
    pub gpu_memory_mb: Option<u64>,
    pub system_memory_mb: Option<u64>,
    pub max_texture_size: Option<u32>,
    pub supported_formats: Vec<TextureFormat>,
    pub platform: PlatformClass,
}

impl StaticCapabilities {
    /// A desktop GPU supporting every format.
    pub fn desktop(gpu_name: &str, gpu_memory_mb: u64, system_memory_mb: u64) -> Self {
        Self {
            gpu_name: Some(gpu_name.to_string()),
            driver_version: Some("Vulkan 1.3".to_string()),
            gpu_memory_mb: Some(gpu_memory_mb),
            system_memory_mb: Some(system_memory_mb),
            max_texture_size: Some(16384),
            supported_formats: vec![
                TextureFormat::Rgba16Float,
                TextureFormat::Rgba8UnormSrgb,
                TextureFormat::Rgba8Unorm,
                TextureFormat::Bgra8Unorm,
            ],
            platform: PlatformClass::Desktop,
        }
    }
}

impl CapabilitySource for StaticCapabilities {
    fn gpu_name(&self) -> Option<String> {
        self.gpu_name.clone()
    }

    fn driver_version(&self) -> Option<String> {
        self.driver_version.clone()
    }

    fn gpu_memory_mb(&self) -> Option<u64> {
        self.gpu_memory_mb
    }

    fn system_memory_mb(&self) -> Option<u64> {
        self.system_memory_mb
    }

    fn max_texture_size(&self) -> Option<u32> {
        self.max_texture_size
    }

    fn supports_format(&self, format: TextureFormat) -> bool {
        self.supported_formats.contains(&format)
    }

    fn platform_class(&self) -> PlatformClass {
        self.platform
    }
}

// ── Quirk table ─────────────────────────────────────────────────

/// Which reported string a quirk pattern is matched against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchField {
    Name,
    Driver,
    Any,
}

/// One row of the quirk table. Patterns match case-insensitively as substrings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GpuQuirkRule {
    pub pattern: Cow<'static, str>,
    pub field: MatchField,
    pub problematic: bool,
    pub multiple_clear: bool,
    pub retry_delay_ms: Option<u32>,
}

impl GpuQuirkRule {
    const fn new(
        pattern: &'static str,
        field: MatchField,
        problematic: bool,
        multiple_clear: bool,
        retry_delay_ms: Option<u32>,
    ) -> Self {
        Self {
            pattern: Cow::Borrowed(pattern),
            field,
            problematic,
            multiple_clear,
            retry_delay_ms,
        }
    }

    /// Whether this rule applies to already-lowercased name/driver strings.
    pub fn matches(&self, name: &str, driver: &str) -> bool {
        let pattern = self.pattern.to_lowercase();
        match self.field {
            MatchField::Name => name.contains(&pattern),
            MatchField::Driver => driver.contains(&pattern),
            MatchField::Any => name.contains(&pattern) || driver.contains(&pattern),
        }
    }
}

/// Built-in quirk table: mobile families, tile-based and software renderers,
/// legacy APIs, plus a vendor retry-delay quirk.
pub const DEFAULT_QUIRKS: &[GpuQuirkRule] = &[
    GpuQuirkRule::new("adreno", MatchField::Name, true, true, None),
    GpuQuirkRule::new("mali", MatchField::Name, true, true, None),
    GpuQuirkRule::new("powervr", MatchField::Name, true, false, None),
    GpuQuirkRule::new("tegra", MatchField::Name, true, false, None),
    GpuQuirkRule::new("videocore", MatchField::Name, true, false, None),
    GpuQuirkRule::new("llvmpipe", MatchField::Name, true, false, None),
    GpuQuirkRule::new("swiftshader", MatchField::Name, true, false, None),
    GpuQuirkRule::new("microsoft basic render", MatchField::Name, true, false, None),
    GpuQuirkRule::new("intel(r) hd graphics", MatchField::Name, true, false, Some(15)),
    GpuQuirkRule::new("intel", MatchField::Name, false, false, Some(15)),
    GpuQuirkRule::new("opengl es 2", MatchField::Driver, true, true, None),
    GpuQuirkRule::new("opengl 2.", MatchField::Driver, true, false, None),
    GpuQuirkRule::new("direct3d 9", MatchField::Driver, true, false, None),
    GpuQuirkRule::new("webgl 1", MatchField::Driver, true, false, None),
];

/// Accumulated result of matching the quirk table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QuirkFlags {
    pub problematic: bool,
    pub multiple_clear: bool,
    pub retry_delay_ms: Option<u32>,
}

/// Match every rule against the GPU name and driver version.
pub fn match_quirks(rules: &[GpuQuirkRule], gpu_name: &str, driver_version: &str) -> QuirkFlags {
    let name = gpu_name.to_lowercase();
    let driver = driver_version.to_lowercase();
    rules
        .iter()
        .filter(|rule| rule.matches(&name, &driver))
        .fold(QuirkFlags::default(), |acc, rule| QuirkFlags {
            problematic: acc.problematic || rule.problematic,
            multiple_clear: acc.multiple_clear || rule.multiple_clear,
            retry_delay_ms: acc.retry_delay_ms.or(rule.retry_delay_ms),
        })
}

// ── Profile ─────────────────────────────────────────────────────

/// Derived GPU facts, computed once per process from a [`CapabilitySource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityProfile {
    gpu_name: String,
    driver_version: String,
    platform: PlatformClass,
    quirks: QuirkFlags,
    supports_advanced_formats: bool,
    memory: PlatformMemory,
    max_texture_size: u32,
    render_formats: SmallVec<[TextureFormat; 4]>,
    read_format: TextureFormat,
    fallback: bool,
}

impl CapabilityProfile {
    /// Build a profile using [`DEFAULT_QUIRKS`].
    pub fn from_source(source: &dyn CapabilitySource) -> Self {
        Self::with_rules(source, DEFAULT_QUIRKS)
    }

    /// Build a profile with a caller-supplied quirk table.
    pub fn with_rules(source: &dyn CapabilitySource, rules: &[GpuQuirkRule]) -> Self {
        let gpu_name = source.gpu_name().unwrap_or_default();
        let driver_version = source.driver_version().unwrap_or_default();
        let platform = source.platform_class();
        let quirks = match_quirks(rules, &gpu_name, &driver_version);

        let mut missing = Vec::new();
        let gpu_mb = positive(source.gpu_memory_mb()).unwrap_or_else(|| {
            missing.push("gpu memory");
            FALLBACK_GPU_MEMORY_MB
        });
        let system_mb = positive(source.system_memory_mb()).unwrap_or_else(|| {
            missing.push("system memory");
            FALLBACK_SYSTEM_MEMORY_MB
        });
        let max_texture_size = positive(source.max_texture_size()).unwrap_or_else(|| {
            missing.push("max texture size");
            FALLBACK_MAX_TEXTURE_SIZE
        });
        let fallback = !missing.is_empty();
        if fallback {
            let err = CaptureError::CapabilityUnavailable(missing.join(", "));
            warn!("{err}; assuming conservative defaults");
        }

        let mut render_formats = select_formats(source, platform, &RENDER_FORMAT_PREFERENCE);
        if quirks.problematic {
            render_formats.retain(|f| f.is_8bit());
        }
        let read_format = select_formats(source, platform, &READ_FORMAT_PREFERENCE)[0];

        let profile = Self {
            supports_advanced_formats: source.supports_format(TextureFormat::Rgba16Float),
            gpu_name,
            driver_version,
            platform,
            quirks,
            memory: PlatformMemory {
                gpu_mb,
                system_mb,
            },
            max_texture_size,
            render_formats,
            read_format,
            fallback,
        };
        debug!(
            "GPU profile: '{}' ({}) platform={:?} problematic={} multi_clear={}",
            profile.gpu_name,
            profile.driver_version,
            profile.platform,
            profile.quirks.problematic,
            profile.quirks.multiple_clear
        );
        profile
    }

    pub fn gpu_name(&self) -> &str {
        &self.gpu_name
    }

    pub fn driver_version(&self) -> &str {
        &self.driver_version
    }

    pub fn platform_class(&self) -> PlatformClass {
        self.platform
    }

    /// GPU matched the problematic denylist. Heuristic; false hits are expected.
    pub fn is_problematic(&self) -> bool {
        self.quirks.problematic
    }

    /// Single-pass clears are unreliable on this GPU/API.
    pub fn requires_multiple_clear(&self) -> bool {
        self.quirks.multiple_clear
    }

    pub fn supports_advanced_formats(&self) -> bool {
        self.supports_advanced_formats
    }

    /// Memory sizes, with fallbacks substituted.
    pub fn memory(&self) -> PlatformMemory {
        self.memory
    }

    pub fn max_texture_size(&self) -> u32 {
        self.max_texture_size
    }

    /// Whether any fact was missing and replaced by a conservative default.
    pub fn is_fallback(&self) -> bool {
        self.fallback
    }

    /// Highest-fidelity format for the capture render target.
    pub fn optimal_render_format(&self) -> TextureFormat {
        self.render_formats[0]
    }

    /// Supported render formats, best first, ending in the guaranteed default.
    pub fn render_format_chain(&self) -> &[TextureFormat] {
        &self.render_formats
    }

    /// Format for pixel read-back.
    pub fn optimal_read_format(&self) -> TextureFormat {
        self.read_format
    }

    /// Format for pooled preview targets.
    pub fn preview_format(&self) -> TextureFormat {
        if self.supports_advanced_formats
            && !self.quirks.problematic
            && self.platform == PlatformClass::Desktop
        {
            TextureFormat::Rgba16Float
        } else {
            self.render_formats
                .iter()
                .copied()
                .find(|f| f.is_8bit())
                .unwrap_or(GUARANTEED_FORMAT)
        }
    }

    /// Read-back attempts when the retry policy applies.
    pub fn retry_count(&self) -> u32 {
        if self.platform == PlatformClass::Mobile {
            MOBILE_RETRY_COUNT
        } else if self.quirks.problematic {
            PROBLEMATIC_RETRY_COUNT
        } else {
            1
        }
    }

    /// Cooperative delay between read-back attempts, in milliseconds.
    pub fn retry_delay_ms(&self) -> u32 {
        if self.platform == PlatformClass::Mobile {
            MOBILE_RETRY_DELAY_MS
        } else {
            self.quirks.retry_delay_ms.unwrap_or(DEFAULT_RETRY_DELAY_MS)
        }
    }

    /// Whether read-back should be retried on this GPU at all.
    pub fn retries_pixel_read(&self) -> bool {
        let driver = self.driver_version.to_lowercase();
        self.quirks.problematic
            || self.platform == PlatformClass::Mobile
            || LEGACY_API_SIGNATURES.iter().any(|sig| driver.contains(sig))
    }

    /// Total read-back attempts before declaring failure.
    pub fn readback_attempts(&self) -> u32 {
        if self.retries_pixel_read() {
            self.retry_count()
        } else {
            1
        }
    }
}

fn positive<T: PartialOrd + Default>(value: Option<T>) -> Option<T> {
    value.filter(|v| *v > T::default())
}

/// Platform-first, then capability-first format selection.
fn select_formats(
    source: &dyn CapabilitySource,
    platform: PlatformClass,
    preference: &[TextureFormat],
) -> SmallVec<[TextureFormat; 4]> {
    let mut chain = SmallVec::new();
    if platform == PlatformClass::Mobile {
        chain.push(MOBILE_FORMAT);
        return chain;
    }
    chain.extend(
        preference
            .iter()
            .copied()
            .filter(|f| source.supports_format(*f)),
    );
    if !chain.contains(&GUARANTEED_FORMAT) {
        chain.push(GUARANTEED_FORMAT);
    }
    chain
}
