//! StillShot GPU - capability profiling and render target management
//!
//! Turns capability facts into a budget context, owns the preview target
//! pool, and ships a wgpu implementation of the render backend.

pub mod backend;
pub mod budget;
pub mod capability;
pub mod context;
pub mod format;
pub mod safety;
pub mod texture;
pub mod texture_pool;
pub mod wgpu_backend;

pub use backend::{apply_clear_policy, clear_sequence, ClearFlags, RenderBackend, TargetDesc, TargetId};
pub use budget::BudgetContext;
pub use capability::{
    CapabilityProfile, CapabilitySource, GpuQuirkRule, MatchField, PlatformClass,
    StaticCapabilities, DEFAULT_QUIRKS,
};
pub use context::GpuContext;
pub use format::{FilterMode, TextureFormat};
pub use safety::ResolutionSafetyGuard;
pub use texture::GpuTexture;
pub use texture_pool::{OneShotTarget, PooledTarget, RenderResourcePool, PREVIEW_SLOTS};
pub use wgpu_backend::{EmptyScene, SceneRenderer, SceneTarget, WgpuBackend};
