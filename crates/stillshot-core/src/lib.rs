//! StillShot Core - Foundation types for high-resolution scene capture
//!
//! This crate provides the pure, GPU-independent pieces of the capture
//! pipeline:
//! - Screen, resolution and rectangle geometry
//! - Memory estimation and allocation budgets
//! - Crop and zoom transforms
//! - Camera state and settings

pub mod camera;
pub mod crop;
pub mod error;
pub mod geometry;
pub mod memory;
pub mod settings;
pub mod zoom;

pub use camera::{CameraPose, CameraState};
pub use crop::{CropEdge, CropRegion, CropResolutionCache, NormalizedCrop};
pub use error::{CaptureError, Result};
pub use geometry::{PixelRect, Resolution, ScreenSize, UvRect, MIN_DIMENSION};
pub use memory::{
    format_bytes, BudgetFractions, MemoryBudget, MemoryEstimate, MemoryEstimator, MemoryStatus,
    PlatformMemory,
};
pub use settings::{CaptureSettings, PreviewSettings, SchedulerSettings};
pub use zoom::{Projection, ZoomDirection, ZoomState};
