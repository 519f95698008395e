//! Zoom transform.
//!
//! The UI stores an unbounded zoom *level*; the camera only ever sees the
//! clamped *factor* `exp(level)`. Stepping walks a log-spaced grid so each
//! click feels like the same amount of zoom.

use serde::{Deserialize, Serialize};

pub const MIN_ZOOM_FACTOR: f32 = 0.25;
pub const MAX_ZOOM_FACTOR: f32 = 4.0;

/// Number of grid intervals between [`MIN_ZOOM_FACTOR`] and [`MAX_ZOOM_FACTOR`].
pub const ZOOM_STEPS: u32 = 20;

/// Stepped factors this close to 1.0 snap to exactly 1.0.
pub const SNAP_TOLERANCE: f32 = 0.02;

const MIN_ORTHO_SIZE: f32 = 1e-3;
const MAX_ORTHO_SIZE: f32 = 1e6;
const MIN_FOV_DEGREES: f32 = 5.0;
const MAX_FOV_DEGREES: f32 = 120.0;

/// Zoom direction for stepping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ZoomDirection {
    In,
    Out,
}

impl ZoomDirection {
    fn sign(self) -> i32 {
        match self {
            Self::In => 1,
            Self::Out => -1,
        }
    }
}

/// Camera projection and its zoom-relevant parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Projection {
    Orthographic { size: f32 },
    /// Vertical field of view in degrees.
    Perspective { fov_degrees: f32 },
}

impl Projection {
    #[inline]
    pub fn is_orthographic(&self) -> bool {
        matches!(self, Self::Orthographic { .. })
    }

    /// Apply a zoom factor, returning the adjusted projection.
    pub fn zoomed(self, factor: f32) -> Self {
        let factor = clamp_factor(factor);
        match self {
            Self::Orthographic { size } => Self::Orthographic {
                size: (size / factor).clamp(MIN_ORTHO_SIZE, MAX_ORTHO_SIZE),
            },
            Self::Perspective { fov_degrees } => Self::Perspective {
                fov_degrees: (fov_degrees.clamp(MIN_FOV_DEGREES, MAX_FOV_DEGREES) / factor)
                    .clamp(MIN_FOV_DEGREES, MAX_FOV_DEGREES),
            },
        }
    }

    /// The zoom-relevant value: orthographic size or field of view.
    pub fn value(&self) -> f32 {
        match *self {
            Self::Orthographic { size } => size,
            Self::Perspective { fov_degrees } => fov_degrees,
        }
    }
}

impl Default for Projection {
    fn default() -> Self {
        Self::Perspective { fov_degrees: 60.0 }
    }
}

/// Clamp a factor into the supported zoom range. Non-finite input maps to 1.0.
#[inline]
pub fn clamp_factor(factor: f32) -> f32 {
    if factor.is_finite() {
        factor.clamp(MIN_ZOOM_FACTOR, MAX_ZOOM_FACTOR)
    } else {
        1.0
    }
}

/// Adjusted orthographic size or field of view for a zoom factor.
pub fn apply_to_camera(base_value: f32, factor: f32, is_orthographic: bool) -> f32 {
    let projection = if is_orthographic {
        Projection::Orthographic { size: base_value }
    } else {
        Projection::Perspective {
            fov_degrees: base_value,
        }
    };
    projection.zoomed(factor).value()
}

fn grid_step() -> f32 {
    (MAX_ZOOM_FACTOR / MIN_ZOOM_FACTOR).ln() / ZOOM_STEPS as f32
}

fn grid_factor(index: i32) -> f32 {
    if index <= 0 {
        return MIN_ZOOM_FACTOR;
    }
    if index >= ZOOM_STEPS as i32 {
        return MAX_ZOOM_FACTOR;
    }
    let factor = MIN_ZOOM_FACTOR * (index as f32 * grid_step()).exp();
    if (factor - 1.0).abs() < SNAP_TOLERANCE {
        1.0
    } else {
        factor
    }
}

/// Move one log-spaced grid step from `current` in `direction`.
///
/// Off-grid factors step to the nearest grid point on the requested side.
pub fn step_log(current: f32, direction: ZoomDirection) -> f32 {
    // Grid positions within this distance count as "on" a grid point.
    const ON_GRID: f32 = 1e-3;

    let position = (clamp_factor(current) / MIN_ZOOM_FACTOR).ln() / grid_step();
    let index = match direction {
        ZoomDirection::In => (position + ON_GRID).floor() as i32 + direction.sign(),
        ZoomDirection::Out => (position - ON_GRID).ceil() as i32 + direction.sign(),
    };
    grid_factor(index.clamp(0, ZOOM_STEPS as i32))
}

/// Persisted zoom: unbounded level plus derived clamped factor.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoomState {
    pub level: f32,
}

impl ZoomState {
    pub fn from_level(level: f32) -> Self {
        Self { level }
    }

    pub fn from_factor(factor: f32) -> Self {
        Self {
            level: clamp_factor(factor).ln(),
        }
    }

    /// Effective camera factor, `exp(level)` clamped to the zoom range.
    pub fn factor(&self) -> f32 {
        clamp_factor(self.level.exp())
    }

    /// Step the zoom one grid notch and store the result as a level.
    pub fn step(&mut self, direction: ZoomDirection) {
        self.level = step_log(self.factor(), direction).ln();
    }

    pub fn reset(&mut self) {
        self.level = 0.0;
    }
}
