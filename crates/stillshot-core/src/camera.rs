//! Camera state as seen by the capture pipeline.

use crate::zoom::Projection;
use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Camera position and orientation.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CameraPose {
    pub position: Vec3,
    pub rotation: Quat,
}

impl CameraPose {
    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    /// Squared distance to another pose's position.
    #[inline]
    pub fn distance_squared(&self, other: &Self) -> f32 {
        self.position.distance_squared(other.position)
    }

    /// Rotation between two poses, in degrees.
    #[inline]
    pub fn angle_to_degrees(&self, other: &Self) -> f32 {
        self.rotation
            .normalize()
            .angle_between(other.rotation.normalize())
            .to_degrees()
    }
}

/// Everything the capture path may modify on the host camera and must restore.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraState {
    pub projection: Projection,
    /// MSAA sample count; 1 disables anti-aliasing.
    pub anti_aliasing: u8,
    pub clear_color: [f32; 4],
    pub pose: CameraPose,
}

impl CameraState {
    /// Copy of this camera with the zoom factor applied to its projection.
    pub fn zoomed(&self, factor: f32) -> Self {
        Self {
            projection: self.projection.zoomed(factor),
            ..*self
        }
    }

    #[inline]
    pub fn is_orthographic(&self) -> bool {
        self.projection.is_orthographic()
    }

    /// Whether the clear color contributes any opacity.
    #[inline]
    pub fn has_opaque_clear(&self) -> bool {
        self.clear_color[3] > 0.0
    }
}

impl Default for CameraState {
    fn default() -> Self {
        Self {
            projection: Projection::default(),
            anti_aliasing: 1,
            clear_color: [0.0, 0.0, 0.0, 1.0],
            pose: CameraPose::default(),
        }
    }
}
