//! User-tunable settings, loadable from JSON.

use crate::error::{CaptureError, Result};
use crate::geometry::MIN_DIMENSION;
use crate::memory::BudgetFractions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Thresholds and intervals for the adaptive preview scheduler.
///
/// Velocities are per second; positions are in world units, rotations in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerSettings {
    /// Re-render interval while the camera moves.
    pub moving_interval_secs: f64,
    /// Re-render interval while the camera is still.
    pub static_interval_secs: f64,
    pub position_velocity_sq_threshold: f32,
    pub rotation_velocity_threshold: f32,
    /// Squared positional jump that counts as a cut.
    pub position_delta_sq_threshold: f32,
    /// Rotation jump, in degrees, that counts as a cut.
    pub rotation_delta_threshold: f32,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            moving_interval_secs: 0.1,
            static_interval_secs: 1.0,
            position_velocity_sq_threshold: 0.01,
            rotation_velocity_threshold: 1.0,
            position_delta_sq_threshold: 0.25,
            rotation_delta_threshold: 5.0,
        }
    }
}

/// Size of the preview box inside the control panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewSettings {
    pub width: u32,
    pub height: u32,
}

impl Default for PreviewSettings {
    fn default() -> Self {
        Self {
            width: 480,
            height: 270,
        }
    }
}

/// Top-level settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureSettings {
    pub budget: BudgetFractions,
    pub scheduler: SchedulerSettings,
    pub preview: PreviewSettings,
    /// Width requested when the user has not picked one.
    pub default_width: u32,
    /// Where captures land; the host's pictures directory when unset.
    pub output_dir: Option<PathBuf>,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            budget: BudgetFractions::default(),
            scheduler: SchedulerSettings::default(),
            preview: PreviewSettings::default(),
            default_width: 3840,
            output_dir: None,
        }
    }
}

impl CaptureSettings {
    /// Parse and validate settings from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load and validate settings from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        let fraction_ok = |f: f64| f > 0.0 && f <= 1.0;
        if !fraction_ok(self.budget.gpu) || !fraction_ok(self.budget.cpu) {
            return Err(CaptureError::InvalidSettings(format!(
                "budget fractions must be in (0, 1], got gpu={} cpu={}",
                self.budget.gpu, self.budget.cpu
            )));
        }

        let s = &self.scheduler;
        if !(s.moving_interval_secs > 0.0 && s.static_interval_secs > 0.0) {
            return Err(CaptureError::InvalidSettings(
                "scheduler intervals must be positive".to_string(),
            ));
        }
        let thresholds = [
            s.position_velocity_sq_threshold,
            s.rotation_velocity_threshold,
            s.position_delta_sq_threshold,
            s.rotation_delta_threshold,
        ];
        if thresholds.iter().any(|t| !(*t >= 0.0)) {
            return Err(CaptureError::InvalidSettings(
                "scheduler thresholds must be non-negative".to_string(),
            ));
        }

        if self.preview.width < MIN_DIMENSION || self.preview.height < MIN_DIMENSION {
            return Err(CaptureError::InvalidSettings(format!(
                "preview box must be at least {MIN_DIMENSION}px per axis, got {}x{}",
                self.preview.width, self.preview.height
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(CaptureSettings::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let settings =
            CaptureSettings::from_json_str(r#"{ "budget": { "gpu": 0.5 }, "default_width": 2000 }"#)
                .unwrap();
        assert_eq!(settings.budget.gpu, 0.5);
        assert_eq!(settings.budget.cpu, 0.4);
        assert_eq!(settings.default_width, 2000);
        assert_eq!(settings.scheduler, SchedulerSettings::default());
    }

    #[test]
    fn test_rejects_bad_fraction() {
        let err = CaptureSettings::from_json_str(r#"{ "budget": { "gpu": 1.5 } }"#).unwrap_err();
        assert!(matches!(err, CaptureError::InvalidSettings(_)));
    }

    #[test]
    fn test_rejects_tiny_preview() {
        let err =
            CaptureSettings::from_json_str(r#"{ "preview": { "width": 4, "height": 4 } }"#)
                .unwrap_err();
        assert!(matches!(err, CaptureError::InvalidSettings(_)));
    }

    #[test]
    fn test_rejects_malformed_json() {
        let err = CaptureSettings::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, CaptureError::Serialization(_)));
    }

    #[test]
    fn test_load_round_trip_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let mut settings = CaptureSettings::default();
        settings.default_width = 5120;
        std::fs::write(&path, settings.to_json().unwrap()).unwrap();
        assert_eq!(CaptureSettings::load(&path).unwrap(), settings);
    }
}
