//! Adaptive preview refresh scheduling.
//!
//! The scheduler is a pure decision function: it classifies camera motion
//! and says when the preview is due. Rendering is the caller's job.

use serde::{Deserialize, Serialize};
use stillshot_core::{CameraPose, SchedulerSettings};
use std::time::{Duration, Instant};
use tracing::debug;

/// Camera motion classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ActivityClass {
    Moving,
    #[default]
    Static,
}

/// Outcome of one [`AdaptiveUpdateScheduler::poll`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollResult {
    /// Re-render now.
    pub due: bool,
    pub activity: ActivityClass,
}

#[derive(Debug, Clone, Copy)]
struct Sample {
    at: Instant,
    pose: CameraPose,
}

/// Two-state (`Moving`/`Static`) refresh scheduler.
#[derive(Debug, Clone)]
pub struct AdaptiveUpdateScheduler {
    settings: SchedulerSettings,
    activity: ActivityClass,
    reference: Option<Sample>,
    refresh_requested: bool,
}

impl AdaptiveUpdateScheduler {
    pub fn new(settings: SchedulerSettings) -> Self {
        Self {
            settings,
            activity: ActivityClass::Static,
            reference: None,
            refresh_requested: false,
        }
    }

    pub fn activity(&self) -> ActivityClass {
        self.activity
    }

    pub fn settings(&self) -> &SchedulerSettings {
        &self.settings
    }

    /// Refresh interval for an activity class.
    pub fn interval(&self, activity: ActivityClass) -> Duration {
        let secs = match activity {
            ActivityClass::Moving => self.settings.moving_interval_secs,
            ActivityClass::Static => self.settings.static_interval_secs,
        };
        Duration::from_secs_f64(secs.max(0.0))
    }

    /// Make the next poll due regardless of motion.
    pub fn request_refresh(&mut self) {
        self.refresh_requested = true;
    }

    /// Forget the reference sample; the next poll is due.
    pub fn reset(&mut self) {
        self.reference = None;
        self.activity = ActivityClass::Static;
        self.refresh_requested = false;
    }

    /// Classify motion since the last accepted sample and decide whether
    /// a refresh is due.
    ///
    /// The reference sample only moves forward when the result is due.
    pub fn poll(&mut self, now: Instant, pose: &CameraPose) -> PollResult {
        let Some(reference) = self.reference else {
            self.accept(now, pose);
            return PollResult {
                due: true,
                activity: self.activity,
            };
        };

        let elapsed = now.saturating_duration_since(reference.at);
        let secs = elapsed.as_secs_f64();
        let distance_sq = pose.distance_squared(&reference.pose) as f64;
        let angle = pose.angle_to_degrees(&reference.pose) as f64;

        let jumped = distance_sq > self.settings.position_delta_sq_threshold as f64
            || angle > self.settings.rotation_delta_threshold as f64;
        let fast = secs > 0.0
            && (distance_sq / (secs * secs) > self.settings.position_velocity_sq_threshold as f64
                || angle / secs > self.settings.rotation_velocity_threshold as f64);

        let activity = if jumped || fast {
            ActivityClass::Moving
        } else {
            ActivityClass::Static
        };
        if activity != self.activity {
            debug!("Preview activity {:?} -> {:?}", self.activity, activity);
            self.activity = activity;
        }

        let due = jumped || self.refresh_requested || elapsed >= self.interval(activity);
        if due {
            self.accept(now, pose);
        }
        PollResult { due, activity }
    }

    fn accept(&mut self, now: Instant, pose: &CameraPose) {
        self.reference = Some(Sample { at: now, pose: *pose });
        self.refresh_requested = false;
    }
}

impl Default for AdaptiveUpdateScheduler {
    fn default() -> Self {
        Self::new(SchedulerSettings::default())
    }
}
