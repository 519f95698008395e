//! Error types for StillShot.

use thiserror::Error;

/// Main error type for capture and preview operations.
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Render target creation failed (out of memory or invalid dimensions).
    #[error("Failed to allocate {width}x{height} render target: {reason}")]
    AllocationFailure {
        width: u32,
        height: u32,
        reason: String,
    },

    /// Pixel read-back did not succeed after exhausting retries.
    #[error("Pixel read-back failed after {attempts} attempt(s): {reason}")]
    ReadbackFailure { attempts: u32, reason: String },

    #[error("Encoding failed: {0}")]
    EncodingFailure(String),

    /// The capability source returned no usable data. Recovered locally by
    /// falling back to conservative defaults; never surfaced from `capture`.
    #[error("GPU capabilities unavailable: {0}")]
    CapabilityUnavailable(String),

    #[error("Render failed: {0}")]
    RenderFailure(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for CaptureError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type alias for StillShot operations.
pub type Result<T> = std::result::Result<T, CaptureError>;
