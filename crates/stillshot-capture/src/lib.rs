//! StillShot Capture - preview scheduling and full-resolution capture
//!
//! Everything above the render backend: the adaptive preview scheduler,
//! the per-panel capture session, the preview renderer and the capture
//! orchestrator, plus the encoder and storage seams.

pub mod encoder;
pub mod orchestrator;
pub mod preview;
pub mod scheduler;
pub mod session;
pub mod storage;

pub use encoder::{ImageEncoder, PngEncoder};
pub use orchestrator::{CaptureOrchestrator, CaptureOutput, CapturePhase, RetryTimer, TokioTimer};
pub use preview::{PreviewFrame, PreviewRenderer};
pub use scheduler::{ActivityClass, AdaptiveUpdateScheduler, PollResult};
pub use session::{CaptureRequest, CaptureSession, SessionState};
pub use storage::{DirectoryStorage, StorageSink};
