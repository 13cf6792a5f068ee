//! Error taxonomy for the sensing pipeline.
//!
//! None of these are fatal to gameplay: a camera that fails to open
//! degrades the game to a plain runner, and a failed classification is
//! discarded at the point it occurs.

/// Failures raised by camera capture or emotion classification.
#[derive(Debug, thiserror::Error)]
pub enum VisionError {
    /// The capture device could not be opened or produced no frame.
    #[error("camera unavailable: {0}")]
    CameraUnavailable(String),
    /// The classifier found no usable face in the frame.
    #[error("no detectable face in frame")]
    NoFace,
    /// The classification backend reported an internal error.
    #[error("classifier backend: {0}")]
    Backend(String),
    /// Spawning the sensing thread or another OS-level failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
