//! Error taxonomy shared by the capture pipeline.
//!
//! Only [`TriggerError`] and [`CaptureError`] ever reach the user.
//! [`DecodeError`] is swallowed by the orchestrator (fail-open).

use std::time::Duration;

/// The sharpness check could not produce a score.
#[derive(thiserror::Error, Debug)]
pub enum DecodeError {
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("decoded image is empty (width={width}, height={height})")]
    Empty { width: u32, height: u32 },
}

/// The image source could not deliver a frame.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    #[error("camera unavailable: {0}")]
    Unavailable(String),

    #[error("frame capture failed: {0}")]
    Failed(String),

    #[error("image source went away before returning a frame")]
    Disconnected,
}

/// The image sink could not persist an accepted shot.
#[derive(thiserror::Error, Debug)]
pub enum SinkError {
    #[error("failed to write image: {0}")]
    Io(#[from] std::io::Error),

    #[error("image rejected by gallery: {0}")]
    Rejected(String),
}

/// Why a completed trigger did not produce an accepted image.
#[derive(thiserror::Error, Debug)]
pub enum CaptureError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Sink(#[from] SinkError),

    #[error("no frame from the camera after {0:?}")]
    Timeout(Duration),
}

/// A trigger refused before any work started.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerError {
    #[error("a capture is already in progress")]
    Busy,

    #[error("capture session has been shut down")]
    ShutDown,
}
