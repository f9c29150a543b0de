// reshoot-core/src/lib.rs

//! The core logic for repeating a recorded camera orientation.
//! This crate is responsible for turning accelerometer samples into
//! pitch/roll, tracking the golden reference, and gating every capture
//! through a sharpness check. It is completely headless and contains
//! no presentation code.

pub mod alignment;
pub mod capture;
pub mod config;
pub mod device;
pub mod error;
pub mod latest;
pub mod logger;
pub mod orientation;
pub mod reference;
pub mod sensor;
pub mod sharpness;

pub use alignment::AlignmentResult;
pub use capture::{CaptureOrchestrator, CaptureOutcome, CaptureReport, CaptureRequest, CaptureState};
pub use config::CoreConfig;
pub use device::{ImageSink, ImageSource};
pub use latest::Latest;
pub use orientation::{AccelerationSample, Orientation};
pub use reference::{ImageHandle, Reference, ReferenceState, ReferenceStore};
pub use sharpness::SharpnessScore;

/// Everything the presentation layer polls to render the live view.
#[derive(Debug, Clone, Default)]
pub struct LiveOutputs {
    /// The most recent orientation estimate.
    pub orientation: Latest<Orientation>,
    /// Alignment of `orientation` against the reference target.
    pub alignment: Latest<AlignmentResult>,
}
