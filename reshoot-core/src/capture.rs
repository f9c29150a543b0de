//! # Capture Module
//!
//! The capture state machine. Both triggers share the same front half:
//!
//! ```text
//! Idle --trigger--> AcquiringFrame --frame--> AnalyzingSharpness --sharp--> Committing --> Idle
//!                         |                         |-- blurry --> Idle (RejectedBlurry)
//!                         |                         `-- analysis error --> Committing (fail-open)
//!                         `-- source error / timeout --> Idle (Failed)
//! ```
//!
//! A reference capture commits into the [`ReferenceStore`] using the
//! orientation sampled when the trigger fired. A shot capture hands the
//! frame to the [`ImageSink`].
//!
//! ## Threads
//! Each trigger runs on its own `capture` thread and frame acquisition
//! on a further helper thread, so a hung camera never blocks the
//! orientation pipeline or the caller. Outcomes come back over a channel.
//!
//! ## Shutdown
//! Once [`CaptureOrchestrator::shutdown`] runs, a flow that has not yet
//! reached `Committing` is abandoned silently. A flow already committing
//! finishes its commit.

use crate::config::CoreConfig;
use crate::device::{ImageSink, ImageSource};
use crate::error::{CaptureError, SourceError, TriggerError};
use crate::latest::Latest;
use crate::orientation::Orientation;
use crate::reference::{ImageHandle, ReferenceStore};
use crate::sharpness;
use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Which flow a trigger starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureRequest {
    /// Capture a new golden image and record its orientation.
    Reference,
    /// Capture a regular photo for the gallery.
    Shot,
}

/// Where the orchestrator currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    AcquiringFrame,
    AnalyzingSharpness,
    Committing,
}

/// Result of one completed trigger. Meant for transient user feedback.
#[derive(Debug)]
pub enum CaptureOutcome {
    Accepted(ImageHandle),
    RejectedBlurry { variance: f64 },
    Failed(CaptureError),
}

impl CaptureOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, CaptureOutcome::Accepted(_))
    }
}

impl fmt::Display for CaptureOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureOutcome::Accepted(image) => write!(f, "accepted ({} bytes)", image.len()),
            CaptureOutcome::RejectedBlurry { variance } => {
                write!(f, "rejected: too blurry (sharpness {variance:.1})")
            }
            CaptureOutcome::Failed(e) => write!(f, "failed: {e}"),
        }
    }
}

/// An outcome tagged with the request that produced it.
#[derive(Debug)]
pub struct CaptureReport {
    pub request: CaptureRequest,
    pub outcome: CaptureOutcome,
}

#[derive(Debug)]
struct Machine {
    state: CaptureState,
    shut_down: bool,
}

enum FlowError {
    /// The session ended mid-flow; nothing may be committed or reported.
    Abandoned,
    Failed(CaptureError),
}

struct Shared {
    machine: Mutex<Machine>,
    source: Arc<dyn ImageSource>,
    sink: Arc<dyn ImageSink>,
    reference: ReferenceStore,
    outcome_tx: Sender<CaptureReport>,
    shutdown_rx: Receiver<()>,
    acquire_timeout: Duration,
    /// Set while a `capture_frame` call is outstanding, including one a
    /// timed-out flow left behind.
    camera_in_use: Arc<AtomicBool>,
}

/// Clears the camera flag when the acquisition thread is done with it,
/// panics included.
struct CameraClaim(Arc<AtomicBool>);

impl Drop for CameraClaim {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Accepts capture triggers and runs them one at a time.
pub struct CaptureOrchestrator {
    shared: Arc<Shared>,
    orientation: Latest<Orientation>,
    outcome_rx: Receiver<CaptureReport>,
    shutdown_tx: Mutex<Option<Sender<()>>>,
    flow: Mutex<Option<JoinHandle<()>>>,
}

impl CaptureOrchestrator {
    /// # Arguments
    /// * `source` - Camera frames
    /// * `sink` - Gallery storage for accepted shots
    /// * `reference` - Store updated by accepted reference captures
    /// * `orientation` - Live orientation, sampled at trigger time
    /// * `config` - Supplies the frame acquisition timeout
    pub fn new(
        source: Arc<dyn ImageSource>,
        sink: Arc<dyn ImageSink>,
        reference: ReferenceStore,
        orientation: Latest<Orientation>,
        config: &CoreConfig,
    ) -> Self {
        let (outcome_tx, outcome_rx) = crossbeam_channel::unbounded();
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded(1);

        Self {
            shared: Arc::new(Shared {
                machine: Mutex::new(Machine {
                    state: CaptureState::Idle,
                    shut_down: false,
                }),
                source,
                sink,
                reference,
                outcome_tx,
                shutdown_rx,
                acquire_timeout: config.acquire_timeout(),
                camera_in_use: Arc::new(AtomicBool::new(false)),
            }),
            orientation,
            outcome_rx,
            shutdown_tx: Mutex::new(Some(shutdown_tx)),
            flow: Mutex::new(None),
        }
    }

    /// Starts a capture flow and returns immediately.
    ///
    /// Fails with [`TriggerError::Busy`] when another flow is in flight, or
    /// when the camera has not yet returned from a call that timed out.
    /// Nothing is queued and no collaborator is touched in that case.
    pub fn trigger(&self, request: CaptureRequest) -> Result<(), TriggerError> {
        {
            let mut machine = self.shared.machine.lock();
            if machine.shut_down {
                return Err(TriggerError::ShutDown);
            }
            if machine.state != CaptureState::Idle {
                log::debug!("[CAPTURE] {request:?} rejected, busy in {:?}", machine.state);
                return Err(TriggerError::Busy);
            }
            if self.shared.camera_in_use.load(Ordering::SeqCst) {
                log::debug!("[CAPTURE] {request:?} rejected, camera still held by a timed-out capture");
                return Err(TriggerError::Busy);
            }
            machine.state = CaptureState::AcquiringFrame;
        }

        let at_trigger = self.orientation.get();
        log::debug!(
            "[CAPTURE] {request:?} triggered at pitch={:.2} roll={:.2}",
            at_trigger.pitch,
            at_trigger.roll
        );

        let shared = Arc::clone(&self.shared);
        let spawned = thread::Builder::new()
            .name("capture".into())
            .spawn(move || shared.run_flow(request, at_trigger));

        match spawned {
            Ok(handle) => {
                let previous = self.flow.lock().replace(handle);
                // The previous flow already reported and went Idle; reap it.
                if let Some(previous) = previous {
                    let _ = previous.join();
                }
            }
            Err(e) => {
                log::error!("[CAPTURE] Could not start capture thread: {e}");
                let failure = SourceError::Failed(format!("could not start capture: {e}"));
                self.shared
                    .finish(request, CaptureOutcome::Failed(CaptureError::Source(failure)));
            }
        }
        Ok(())
    }

    /// Completed triggers, in completion order.
    pub fn outcomes(&self) -> Receiver<CaptureReport> {
        self.outcome_rx.clone()
    }

    pub fn state(&self) -> CaptureState {
        self.shared.machine.lock().state
    }

    pub fn reference(&self) -> &ReferenceStore {
        &self.shared.reference
    }

    /// Forgets the golden image and its target.
    pub fn reset_reference(&self) {
        self.shared.reference.clear();
    }

    /// Ends the session. In-flight work that has not started committing is
    /// dropped without touching the store or the sink.
    pub fn shutdown(&self) {
        {
            let mut machine = self.shared.machine.lock();
            if machine.shut_down {
                return;
            }
            machine.shut_down = true;
        }
        log::info!("[CAPTURE] Shutting down");
        // Closing the channel wakes any flow waiting on the camera.
        self.shutdown_tx.lock().take();
        if let Some(handle) = self.flow.lock().take() {
            if handle.join().is_err() {
                log::error!("[CAPTURE] Capture thread panicked");
            }
        }
    }
}

impl Drop for CaptureOrchestrator {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for CaptureOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureOrchestrator")
            .field("machine", &*self.shared.machine.lock())
            .field("acquire_timeout", &self.shared.acquire_timeout)
            .finish_non_exhaustive()
    }
}

impl Shared {
    fn run_flow(&self, request: CaptureRequest, at_trigger: Orientation) {
        let frame = match self.acquire() {
            Ok(frame) => frame,
            Err(FlowError::Abandoned) => return self.abandon(request),
            Err(FlowError::Failed(e)) => {
                log::warn!("[CAPTURE] {request:?} could not get a frame: {e}");
                return self.finish(request, CaptureOutcome::Failed(e));
            }
        };

        if !self.advance(CaptureState::AnalyzingSharpness) {
            return self.abandon(request);
        }
        self.check_and_commit(request, frame, at_trigger);
    }

    /// Sharpness gate followed by the commit, from `AnalyzingSharpness`.
    fn check_and_commit(&self, request: CaptureRequest, frame: Vec<u8>, at_trigger: Orientation) {
        // Analysis failures, panics included, must never block a capture.
        match std::panic::catch_unwind(|| sharpness::analyze(&frame)) {
            Ok(Ok(score)) if score.is_blurry() => {
                log::info!("[CAPTURE] {request:?} rejected as blurry (variance {:.1})", score.variance);
                return self.finish(
                    request,
                    CaptureOutcome::RejectedBlurry {
                        variance: score.variance,
                    },
                );
            }
            Ok(Ok(score)) => log::debug!("[CAPTURE] Sharpness variance {:.1}", score.variance),
            Ok(Err(e)) => log::warn!("[CAPTURE] Sharpness check failed, accepting frame: {e}"),
            Err(_) => log::warn!("[CAPTURE] Sharpness check panicked, accepting frame"),
        }

        if !self.advance(CaptureState::Committing) {
            return self.abandon(request);
        }

        let image = ImageHandle::new(frame);
        let outcome = match request {
            CaptureRequest::Reference => {
                self.reference.set(image.clone(), at_trigger);
                CaptureOutcome::Accepted(image)
            }
            CaptureRequest::Shot => match self.sink.store(image.bytes()) {
                Ok(()) => CaptureOutcome::Accepted(image),
                Err(e) => {
                    log::warn!("[CAPTURE] Saving shot failed: {e}");
                    CaptureOutcome::Failed(CaptureError::Sink(e))
                }
            },
        };
        self.finish(request, outcome);
    }

    /// Pulls one frame, bounded by the timeout and the shutdown signal.
    fn acquire(&self) -> Result<Vec<u8>, FlowError> {
        let (frame_tx, frame_rx) = crossbeam_channel::bounded(1);
        let source = Arc::clone(&self.source);
        self.camera_in_use.store(true, Ordering::SeqCst);
        let claim = CameraClaim(Arc::clone(&self.camera_in_use));
        thread::Builder::new()
            .name("frame-acquire".into())
            .spawn(move || {
                let result = source.capture_frame();
                drop(claim);
                // Nobody is listening any more if we timed out; that's fine.
                let _ = frame_tx.send(result);
            })
            .map_err(|e| {
                FlowError::Failed(CaptureError::Source(SourceError::Failed(format!(
                    "could not start frame acquisition: {e}"
                ))))
            })?;

        crossbeam_channel::select! {
            recv(frame_rx) -> msg => match msg {
                Ok(Ok(frame)) => Ok(frame),
                Ok(Err(e)) => Err(FlowError::Failed(CaptureError::Source(e))),
                Err(_) => Err(FlowError::Failed(CaptureError::Source(SourceError::Disconnected))),
            },
            recv(self.shutdown_rx) -> _ => Err(FlowError::Abandoned),
            default(self.acquire_timeout) => {
                Err(FlowError::Failed(CaptureError::Timeout(self.acquire_timeout)))
            },
        }
    }

    /// Moves to `next` unless the session has ended.
    fn advance(&self, next: CaptureState) -> bool {
        let mut machine = self.machine.lock();
        if machine.shut_down {
            return false;
        }
        log::debug!("[CAPTURE] {:?} -> {next:?}", machine.state);
        machine.state = next;
        true
    }

    fn finish(&self, request: CaptureRequest, outcome: CaptureOutcome) {
        self.machine.lock().state = CaptureState::Idle;
        log::info!("[CAPTURE] {request:?} {outcome}");
        let _ = self.outcome_tx.send(CaptureReport { request, outcome });
    }

    fn abandon(&self, request: CaptureRequest) {
        self.machine.lock().state = CaptureState::Idle;
        log::info!("[CAPTURE] {request:?} abandoned at shutdown");
    }
}
