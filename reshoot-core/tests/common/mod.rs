//! Fake collaborators and synthetic frames shared by the integration tests.

#![allow(dead_code)]

use crossbeam_channel::{Receiver, Sender};
use image::{ImageFormat, Rgb, RgbImage};
use parking_lot::Mutex;
use reshoot_core::error::{SinkError, SourceError};
use reshoot_core::{ImageSink, ImageSource};
use std::collections::VecDeque;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};

fn encode_png(img: RgbImage) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).expect("png encode");
    out.into_inner()
}

/// High-contrast checkerboard, far above the blur threshold.
pub fn sharp_frame() -> Vec<u8> {
    encode_png(RgbImage::from_fn(64, 48, |x, y| {
        if ((x / 4) + (y / 4)) % 2 == 0 {
            Rgb([10, 10, 10])
        } else {
            Rgb([240, 240, 240])
        }
    }))
}

/// Flat grey, Laplacian variance of zero.
pub fn blurry_frame() -> Vec<u8> {
    encode_png(RgbImage::from_pixel(64, 48, Rgb([128, 128, 128])))
}

/// Returns the queued results in order, then `Unavailable`.
#[derive(Default)]
pub struct ScriptedSource {
    frames: Mutex<VecDeque<Result<Vec<u8>, SourceError>>>,
    calls: AtomicUsize,
}

impl ScriptedSource {
    pub fn new(frames: impl IntoIterator<Item = Result<Vec<u8>, SourceError>>) -> Self {
        Self {
            frames: Mutex::new(frames.into_iter().collect()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ImageSource for ScriptedSource {
    fn capture_frame(&self) -> Result<Vec<u8>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.frames
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(SourceError::Unavailable("script exhausted".into())))
    }
}

/// Blocks inside `capture_frame` until the test opens the gate.
pub struct GatedSource {
    frame: Vec<u8>,
    entered_tx: Sender<()>,
    gate_rx: Receiver<()>,
    calls: AtomicUsize,
}

/// Test-side controls for a [`GatedSource`].
pub struct Gate {
    pub entered: Receiver<()>,
    pub open: Sender<()>,
}

impl GatedSource {
    pub fn new(frame: Vec<u8>) -> (Self, Gate) {
        let (entered_tx, entered) = crossbeam_channel::unbounded();
        let (open, gate_rx) = crossbeam_channel::unbounded();
        let source = Self {
            frame,
            entered_tx,
            gate_rx,
            calls: AtomicUsize::new(0),
        };
        (source, Gate { entered, open })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ImageSource for GatedSource {
    fn capture_frame(&self) -> Result<Vec<u8>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let _ = self.entered_tx.send(());
        self.gate_rx.recv().map_err(|_| SourceError::Disconnected)?;
        Ok(self.frame.clone())
    }
}

/// Keeps every stored image, or fails every call when `failing`.
#[derive(Default)]
pub struct RecordingSink {
    stored: Mutex<Vec<Vec<u8>>>,
    failing: bool,
}

impl RecordingSink {
    pub fn failing() -> Self {
        Self {
            stored: Mutex::new(Vec::new()),
            failing: true,
        }
    }

    pub fn stored(&self) -> Vec<Vec<u8>> {
        self.stored.lock().clone()
    }
}

impl ImageSink for RecordingSink {
    fn store(&self, image: &[u8]) -> Result<(), SinkError> {
        if self.failing {
            return Err(SinkError::Rejected("gallery full".into()));
        }
        self.stored.lock().push(image.to_vec());
        Ok(())
    }
}
