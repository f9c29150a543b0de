//! # Device Adapters
//!
//! File-backed stand-ins for the camera and the gallery, so the core can
//! run on a workstation.
//!
//! - [`FolderSource`] replays image files from a directory as camera frames
//! - [`GallerySink`] writes accepted shots into a gallery directory

use reshoot_core::error::{SinkError, SourceError};
use reshoot_core::{ImageSink, ImageSource};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Cycles through the files of a directory in name order.
#[derive(Debug)]
pub struct FolderSource {
    frames: Vec<PathBuf>,
    next: AtomicUsize,
}

impl FolderSource {
    /// Lists `dir` once; files added later are not picked up.
    pub fn open(dir: &Path) -> Result<Self, SourceError> {
        let entries = std::fs::read_dir(dir)
            .map_err(|e| SourceError::Unavailable(format!("{}: {e}", dir.display())))?;

        let mut frames: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file())
            .collect();
        frames.sort();

        if frames.is_empty() {
            return Err(SourceError::Unavailable(format!(
                "no frames in {}",
                dir.display()
            )));
        }
        log::info!("[CAMERA] {} frames available in {}", frames.len(), dir.display());
        Ok(Self {
            frames,
            next: AtomicUsize::new(0),
        })
    }
}

impl ImageSource for FolderSource {
    fn capture_frame(&self) -> Result<Vec<u8>, SourceError> {
        let index = self.next.fetch_add(1, Ordering::Relaxed) % self.frames.len();
        let path = &self.frames[index];
        log::debug!("[CAMERA] Capturing {}", path.display());
        std::fs::read(path).map_err(|e| SourceError::Failed(format!("{}: {e}", path.display())))
    }
}

/// Writes each stored image to `shot-<unix-millis>-<seq>.<ext>`.
#[derive(Debug)]
pub struct GallerySink {
    dir: PathBuf,
    seq: AtomicUsize,
}

impl GallerySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            seq: AtomicUsize::new(0),
        }
    }
}

impl ImageSink for GallerySink {
    fn store(&self, image: &[u8]) -> Result<(), SinkError> {
        if image.is_empty() {
            return Err(SinkError::Rejected("empty image".into()));
        }
        std::fs::create_dir_all(&self.dir)?;

        let extension = image::guess_format(image)
            .ok()
            .and_then(|format| format.extensions_str().first().copied())
            .unwrap_or("bin");
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        let path = self.dir.join(format!("shot-{millis}-{seq:04}.{extension}"));

        std::fs::write(&path, image)?;
        log::info!("[GALLERY] Saved {}", path.display());
        Ok(())
    }
}
