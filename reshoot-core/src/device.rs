//! Collaborator seams: where frames come from and where shots go.
//!
//! Both calls may block for a long time (they drive camera hardware and
//! storage). They take `&self` so an orchestrator can abandon a hung
//! call on a helper thread without holding a lock.

use crate::error::{SinkError, SourceError};

/// Captures one compressed frame per call.
pub trait ImageSource: Send + Sync {
    fn capture_frame(&self) -> Result<Vec<u8>, SourceError>;
}

/// Persists an accepted shot to durable storage.
pub trait ImageSink: Send + Sync {
    fn store(&self, image: &[u8]) -> Result<(), SinkError>;
}
