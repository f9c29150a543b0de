//! # Reference Module
//!
//! Holds the golden image together with the orientation it was taken at.
//!
//! The pair lives in a single `Option`, so an image without a target (or
//! the reverse) cannot be represented. Writers swap the whole option under
//! one lock, which makes every read a consistent snapshot.

use crate::orientation::Orientation;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

/// Opaque, cheaply cloneable handle to the bytes of a captured frame.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageHandle(Arc<[u8]>);

impl ImageHandle {
    pub fn new(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self(bytes.into())
    }

    pub fn bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for ImageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ImageHandle({} bytes)", self.0.len())
    }
}

/// The golden image and the target orientation recorded with it.
#[derive(Debug, Clone, PartialEq)]
pub struct Reference {
    pub image: ImageHandle,
    pub target: Orientation,
}

/// `None` until a sharp reference capture succeeds, and again after a reset.
pub type ReferenceState = Option<Reference>;

#[derive(Debug, Default)]
struct Inner {
    state: ReferenceState,
    version: u64,
}

/// Shared owner of the [`ReferenceState`]. Clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct ReferenceStore {
    inner: Arc<RwLock<Inner>>,
}

impl ReferenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces image and target together.
    pub fn set(&self, image: ImageHandle, target: Orientation) {
        let size = image.len();
        {
            let mut inner = self.inner.write();
            inner.state = Some(Reference { image, target });
            inner.version += 1;
        }
        log::info!(
            "[REFERENCE] Set golden image ({size} bytes) at pitch={:.2} roll={:.2}",
            target.pitch,
            target.roll
        );
    }

    /// Unsets image and target together.
    pub fn clear(&self) {
        let mut inner = self.inner.write();
        if inner.state.take().is_some() {
            log::info!("[REFERENCE] Cleared golden image");
        }
        inner.version += 1;
    }

    /// Snapshot of the current state.
    pub fn get(&self) -> ReferenceState {
        self.inner.read().state.clone()
    }

    /// Target orientation only, without cloning the image handle.
    pub fn target(&self) -> Option<Orientation> {
        self.inner.read().state.as_ref().map(|r| r.target)
    }

    pub fn is_set(&self) -> bool {
        self.inner.read().state.is_some()
    }

    /// Incremented by every `set` and `clear`.
    pub fn version(&self) -> u64 {
        self.inner.read().version
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(tag: u8) -> ImageHandle {
        ImageHandle::new(vec![tag; 8])
    }

    #[test]
    fn starts_unset() {
        let store = ReferenceStore::new();
        assert_eq!(store.get(), None);
        assert_eq!(store.target(), None);
        assert!(!store.is_set());
    }

    #[test]
    fn set_then_get_returns_the_pair() {
        let store = ReferenceStore::new();
        let o = Orientation::new(5.0, -3.0);
        store.set(handle(1), o);

        let got = store.get().expect("reference set");
        assert_eq!(got.image, handle(1));
        assert_eq!(got.target, o);
        assert_eq!(store.target(), Some(o));
    }

    #[test]
    fn clear_unsets_both() {
        let store = ReferenceStore::new();
        store.set(handle(1), Orientation::new(1.0, 2.0));
        store.clear();
        assert_eq!(store.get(), None);
        assert_eq!(store.version(), 2);
    }

    #[test]
    fn set_replaces_previous_pair() {
        let store = ReferenceStore::new();
        store.set(handle(1), Orientation::new(1.0, 1.0));
        store.set(handle(2), Orientation::new(2.0, 2.0));
        assert_eq!(
            store.get(),
            Some(Reference {
                image: handle(2),
                target: Orientation::new(2.0, 2.0),
            })
        );
    }

    #[test]
    fn readers_never_see_a_torn_pair() {
        let store = ReferenceStore::new();
        let writer = store.clone();
        let t = std::thread::spawn(move || {
            for i in 0..500u16 {
                let tag = (i % 200) as u8;
                writer.set(handle(tag), Orientation::new(f64::from(tag), 0.0));
                if i % 7 == 0 {
                    writer.clear();
                }
            }
        });
        for _ in 0..500 {
            if let Some(r) = store.get() {
                assert_eq!(f64::from(r.image.bytes()[0]), r.target.pitch);
            }
        }
        t.join().expect("writer thread");
    }
}
