//! Latest-value-wins published cell.
//!
//! Producers overwrite, readers take snapshots. Nothing is queued, so a
//! slow reader only ever misses intermediate values, never blocks the
//! producer for longer than a clone.

use parking_lot::RwLock;
use std::sync::Arc;

#[derive(Debug, Default)]
struct Slot<T> {
    value: T,
    version: u64,
}

/// A cloneable handle to a shared, continuously overwritten value.
#[derive(Debug, Default)]
pub struct Latest<T> {
    slot: Arc<RwLock<Slot<T>>>,
}

impl<T> Clone for Latest<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<T: Clone> Latest<T> {
    pub fn new(value: T) -> Self {
        Self {
            slot: Arc::new(RwLock::new(Slot { value, version: 0 })),
        }
    }

    /// Replaces the current value.
    pub fn publish(&self, value: T) {
        let mut slot = self.slot.write();
        slot.value = value;
        slot.version += 1;
    }

    /// Snapshot of the current value.
    pub fn get(&self) -> T {
        self.slot.read().value.clone()
    }

    /// Number of `publish` calls so far.
    pub fn version(&self) -> u64 {
        self.slot.read().version
    }
}
