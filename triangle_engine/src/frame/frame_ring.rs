/// Fixed-size ring of per-frame slots driven by one monotonic counter

use crate::error::{Error, Result};

/// Ring of in-flight frame slots
///
/// The current slot is always `frame_index % len`. Only [`advance`](Self::advance)
/// moves the counter, so there is no second index that can drift out of step.
#[derive(Debug)]
pub struct FrameRing<S> {
    slots: Vec<S>,
    frame_index: u64,
}

impl<S> FrameRing<S> {
    /// Build a ring from its slots. An empty ring is rejected.
    pub fn new(slots: Vec<S>) -> Result<Self> {
        if slots.is_empty() {
            return Err(Error::InitializationFailed(
                "Frame ring needs at least one slot".to_string(),
            ));
        }
        Ok(Self { slots, frame_index: 0 })
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// True only after [`drain`](Self::drain)
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Number of frames advanced past so far
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Slot index for the current frame
    pub fn current_index(&self) -> usize {
        if self.slots.is_empty() {
            return 0;
        }
        (self.frame_index % self.slots.len() as u64) as usize
    }

    /// # Panics
    ///
    /// Panics if the ring has been drained.
    pub fn current(&self) -> &S {
        &self.slots[self.current_index()]
    }

    /// # Panics
    ///
    /// Panics if the ring has been drained.
    pub fn current_mut(&mut self) -> &mut S {
        let index = self.current_index();
        &mut self.slots[index]
    }

    pub fn get(&self, index: usize) -> Option<&S> {
        self.slots.get(index)
    }

    /// Move to the next frame
    pub fn advance(&mut self) {
        self.frame_index += 1;
    }

    pub fn iter(&self) -> std::slice::Iter<'_, S> {
        self.slots.iter()
    }

    /// Remove every slot for release. The ring is empty afterwards.
    pub fn drain(&mut self) -> std::vec::Drain<'_, S> {
        self.slots.drain(..)
    }
}

#[cfg(test)]
#[path = "frame_ring_tests.rs"]
mod tests;
