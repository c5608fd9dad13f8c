//! Slot table
//!
//! Generic growable table behind both the store and the stream registry.

use crate::error::Result;

use super::{RawHandle, SlotStatus};

/// One entry of the table
struct Slot<T> {
    status: SlotStatus,
    generation: u32,
    value: Option<T>,
}

impl<T> Slot<T> {
    fn free() -> Self {
        Self {
            status: SlotStatus::UnAllocated,
            generation: 0,
            value: None,
        }
    }
}

/// Growable table of slots addressed by [`RawHandle`]
pub(crate) struct Registry<T> {
    /// Table name for log lines ("store" / "stream")
    name: &'static str,
    slots: Vec<Slot<T>>,
    /// Number of Active slots
    live: usize,
}

impl<T> Registry<T> {
    /// Create a table with `capacity` free slots
    pub(crate) fn with_capacity(name: &'static str, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            name,
            slots: (0..capacity).map(|_| Slot::free()).collect(),
            live: 0,
        }
    }

    /// Current number of slots (free or not)
    pub(crate) fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of live entries
    pub(crate) fn live(&self) -> usize {
        self.live
    }

    /// Claim a slot, build its value with `init`, and activate it.
    ///
    /// If `init` fails the slot is released again and the error returned.
    pub(crate) fn insert_with<F>(&mut self, init: F) -> Result<RawHandle>
    where
        F: FnOnce(RawHandle) -> Result<T>,
    {
        let handle = self.claim();
        let slot = &mut self.slots[handle.index as usize];

        match init(handle) {
            Ok(value) => {
                slot.value = Some(value);
                slot.status = SlotStatus::Active;
                self.live += 1;
                Ok(handle)
            }
            Err(e) => {
                slot.status = SlotStatus::UnAllocated;
                slot.generation = slot.generation.wrapping_add(1);
                Err(e)
            }
        }
    }

    /// Borrow a live entry
    pub(crate) fn get(&self, handle: RawHandle) -> Option<&T> {
        let slot = self.slots.get(handle.index as usize)?;
        if slot.status != SlotStatus::Active || slot.generation != handle.generation {
            return None;
        }
        slot.value.as_ref()
    }

    /// Mutably borrow a live entry
    pub(crate) fn get_mut(&mut self, handle: RawHandle) -> Option<&mut T> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.status != SlotStatus::Active || slot.generation != handle.generation {
            return None;
        }
        slot.value.as_mut()
    }

    /// Release a live entry, returning its value.
    ///
    /// The slot's generation is bumped so the released handle goes stale.
    pub(crate) fn remove(&mut self, handle: RawHandle) -> Option<T> {
        self.get(handle)?;

        let slot = &mut self.slots[handle.index as usize];
        slot.status = SlotStatus::UnAllocated;
        slot.generation = slot.generation.wrapping_add(1);
        self.live -= 1;
        slot.value.take()
    }

    /// Status of the slot at `index`, or None past the end of the table
    pub(crate) fn status(&self, index: u32) -> Option<SlotStatus> {
        self.slots.get(index as usize).map(|s| s.status)
    }

    /// Handles of every live entry, in slot order
    pub(crate) fn handles(&self) -> Vec<RawHandle> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.status == SlotStatus::Active)
            .map(|(i, s)| RawHandle {
                index: i as u32,
                generation: s.generation,
            })
            .collect()
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Find the first free slot, doubling the table if there is none
    fn claim(&mut self) -> RawHandle {
        let index = match self
            .slots
            .iter()
            .position(|s| s.status == SlotStatus::UnAllocated)
        {
            Some(i) => i,
            None => {
                let old = self.slots.len();
                let new = old * 2;
                tracing::debug!(table = self.name, old, new, "growing registry");
                self.slots.resize_with(new, Slot::free);
                old
            }
        };

        let slot = &mut self.slots[index];
        slot.status = SlotStatus::UnInitialized;
        slot.value = None;

        RawHandle {
            index: index as u32,
            generation: slot.generation,
        }
    }
}
