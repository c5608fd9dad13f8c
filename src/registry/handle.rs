//! Handle types
//!
//! Handles are plain `Copy` values: a slot index plus the generation the slot
//! had when the handle was issued.

use std::fmt;

/// Status of a registry slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotStatus {
    /// Free for reuse
    UnAllocated,

    /// Claimed, but the store or stream is still being set up
    UnInitialized,

    /// Holds a live store or stream
    Active,
}

/// Untyped slot reference shared by both handle kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct RawHandle {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

/// Handle to an open store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StoreHandle(pub(crate) RawHandle);

/// Handle to an open stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamHandle(pub(crate) RawHandle);

impl StoreHandle {
    /// Slot index in the store table
    pub fn index(&self) -> u32 {
        self.0.index
    }

    /// Generation of the slot when this handle was issued
    pub fn generation(&self) -> u32 {
        self.0.generation
    }
}

impl StreamHandle {
    /// Slot index in the stream table
    pub fn index(&self) -> u32 {
        self.0.index
    }

    /// Generation of the slot when this handle was issued
    pub fn generation(&self) -> u32 {
        self.0.generation
    }
}

impl fmt::Display for StoreHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "store#{}.{}", self.0.index, self.0.generation)
    }
}

impl fmt::Display for StreamHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stream#{}.{}", self.0.index, self.0.generation)
    }
}
