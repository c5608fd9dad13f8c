//! Backing Module
//!
//! Byte-addressed storage underneath a store. Backings know nothing about
//! headers or records; they read and write byte ranges at absolute offsets.
//!
//! ## Variants
//! - [`MemoryBacking`] - growable owned buffer, doubles when a write overflows
//! - [`FileBacking`] - buffered file, seeks only when not already positioned
//!
//! Store logic talks to [`Backing`], which dispatches to either variant, so
//! index/string/vlrecord code is identical for both.

mod file;
mod memory;

pub use file::{FileBacking, OpenMode};
pub use memory::MemoryBacking;

use crate::config::CommitDurability;
use crate::error::Result;

/// Operations every backing provides
pub trait StoreBacking {
    /// Fill `buf` with the bytes starting at `offset`
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<()>;

    /// Write `data` starting at `offset`, growing the backing if needed
    fn write_at(&mut self, offset: u64, data: &[u8]) -> Result<()>;

    /// Push buffered writes down with the requested durability
    fn flush(&mut self, durability: CommitDurability) -> Result<()>;

    /// Number of `write_at` calls performed so far
    fn write_count(&self) -> u64;
}

/// Memory or disk backing of one store
#[derive(Debug)]
pub enum Backing {
    Memory(MemoryBacking),
    File(FileBacking),
}

impl Backing {
    /// True for memory-resident stores
    pub fn is_memory(&self) -> bool {
        matches!(self, Backing::Memory(_))
    }
}

impl StoreBacking for Backing {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<()> {
        match self {
            Backing::Memory(m) => m.read_at(offset, buf),
            Backing::File(f) => f.read_at(offset, buf),
        }
    }

    fn write_at(&mut self, offset: u64, data: &[u8]) -> Result<()> {
        match self {
            Backing::Memory(m) => m.write_at(offset, data),
            Backing::File(f) => f.write_at(offset, data),
        }
    }

    fn flush(&mut self, durability: CommitDurability) -> Result<()> {
        match self {
            Backing::Memory(m) => m.flush(durability),
            Backing::File(f) => f.flush(durability),
        }
    }

    fn write_count(&self) -> u64 {
        match self {
            Backing::Memory(m) => m.write_count(),
            Backing::File(f) => f.write_count(),
        }
    }
}
