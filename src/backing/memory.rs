//! Memory backing
//!
//! Owned buffer whose allocated size only ever doubles.

use crate::config::CommitDurability;
use crate::error::{Result, StoreError};

use super::StoreBacking;

/// Memory-resident byte buffer.
///
/// `buffer.len()` is the allocated size. Bytes past the store's logical end
/// are zero-filled and never exposed by the store layer.
#[derive(Debug)]
pub struct MemoryBacking {
    buffer: Vec<u8>,
    writes: u64,
}

impl MemoryBacking {
    /// Allocate a zeroed buffer of `allocated` bytes
    pub fn with_capacity(allocated: usize) -> Self {
        Self {
            buffer: vec![0u8; allocated],
            writes: 0,
        }
    }

    /// Current allocated size in bytes
    pub fn allocated(&self) -> usize {
        self.buffer.len()
    }

    /// Borrow `len` bytes at `offset` without copying
    pub fn slice(&self, offset: u64, len: usize) -> Result<&[u8]> {
        let start = self.check_range(offset, len as u64)?;
        Ok(&self.buffer[start..start + len])
    }

    /// Double the allocation until it is strictly larger than `required`
    pub fn ensure_capacity(&mut self, required: u64) -> Result<()> {
        let mut allocated = self.buffer.len() as u64;
        if allocated > required {
            return Ok(());
        }

        allocated = allocated.max(1);
        while allocated <= required {
            allocated = allocated
                .checked_mul(2)
                .ok_or(StoreError::CapacityExhausted { required })?;
        }
        let allocated =
            usize::try_from(allocated).map_err(|_| StoreError::CapacityExhausted { required })?;

        tracing::trace!(from = self.buffer.len(), to = allocated, "growing memory store");
        self.buffer.resize(allocated, 0);
        Ok(())
    }

    fn check_range(&self, offset: u64, len: u64) -> Result<usize> {
        let size = self.buffer.len() as u64;
        match offset.checked_add(len) {
            Some(end) if end <= size => Ok(offset as usize),
            _ => Err(StoreError::ByteRange { offset, len, size }),
        }
    }
}

impl StoreBacking for MemoryBacking {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<()> {
        let start = self.check_range(offset, buf.len() as u64)?;
        buf.copy_from_slice(&self.buffer[start..start + buf.len()]);
        Ok(())
    }

    fn write_at(&mut self, offset: u64, data: &[u8]) -> Result<()> {
        let end = offset
            .checked_add(data.len() as u64)
            .ok_or(StoreError::CapacityExhausted { required: u64::MAX })?;
        self.ensure_capacity(end)?;

        let start = offset as usize;
        self.buffer[start..start + data.len()].copy_from_slice(data);
        self.writes += 1;
        Ok(())
    }

    fn flush(&mut self, _durability: CommitDurability) -> Result<()> {
        Ok(())
    }

    fn write_count(&self) -> u64 {
        self.writes
    }
}
