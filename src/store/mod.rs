//! Store Module
//!
//! One open store: its header, its backing, and the bookkeeping that decides
//! when the header has to be written back.
//!
//! ## Offsets
//! ```text
//! index store:     offset(i) = HEADER_SIZE + (i - firstElem) * elementSize
//! string/vlrecord: offset(o) = HEADER_SIZE + (o - firstElem)
//! ```
//!
//! ## Content Layout
//! - Index: `lastElem - firstElem + 1` records of exactly `elementSize` bytes
//! - String: NUL-terminated strings, back to back
//! - VLRecord: `[Len: u32 LE][Payload]` pairs, back to back
//!
//! The operations themselves live in [`index`] and [`string`] as methods on
//! [`Engine`](crate::Engine).

pub mod index;
pub mod record;
pub mod string;

use crate::backing::{Backing, StoreBacking};
use crate::config::CommitDurability;
use crate::error::{Result, StoreError};
use crate::header::{StoreHeader, StoreKind, HEADER_SIZE};
use crate::registry::StoreHandle;

/// Size of the length prefix in front of every vlrecord payload
pub const LENGTH_PREFIX_SIZE: u64 = 4;

/// An open store, owned by its registry slot
#[derive(Debug)]
pub(crate) struct Store {
    pub(crate) handle: StoreHandle,
    pub(crate) header: StoreHeader,
    pub(crate) backing: Backing,
    /// Header or content changed since the last commit
    pub(crate) dirty: bool,
    /// `lastElem` at the most recent commit, -1 if never committed
    pub(crate) last_committed_elem: i64,
    /// False for disk stores opened read-only
    pub(crate) writable: bool,
}

impl Store {
    pub(crate) fn new(
        handle: StoreHandle,
        header: StoreHeader,
        backing: Backing,
        writable: bool,
    ) -> Self {
        Self {
            handle,
            header,
            backing,
            dirty: false,
            last_committed_elem: -1,
            writable,
        }
    }

    // =========================================================================
    // Header Persistence
    // =========================================================================

    /// Stamp and write the header at byte 0
    pub(crate) fn write_header(&mut self) -> Result<()> {
        self.header.touch();
        let image = self.header.encode()?;
        self.backing.write_at(0, &image)
    }

    /// Read and validate the header at byte 0 of a backing
    pub(crate) fn read_header(backing: &mut Backing) -> Result<StoreHeader> {
        let mut image = [0u8; HEADER_SIZE as usize];
        backing.read_at(0, &mut image)?;
        StoreHeader::decode(&image)
    }

    /// Persist the header and flush, if anything changed.
    ///
    /// Returns true if a write happened.
    pub(crate) fn commit(&mut self, durability: CommitDurability) -> Result<bool> {
        if !self.dirty {
            return Ok(false);
        }

        self.last_committed_elem = self.header.last_elem;
        self.write_header()?;
        self.backing.flush(durability)?;
        self.dirty = false;

        tracing::debug!(
            store = %self.handle,
            last_elem = self.header.last_elem,
            "committed store"
        );
        Ok(true)
    }

    /// Release the store. Disk stores write a dirty header first.
    pub(crate) fn close(mut self, durability: CommitDurability) -> Result<()> {
        if !self.backing.is_memory() {
            if self.dirty {
                self.write_header()?;
            }
            self.backing.flush(durability)?;
        }

        tracing::debug!(store = %self.handle, kind = %self.header.kind, "closed store");
        Ok(())
    }

    // =========================================================================
    // Guards
    // =========================================================================

    pub(crate) fn expect_kind(&self, expected: StoreKind) -> Result<()> {
        if self.header.kind != expected {
            return Err(StoreError::WrongKind {
                handle: self.handle,
                expected,
                found: self.header.kind,
            });
        }
        Ok(())
    }

    pub(crate) fn ensure_writable(&self) -> Result<()> {
        if !self.writable {
            return Err(StoreError::ReadOnly(self.handle));
        }
        Ok(())
    }

    /// Require `first_elem <= index <= last_elem` on an index store
    pub(crate) fn check_index(&self, index: i64) -> Result<()> {
        let (first, last) = (self.header.first_elem, self.header.last_elem);
        if index < first || index > last {
            tracing::warn!(store = %self.handle, index, first, last, "index out of range");
            return Err(StoreError::OutOfRange {
                handle: self.handle,
                index,
                first,
                last,
            });
        }
        Ok(())
    }

    /// Require `first_elem <= offset < last_elem` on a byte-addressed store
    pub(crate) fn check_byte_offset(&self, offset: i64) -> Result<()> {
        let (first, last) = (self.header.first_elem, self.header.last_elem);
        if offset < first || offset >= last {
            tracing::warn!(store = %self.handle, offset, first, last, "offset out of range");
            return Err(StoreError::OutOfRange {
                handle: self.handle,
                index: offset,
                first,
                last,
            });
        }
        Ok(())
    }

    // =========================================================================
    // Offset Arithmetic
    // =========================================================================

    /// Physical byte offset of record `index` in an index store
    pub(crate) fn index_offset(&self, index: i64) -> u64 {
        let slot = (index - self.header.first_elem) as u64;
        HEADER_SIZE + slot * self.header.element_size as u64
    }

    /// Physical byte offset of logical `offset` in a byte-addressed store
    pub(crate) fn byte_offset(&self, offset: i64) -> u64 {
        HEADER_SIZE + (offset - self.header.first_elem) as u64
    }

    /// Physical offset one past the last content byte
    pub(crate) fn content_end(&self) -> u64 {
        HEADER_SIZE.saturating_add(self.header.content_len())
    }

    pub(crate) fn element_size(&self) -> usize {
        self.header.element_size as usize
    }
}
