//! Index Store
//!
//! Fixed-size records addressed by a contiguous ID range that starts at an
//! ID chosen by the caller.

use std::path::Path;

use crate::backing::{Backing, FileBacking, MemoryBacking, StoreBacking};
use crate::engine::Engine;
use crate::error::{Result, StoreError};
use crate::header::{unix_now, StoreHeader, StoreKind};
use crate::registry::StoreHandle;

use super::record::DELETED_FLAG;

impl Engine {
    /// Create an empty index store.
    ///
    /// `path = None` creates a memory store sized for `initial_records`
    /// records; otherwise the file is created (or truncated). The header is
    /// written immediately and the store starts clean.
    pub fn create_index_store(
        &mut self,
        path: Option<&Path>,
        label: &str,
        element_size: usize,
        version: i32,
        first_id: i64,
    ) -> Result<StoreHandle> {
        let size = i32::try_from(element_size)
            .ok()
            .filter(|&s| s > 0)
            .ok_or_else(|| {
                StoreError::InvalidArgument(format!("element size {} is not usable", element_size))
            })?;
        let last = first_id.checked_sub(1).ok_or_else(|| {
            StoreError::InvalidArgument(format!("first id {} has no predecessor", first_id))
        })?;

        let header = StoreHeader::new(StoreKind::Index, label, size, version, first_id, last);

        let backing = match path {
            Some(p) => Backing::File(FileBacking::create(p, self.config.write_buffer_size)?),
            None => {
                let allocated = self
                    .config
                    .initial_records
                    .checked_mul(element_size)
                    .ok_or(StoreError::CapacityExhausted { required: u64::MAX })?;
                Backing::Memory(MemoryBacking::with_capacity(allocated))
            }
        };

        let handle = self.install_store(header, backing, true, true)?;
        tracing::debug!(
            store = %handle,
            label,
            element_size,
            first_id,
            memory = path.is_none(),
            "created index store"
        );
        Ok(handle)
    }

    /// Empty an index store in place so it starts again at `first_id`
    pub fn reset_index_store(&mut self, handle: StoreHandle, first_id: i64) -> Result<()> {
        let store = self.store_mut(handle)?;
        store.expect_kind(StoreKind::Index)?;
        store.ensure_writable()?;

        let last = first_id.checked_sub(1).ok_or_else(|| {
            StoreError::InvalidArgument(format!("first id {} has no predecessor", first_id))
        })?;

        store.header.first_elem = first_id;
        store.header.last_elem = last;
        store.header.creation_time = unix_now();
        store.last_committed_elem = -1;
        store.write_header()?;
        store.dirty = false;

        tracing::debug!(store = %handle, first_id, "reset index store");
        Ok(())
    }

    /// Append one record after the current last element.
    ///
    /// Returns the index the record landed on.
    pub fn append(&mut self, handle: StoreHandle, record: &[u8]) -> Result<i64> {
        let store = self.store_mut(handle)?;
        store.expect_kind(StoreKind::Index)?;
        store.ensure_writable()?;
        check_record_len(handle, store.element_size(), record.len())?;

        let index = store
            .header
            .last_elem
            .checked_add(1)
            .filter(|&next| next < i64::MAX)
            .ok_or(StoreError::OutOfRange {
                handle,
                index: i64::MAX,
                first: store.header.first_elem,
                last: store.header.last_elem,
            })?;
        let offset = store.index_offset(index);
        tracing::trace!(store = %handle, index, offset, "append record");

        store.dirty = true;
        store.backing.write_at(offset, record)?;
        store.header.last_elem = index;
        Ok(index)
    }

    /// Overwrite an existing record in place
    pub fn set(&mut self, handle: StoreHandle, index: i64, record: &[u8]) -> Result<()> {
        let store = self.store_mut(handle)?;
        store.expect_kind(StoreKind::Index)?;
        store.ensure_writable()?;
        store.check_index(index)?;
        check_record_len(handle, store.element_size(), record.len())?;

        let offset = store.index_offset(index);
        tracing::trace!(store = %handle, index, offset, "set record");

        store.dirty = true;
        store.backing.write_at(offset, record)
    }

    /// Read a record into a new buffer.
    ///
    /// The deleted bit is returned as stored; see [`crate::record`].
    pub fn get(&mut self, handle: StoreHandle, index: i64) -> Result<Vec<u8>> {
        let size = self.store(handle)?.element_size();
        let mut record = vec![0u8; size];
        self.get_into(handle, index, &mut record)?;
        Ok(record)
    }

    /// Read a record into the first `element_size` bytes of `buf`
    pub fn get_into(&mut self, handle: StoreHandle, index: i64, buf: &mut [u8]) -> Result<()> {
        let store = self.store_mut(handle)?;
        store.expect_kind(StoreKind::Index)?;
        store.check_index(index)?;

        let size = store.element_size();
        if buf.len() < size {
            return Err(StoreError::InvalidArgument(format!(
                "buffer of {} bytes cannot hold a {}-byte record",
                buf.len(),
                size
            )));
        }

        let offset = store.index_offset(index);
        store.backing.read_at(offset, &mut buf[..size])
    }

    /// Soft-delete a record by setting the top bit of its first byte.
    ///
    /// Only that one byte is read and rewritten.
    pub fn delete(&mut self, handle: StoreHandle, index: i64) -> Result<()> {
        let store = self.store_mut(handle)?;
        store.expect_kind(StoreKind::Index)?;
        store.ensure_writable()?;
        store.check_index(index)?;

        let offset = store.index_offset(index);
        let mut flags = [0u8; 1];
        store.backing.read_at(offset, &mut flags)?;
        flags[0] |= DELETED_FLAG;

        store.dirty = true;
        store.backing.write_at(offset, &flags)?;
        tracing::trace!(store = %handle, index, "deleted record");
        Ok(())
    }

    /// True if the record at `index` carries the deleted bit
    pub fn is_deleted(&mut self, handle: StoreHandle, index: i64) -> Result<bool> {
        let store = self.store_mut(handle)?;
        store.expect_kind(StoreKind::Index)?;
        store.check_index(index)?;

        let offset = store.index_offset(index);
        let mut flags = [0u8; 1];
        store.backing.read_at(offset, &mut flags)?;
        Ok(flags[0] & DELETED_FLAG != 0)
    }

    /// Borrow a record of a memory-backed index store without copying
    pub fn record_slice(&self, handle: StoreHandle, index: i64) -> Result<&[u8]> {
        let store = self.store(handle)?;
        store.expect_kind(StoreKind::Index)?;
        store.check_index(index)?;

        match &store.backing {
            Backing::Memory(mem) => mem.slice(store.index_offset(index), store.element_size()),
            Backing::File(_) => Err(StoreError::NotInMemory(handle)),
        }
    }
}

fn check_record_len(handle: StoreHandle, expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(StoreError::InvalidArgument(format!(
            "{} holds {}-byte records, got {} bytes",
            handle, expected, actual
        )));
    }
    Ok(())
}
