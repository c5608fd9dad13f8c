//! String and VLRecord Stores
//!
//! Append-only runs of variable-length blocks addressed by byte offset.
//! `last_elem` is the high-water mark: the offset of the next append.
//!
//! ## Block Formats
//! ```text
//! string:   [Bytes ...][0x00]
//! vlrecord: [Len: u32 LE][Payload: Len bytes]
//! ```

use std::path::Path;

use crate::backing::{Backing, FileBacking, MemoryBacking, StoreBacking};
use crate::engine::Engine;
use crate::error::{Result, StoreError};
use crate::header::{unix_now, StoreHeader, StoreKind};
use crate::registry::StoreHandle;

use super::LENGTH_PREFIX_SIZE;

impl Engine {
    // =========================================================================
    // Creation
    // =========================================================================

    /// Create an empty string store.
    ///
    /// `expected_size` is advisory: it is recorded in the header and sizes
    /// the initial buffer of a memory store.
    pub fn create_string_store(
        &mut self,
        path: Option<&Path>,
        label: &str,
        expected_size: usize,
        version: i32,
    ) -> Result<StoreHandle> {
        self.create_byte_store(StoreKind::String, path, label, expected_size, version)
    }

    /// Create an empty vlrecord store
    pub fn create_vlrecord_store(
        &mut self,
        path: Option<&Path>,
        label: &str,
        expected_size: usize,
        version: i32,
    ) -> Result<StoreHandle> {
        self.create_byte_store(StoreKind::VLRecord, path, label, expected_size, version)
    }

    fn create_byte_store(
        &mut self,
        kind: StoreKind,
        path: Option<&Path>,
        label: &str,
        expected_size: usize,
        version: i32,
    ) -> Result<StoreHandle> {
        let expected = i32::try_from(expected_size).map_err(|_| {
            StoreError::InvalidArgument(format!("expected size {} is too large", expected_size))
        })?;
        let header = StoreHeader::new(kind, label, expected, version, 0, 0);

        let backing = match path {
            Some(p) => Backing::File(FileBacking::create(p, self.config.write_buffer_size)?),
            None => Backing::Memory(MemoryBacking::with_capacity(expected_size)),
        };

        let handle = self.install_store(header, backing, true, true)?;
        tracing::debug!(
            store = %handle,
            %kind,
            label,
            expected_size,
            memory = path.is_none(),
            "created byte store"
        );
        Ok(handle)
    }

    /// Empty a string or vlrecord store in place
    pub fn reset_string_store(&mut self, handle: StoreHandle) -> Result<()> {
        let store = self.store_mut(handle)?;
        if !store.header.kind.is_byte_addressed() {
            store.expect_kind(StoreKind::String)?;
        }
        store.ensure_writable()?;

        store.header.first_elem = 0;
        store.header.last_elem = 0;
        store.header.creation_time = unix_now();
        store.last_committed_elem = -1;
        store.write_header()?;
        store.dirty = false;

        tracing::debug!(store = %handle, "reset byte store");
        Ok(())
    }

    // =========================================================================
    // String Operations
    // =========================================================================

    /// Append a string and its NUL terminator.
    ///
    /// Returns the offset the string starts at. Strings may not contain NUL.
    pub fn append_string(&mut self, handle: StoreHandle, value: &str) -> Result<i64> {
        if value.as_bytes().contains(&0) {
            return Err(StoreError::InvalidArgument(
                "string contains an interior NUL byte".to_string(),
            ));
        }

        let store = self.store_mut(handle)?;
        store.expect_kind(StoreKind::String)?;
        store.ensure_writable()?;

        let offset = store.header.last_elem;
        let physical = store.byte_offset(offset);

        let mut block = Vec::with_capacity(value.len() + 1);
        block.extend_from_slice(value.as_bytes());
        block.push(0);

        tracing::trace!(store = %handle, offset, len = value.len(), "append string");
        store.dirty = true;
        store.backing.write_at(physical, &block)?;
        store.header.last_elem += block.len() as i64;
        Ok(offset)
    }

    /// Read the string starting at `offset`.
    ///
    /// At most `max_len` bytes are examined. A string that reaches the end
    /// of the store without a terminator is returned as is; one that is
    /// still going after `max_len` bytes is an error.
    pub fn get_string(&mut self, handle: StoreHandle, offset: i64, max_len: usize) -> Result<String> {
        let store = self.store_mut(handle)?;
        store.expect_kind(StoreKind::String)?;
        store.check_byte_offset(offset)?;

        let remaining = (store.header.last_elem - offset) as u64;
        let window = remaining.min(max_len as u64) as usize;

        let mut bytes = vec![0u8; window];
        let physical = store.byte_offset(offset);
        store.backing.read_at(physical, &mut bytes)?;

        match bytes.iter().position(|&b| b == 0) {
            Some(nul) => bytes.truncate(nul),
            None if (window as u64) < remaining => {
                tracing::warn!(store = %handle, offset, max_len, "string longer than buffer");
                return Err(StoreError::CorruptLength {
                    handle,
                    offset,
                    length: remaining,
                    end: store.header.last_elem,
                    max_length: max_len,
                });
            }
            None => {}
        }

        String::from_utf8(bytes).map_err(|e| {
            StoreError::Serialization(format!("string at offset {} in {}: {}", offset, handle, e))
        })
    }

    // =========================================================================
    // VLRecord Operations
    // =========================================================================

    /// Append a length-prefixed record.
    ///
    /// Returns the offset of the length prefix, which is the record's key.
    pub fn append_vlrecord(&mut self, handle: StoreHandle, payload: &[u8]) -> Result<i64> {
        let length = u32::try_from(payload.len()).map_err(|_| {
            StoreError::InvalidArgument(format!("record of {} bytes is too long", payload.len()))
        })?;

        let store = self.store_mut(handle)?;
        store.expect_kind(StoreKind::VLRecord)?;
        store.ensure_writable()?;

        let offset = store.header.last_elem;
        let physical = store.byte_offset(offset);

        tracing::trace!(store = %handle, offset, length, "append vlrecord");
        store.dirty = true;
        store.backing.write_at(physical, &length.to_le_bytes())?;
        if !payload.is_empty() {
            store
                .backing
                .write_at(physical + LENGTH_PREFIX_SIZE, payload)?;
        }
        store.header.last_elem += LENGTH_PREFIX_SIZE as i64 + i64::from(length);
        Ok(offset)
    }

    /// Read the record at `offset` into a new buffer of at most `max_len` bytes
    pub fn get_vlrecord(&mut self, handle: StoreHandle, offset: i64, max_len: usize) -> Result<Vec<u8>> {
        let (physical, length) = self.vlrecord_extent(handle, offset, max_len)?;

        let mut payload = vec![0u8; length];
        if length > 0 {
            self.store_mut(handle)?.backing.read_at(physical, &mut payload)?;
        }
        Ok(payload)
    }

    /// Read the record at `offset` into `buf`, returning its length.
    ///
    /// `buf.len()` is the maximum accepted length.
    pub fn get_vlrecord_into(&mut self, handle: StoreHandle, offset: i64, buf: &mut [u8]) -> Result<usize> {
        let (physical, length) = self.vlrecord_extent(handle, offset, buf.len())?;

        if length > 0 {
            self.store_mut(handle)?
                .backing
                .read_at(physical, &mut buf[..length])?;
        }
        Ok(length)
    }

    /// Decode and validate the length prefix at `offset`.
    ///
    /// Returns the physical payload offset and the payload length. Fails
    /// before any payload byte is read if the length runs past the end of
    /// the store or past `max_len`.
    fn vlrecord_extent(&mut self, handle: StoreHandle, offset: i64, max_len: usize) -> Result<(u64, usize)> {
        let store = self.store_mut(handle)?;
        store.expect_kind(StoreKind::VLRecord)?;
        store.check_byte_offset(offset)?;

        let end = store.header.last_elem;
        if offset + LENGTH_PREFIX_SIZE as i64 > end {
            tracing::warn!(store = %handle, offset, end, "length prefix past end of store");
            return Err(StoreError::CorruptLength {
                handle,
                offset,
                length: LENGTH_PREFIX_SIZE,
                end,
                max_length: max_len,
            });
        }

        let physical = store.byte_offset(offset);
        let mut prefix = [0u8; LENGTH_PREFIX_SIZE as usize];
        store.backing.read_at(physical, &mut prefix)?;
        let length = u32::from_le_bytes(prefix) as u64;

        let record_end = offset + (LENGTH_PREFIX_SIZE + length) as i64;
        if record_end > end || length > max_len as u64 {
            tracing::warn!(
                store = %handle,
                offset,
                length,
                end,
                max_len,
                "inconsistent vlrecord length"
            );
            return Err(StoreError::CorruptLength {
                handle,
                offset,
                length,
                end,
                max_length: max_len,
            });
        }

        Ok((physical + LENGTH_PREFIX_SIZE, length as usize))
    }
}
