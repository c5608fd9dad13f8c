//! Stream Module
//!
//! Forward-only cursors over a store.
//!
//! ## State Machine
//! ```text
//!   open ──▶ Opened ──next──▶ Opened ... ──next──▶ Exhausted ──close──▶ Closed
//!               │                                     │
//!               └───────────reset(start, end)─────────┘
//! ```
//!
//! ## Advance Rules
//! - Index store: `start += 1` (or the stride of `k_next_record`);
//!   exhausted when `start > end`
//! - String store: `start += len + 1`; exhausted when `start >= end`
//! - VLRecord store: `start += len + 4`; exhausted when `start >= end`
//!
//! Byte-addressed stores use an exclusive end because `last_elem` is the
//! offset of the next append, not of the last block.

mod iterator;

pub use iterator::StreamRecords;

use crate::engine::Engine;
use crate::error::{Result, StoreError};
use crate::header::StoreKind;
use crate::registry::{StoreHandle, StreamHandle};
use crate::store::LENGTH_PREFIX_SIZE;

/// An open cursor, owned by its registry slot
#[derive(Debug)]
pub(crate) struct Stream {
    /// Store being read; not kept alive by the stream
    pub(crate) store: StoreHandle,
    /// Kind of the store at open time
    pub(crate) kind: StoreKind,
    /// Next index or offset to read
    pub(crate) start: i64,
    /// Last index (inclusive) or end offset (exclusive)
    pub(crate) end: i64,
    /// Caller's prefetch buffer, handed back on close
    pub(crate) prefetch: Option<Vec<u8>>,
}

impl Stream {
    fn is_exhausted(&self) -> bool {
        match self.kind {
            StoreKind::Index => self.start > self.end,
            StoreKind::String | StoreKind::VLRecord => self.start >= self.end,
        }
    }
}

impl Engine {
    // =========================================================================
    // Stream Lifecycle
    // =========================================================================

    /// Open a stream over the whole current range of a store
    pub fn open_stream(&mut self, store: StoreHandle, prefetch: Option<Vec<u8>>) -> Result<StreamHandle> {
        let header = &self.store(store)?.header;
        let (kind, start, end) = (header.kind, header.first_elem, header.last_elem);

        let raw = self.streams.insert_with(|_| {
            Ok(Stream {
                store,
                kind,
                start,
                end,
                prefetch,
            })
        })?;
        let handle = StreamHandle(raw);

        tracing::debug!(stream = %handle, %store, start, end, "opened stream");
        Ok(handle)
    }

    /// Open a stream over a string or vlrecord store starting at `start_offset`
    pub fn open_string_stream(
        &mut self,
        store: StoreHandle,
        start_offset: i64,
        prefetch: Option<Vec<u8>>,
    ) -> Result<StreamHandle> {
        let kind = self.store(store)?.header.kind;
        if !kind.is_byte_addressed() {
            return Err(StoreError::WrongKind {
                handle: store,
                expected: StoreKind::String,
                found: kind,
            });
        }

        let handle = self.open_stream(store, prefetch)?;
        self.reset_stream(handle, Some(start_offset), None)?;
        Ok(handle)
    }

    /// Re-bound a stream. `None` means the store's current first / last element.
    pub fn reset_stream(&mut self, stream: StreamHandle, start: Option<i64>, end: Option<i64>) -> Result<()> {
        let store = self.stream(stream)?.store;
        let header = &self.store(store)?.header;
        let (first, last) = (header.first_elem, header.last_elem);

        let s = self.stream_mut(stream)?;
        s.start = start.unwrap_or(first);
        s.end = end.unwrap_or(last);
        Ok(())
    }

    /// Close a stream, handing back the prefetch buffer it was opened with
    pub fn close_stream(&mut self, stream: StreamHandle) -> Result<Option<Vec<u8>>> {
        let s = self
            .streams
            .remove(stream.0)
            .ok_or(StoreError::InvalidStream(stream))?;
        tracing::debug!(%stream, "closed stream");
        Ok(s.prefetch)
    }

    /// Next index or offset the stream will read
    pub fn stream_position(&self, stream: StreamHandle) -> Result<i64> {
        Ok(self.stream(stream)?.start)
    }

    /// Current `(start, end)` bounds of the stream
    pub fn stream_bounds(&self, stream: StreamHandle) -> Result<(i64, i64)> {
        let s = self.stream(stream)?;
        Ok((s.start, s.end))
    }

    // =========================================================================
    // Advancing
    // =========================================================================

    /// Next record of an index stream, or None when exhausted
    pub fn next_record(&mut self, stream: StreamHandle) -> Result<Option<Vec<u8>>> {
        self.k_next_record(stream, 1)
    }

    /// Next record of an index stream into `buf`; false when exhausted
    pub fn next_record_into(&mut self, stream: StreamHandle, buf: &mut [u8]) -> Result<bool> {
        let Some((store, index)) = self.cursor(stream, StoreKind::Index)? else {
            return Ok(false);
        };
        self.get_into(store, index, buf)?;
        self.stream_mut(stream)?.start += 1;
        Ok(true)
    }

    /// Read the record under the cursor, then advance by `stride` records
    pub fn k_next_record(&mut self, stream: StreamHandle, stride: i64) -> Result<Option<Vec<u8>>> {
        if stride < 1 {
            return Err(StoreError::InvalidArgument(format!(
                "stream stride must be positive, got {}",
                stride
            )));
        }

        let Some((store, index)) = self.cursor(stream, StoreKind::Index)? else {
            return Ok(None);
        };
        let record = self.get(store, index)?;
        self.stream_mut(stream)?.start = index.saturating_add(stride);
        Ok(Some(record))
    }

    /// Next string of a string stream, or None when exhausted
    pub fn next_string(&mut self, stream: StreamHandle, max_len: usize) -> Result<Option<String>> {
        let Some((store, offset)) = self.cursor(stream, StoreKind::String)? else {
            return Ok(None);
        };
        let value = self.get_string(store, offset, max_len)?;
        self.stream_mut(stream)?.start = offset + value.len() as i64 + 1;
        Ok(Some(value))
    }

    /// Next record of a vlrecord stream, or None when exhausted
    pub fn next_vlrecord(&mut self, stream: StreamHandle, max_len: usize) -> Result<Option<Vec<u8>>> {
        let Some((store, offset)) = self.cursor(stream, StoreKind::VLRecord)? else {
            return Ok(None);
        };
        let payload = self.get_vlrecord(store, offset, max_len)?;
        self.stream_mut(stream)?.start = offset + LENGTH_PREFIX_SIZE as i64 + payload.len() as i64;
        Ok(Some(payload))
    }

    /// Iterate the remaining records of any stream
    pub fn records(&mut self, stream: StreamHandle) -> StreamRecords<'_> {
        StreamRecords::new(self, stream)
    }

    // =========================================================================
    // Internal Helpers
    // =========================================================================

    pub(crate) fn stream(&self, handle: StreamHandle) -> Result<&Stream> {
        self.streams
            .get(handle.0)
            .ok_or(StoreError::InvalidStream(handle))
    }

    pub(crate) fn stream_mut(&mut self, handle: StreamHandle) -> Result<&mut Stream> {
        self.streams
            .get_mut(handle.0)
            .ok_or(StoreError::InvalidStream(handle))
    }

    /// Store and position under the cursor, None if exhausted
    fn cursor(&self, stream: StreamHandle, expected: StoreKind) -> Result<Option<(StoreHandle, i64)>> {
        let s = self.stream(stream)?;
        // The store must still be open even if the stream is exhausted.
        self.store(s.store)?;

        if s.kind != expected {
            return Err(StoreError::WrongKind {
                handle: s.store,
                expected,
                found: s.kind,
            });
        }
        if s.is_exhausted() {
            tracing::trace!(%stream, start = s.start, end = s.end, "stream exhausted");
            return Ok(None);
        }
        Ok(Some((s.store, s.start)))
    }
}
