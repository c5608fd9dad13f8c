//! Bulk Copy and Partial Materialization
//!
//! Moves raw byte ranges between stores, and builds memory stores that hold
//! only a slice of a (usually disk-backed) store.

use crate::backing::{Backing, MemoryBacking, StoreBacking};
use crate::engine::Engine;
use crate::error::{Result, StoreError};
use crate::header::{StoreKind, HEADER_SIZE};
use crate::registry::StoreHandle;

impl Engine {
    /// Copy the physical bytes `[source_offset, source_limit)` of `source` to
    /// `target_offset` in `target`.
    ///
    /// Offsets are absolute (the header occupies `[0, HEADER_SIZE)`), and the
    /// target offset may not land inside the header. The copy runs in
    /// `copy_chunk_size` chunks plus one remainder; a memory target is grown
    /// up front. The target's header bounds are not changed.
    ///
    /// Returns the number of bytes copied.
    pub fn bulk_copy(
        &mut self,
        source: StoreHandle,
        source_offset: u64,
        source_limit: u64,
        target: StoreHandle,
        target_offset: u64,
    ) -> Result<u64> {
        if source_limit < source_offset {
            return Err(StoreError::InvalidArgument(format!(
                "copy range [{}, {}) is inverted",
                source_offset, source_limit
            )));
        }
        if target_offset < HEADER_SIZE {
            return Err(StoreError::InvalidArgument(format!(
                "copy target offset {} overlaps the header",
                target_offset
            )));
        }

        let total = source_limit - source_offset;

        let src = self.store(source)?;
        let size = src.content_end();
        if source_limit > size {
            return Err(StoreError::ByteRange {
                offset: source_offset,
                len: total,
                size,
            });
        }

        let dst = self.store_mut(target)?;
        dst.ensure_writable()?;
        if let Backing::Memory(mem) = &mut dst.backing {
            let required = target_offset
                .checked_add(total)
                .ok_or(StoreError::CapacityExhausted { required: u64::MAX })?;
            mem.ensure_capacity(required)?;
        }
        dst.dirty = true;

        let chunk_size = self.config.copy_chunk_size.max(1) as u64;
        let full_chunks = total / chunk_size;
        let remainder = total % chunk_size;

        tracing::debug!(
            %source,
            %target,
            source_offset,
            source_limit,
            target_offset,
            full_chunks,
            remainder,
            "bulk copy"
        );

        let mut buffer = vec![0u8; chunk_size.min(total) as usize];
        let mut copied = 0u64;
        for _ in 0..full_chunks {
            self.copy_chunk(source, source_offset + copied, target, target_offset + copied, &mut buffer)?;
            copied += chunk_size;
        }
        if remainder > 0 {
            let tail = &mut buffer[..remainder as usize];
            self.copy_chunk(source, source_offset + copied, target, target_offset + copied, tail)?;
            copied += remainder;
        }

        Ok(copied)
    }

    /// Copy a sub-range of a store into a new memory store and close the source.
    ///
    /// For index stores the range is `[first, last]` in record IDs; for string
    /// and vlrecord stores it is `[first, last)` in byte offsets (the new
    /// store's `last_elem` stays a high-water mark). `None` takes the source's
    /// own bound. The new store keeps the source's header fields with the
    /// bounds narrowed, so its records keep their original IDs / offsets.
    ///
    /// The source handle is invalid afterwards, even if it was memory-backed.
    pub fn materialize_partial(
        &mut self,
        source: StoreHandle,
        first: Option<i64>,
        last: Option<i64>,
    ) -> Result<StoreHandle> {
        let src = self.store(source)?;
        let mut header = src.header.clone();
        let lo = first.unwrap_or(header.first_elem);
        let hi = last.unwrap_or(header.last_elem);

        let (source_offset, source_limit) = match header.kind {
            StoreKind::Index => {
                let in_bounds = lo >= header.first_elem && hi <= header.last_elem && lo <= hi + 1;
                if !in_bounds {
                    return Err(range_error(source, lo, hi, header.first_elem, header.last_elem));
                }
                (src.index_offset(lo), src.index_offset(hi + 1))
            }
            StoreKind::String | StoreKind::VLRecord => {
                let in_bounds = lo >= header.first_elem && hi <= header.last_elem && lo <= hi;
                if !in_bounds {
                    return Err(range_error(source, lo, hi, header.first_elem, header.last_elem));
                }
                (src.byte_offset(lo), src.byte_offset(hi))
            }
        };

        header.first_elem = lo;
        header.last_elem = hi;

        let span = source_limit - source_offset;
        let allocated = usize::try_from(HEADER_SIZE + span + 1)
            .map_err(|_| StoreError::CapacityExhausted { required: HEADER_SIZE + span + 1 })?;
        let backing = Backing::Memory(MemoryBacking::with_capacity(allocated));
        let partial = self.install_store(header, backing, true, true)?;

        if let Err(e) = self.bulk_copy(source, source_offset, source_limit, partial, HEADER_SIZE) {
            self.stores.remove(partial.0);
            return Err(e);
        }
        self.store_mut(partial)?.dirty = false;

        if let Err(e) = self.close(source) {
            self.stores.remove(partial.0);
            return Err(e);
        }

        tracing::debug!(%source, %partial, lo, hi, bytes = span, "materialized partial store");
        Ok(partial)
    }

    /// Move one chunk; `buffer.len()` is the chunk length
    fn copy_chunk(
        &mut self,
        source: StoreHandle,
        source_offset: u64,
        target: StoreHandle,
        target_offset: u64,
        buffer: &mut [u8],
    ) -> Result<()> {
        self.store_mut(source)?.backing.read_at(source_offset, buffer)?;
        self.store_mut(target)?.backing.write_at(target_offset, buffer)
    }
}

fn range_error(handle: StoreHandle, lo: i64, hi: i64, first: i64, last: i64) -> StoreError {
    tracing::warn!(store = %handle, lo, hi, first, last, "materialize range out of bounds");
    let index = if lo < first { lo } else { hi };
    StoreError::OutOfRange {
        handle,
        index,
        first,
        last,
    }
}
