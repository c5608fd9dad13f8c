//! Engine Module
//!
//! The context object that owns every open store and stream.
//!
//! ## Responsibilities
//! - Own the store and stream registries
//! - Create, open, commit and close stores
//! - Expose header statistics for domain wrappers
//!
//! Record, string, stream and copy operations are further `impl Engine`
//! blocks in their own modules.

use std::path::Path;
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use crate::backing::{Backing, FileBacking, OpenMode, StoreBacking};
use crate::config::StoreConfig;
use crate::error::{Result, StoreError};
use crate::header::{StoreHeader, HEADER_SIZE};
use crate::registry::{Registry, SlotStatus, StoreHandle, StreamHandle};
use crate::store::Store;
use crate::stream::Stream;

/// The store engine
///
/// ## Concurrency Model
///
/// Single-threaded: every operation takes `&mut self` (or `&self` for pure
/// lookups) and runs to completion. Streams never lock their store; a
/// writer that appends to a store while a stream is open simply becomes
/// visible to the stream if the stream's bounds cover the new data.
///
/// Use [`SharedEngine`] to share one engine between threads.
pub struct Engine {
    /// Engine configuration
    pub(crate) config: StoreConfig,

    /// Open stores
    pub(crate) stores: Registry<Store>,

    /// Open streams
    pub(crate) streams: Registry<Stream>,
}

impl Engine {
    /// Create an engine with the given config
    pub fn new(config: StoreConfig) -> Self {
        let slots = config.initial_slots;
        Self {
            config,
            stores: Registry::with_capacity("store", slots),
            streams: Registry::with_capacity("stream", slots),
        }
    }

    // =========================================================================
    // Store Lifecycle
    // =========================================================================

    /// Open an existing disk store and read its header back
    pub fn open_store(&mut self, path: &Path, mode: OpenMode) -> Result<StoreHandle> {
        let mut file = FileBacking::open(path, mode, self.config.write_buffer_size)?;

        let file_len = file.file_len()?;
        if file_len < HEADER_SIZE {
            return Err(StoreError::CorruptHeader(format!(
                "{} is {} bytes, shorter than a header",
                path.display(),
                file_len
            )));
        }

        let mut backing = Backing::File(file);
        let header = Store::read_header(&mut backing)?;

        let required = HEADER_SIZE.saturating_add(header.content_len());
        if file_len < required {
            return Err(StoreError::CorruptHeader(format!(
                "{} is {} bytes, header describes {}",
                path.display(),
                file_len,
                required
            )));
        }

        let handle = self.install_store(header, backing, mode == OpenMode::ReadWrite, false)?;
        tracing::debug!(store = %handle, path = %path.display(), ?mode, "opened store");
        Ok(handle)
    }

    /// Open a disk store read-only and pull its whole content into memory.
    ///
    /// The disk handle is closed; only the returned memory store remains.
    pub fn load_store(&mut self, path: &Path) -> Result<StoreHandle> {
        let disk = self.open_store(path, OpenMode::ReadOnly)?;
        self.materialize_partial(disk, None, None)
    }

    /// Persist the header and flush buffered writes if the store is dirty.
    ///
    /// A second commit with no mutation in between writes nothing.
    pub fn commit(&mut self, handle: StoreHandle) -> Result<()> {
        let durability = self.config.commit_durability;
        self.store_mut(handle)?.commit(durability)?;
        Ok(())
    }

    /// Close a store and free its slot.
    ///
    /// Disk stores with uncommitted changes get their header written first.
    /// The handle, and any stream still bound to it, is invalid afterwards.
    pub fn close(&mut self, handle: StoreHandle) -> Result<()> {
        let store = self
            .stores
            .remove(handle.0)
            .ok_or(StoreError::InvalidHandle(handle))?;
        store.close(self.config.commit_durability)
    }

    /// Close every open stream and store.
    ///
    /// Returns the first error, after attempting to close everything.
    pub fn shutdown(&mut self) -> Result<()> {
        for raw in self.streams.handles() {
            self.streams.remove(raw);
        }

        let mut first_err = None;
        for raw in self.stores.handles() {
            if let Err(e) = self.close(StoreHandle(raw)) {
                tracing::warn!(store = %StoreHandle(raw), error = %e, "close failed during shutdown");
                first_err.get_or_insert(e);
            }
        }

        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    // =========================================================================
    // Header Statistics
    // =========================================================================

    /// Copy of the store's current (possibly uncommitted) header
    pub fn stats(&self, handle: StoreHandle) -> Result<StoreHeader> {
        Ok(self.store(handle)?.header.clone())
    }

    /// First valid index (index stores) or first byte offset
    pub fn first_elem(&self, handle: StoreHandle) -> Result<i64> {
        Ok(self.store(handle)?.header.first_elem)
    }

    /// Last valid index (index stores) or byte high-water mark
    pub fn last_elem(&self, handle: StoreHandle) -> Result<i64> {
        Ok(self.store(handle)?.header.last_elem)
    }

    /// `last_elem - first_elem + 1` for index stores
    pub fn record_count(&self, handle: StoreHandle) -> Result<i64> {
        Ok(self.store(handle)?.header.record_count())
    }

    /// `last_elem` at the most recent commit, or -1
    pub fn last_committed_elem(&self, handle: StoreHandle) -> Result<i64> {
        Ok(self.store(handle)?.last_committed_elem)
    }

    /// True if the store changed since its last commit
    pub fn is_dirty(&self, handle: StoreHandle) -> Result<bool> {
        Ok(self.store(handle)?.dirty)
    }

    /// True for memory-resident stores
    pub fn is_memory_backed(&self, handle: StoreHandle) -> Result<bool> {
        Ok(self.store(handle)?.backing.is_memory())
    }

    /// Number of raw writes the store's backing has performed
    pub fn write_count(&self, handle: StoreHandle) -> Result<u64> {
        Ok(self.store(handle)?.backing.write_count())
    }

    /// Set or clear the whole-store deleted flag; persisted on commit
    pub fn set_store_deleted(&mut self, handle: StoreHandle, deleted: bool) -> Result<()> {
        let store = self.store_mut(handle)?;
        store.ensure_writable()?;
        store.header.is_deleted = deleted;
        store.dirty = true;
        Ok(())
    }

    /// Current header image followed by the logical content bytes
    pub fn export_image(&mut self, handle: StoreHandle) -> Result<Vec<u8>> {
        let store = self.store_mut(handle)?;
        let end = store.content_end();

        let mut image = vec![0u8; end as usize];
        image[..HEADER_SIZE as usize].copy_from_slice(&store.header.encode()?);
        store
            .backing
            .read_at(HEADER_SIZE, &mut image[HEADER_SIZE as usize..])?;
        Ok(image)
    }

    // =========================================================================
    // Registry Introspection
    // =========================================================================

    /// Number of open stores
    pub fn open_store_count(&self) -> usize {
        self.stores.live()
    }

    /// Number of open streams
    pub fn open_stream_count(&self) -> usize {
        self.streams.live()
    }

    /// Current capacity of the store table
    pub fn store_capacity(&self) -> usize {
        self.stores.capacity()
    }

    /// Status of the store slot at `index`, None past the end of the table
    pub fn store_slot_status(&self, index: u32) -> Option<SlotStatus> {
        self.stores.status(index)
    }

    /// True if the handle refers to a live store
    pub fn is_valid(&self, handle: StoreHandle) -> bool {
        self.stores.get(handle.0).is_some()
    }

    /// True if the handle refers to a live stream
    pub fn is_valid_stream(&self, handle: StreamHandle) -> bool {
        self.streams.get(handle.0).is_some()
    }

    /// Get the configuration
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    // =========================================================================
    // Internal Helpers
    // =========================================================================

    pub(crate) fn store(&self, handle: StoreHandle) -> Result<&Store> {
        self.stores
            .get(handle.0)
            .ok_or(StoreError::InvalidHandle(handle))
    }

    pub(crate) fn store_mut(&mut self, handle: StoreHandle) -> Result<&mut Store> {
        self.stores
            .get_mut(handle.0)
            .ok_or(StoreError::InvalidHandle(handle))
    }

    /// Put a store into a fresh slot, optionally persisting its header first
    pub(crate) fn install_store(
        &mut self,
        header: StoreHeader,
        backing: Backing,
        writable: bool,
        persist_header: bool,
    ) -> Result<StoreHandle> {
        let raw = self.stores.insert_with(|raw| {
            let mut store = Store::new(StoreHandle(raw), header, backing, writable);
            if persist_header {
                store.write_header()?;
            }
            Ok(store)
        })?;
        Ok(StoreHandle(raw))
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        if self.stores.live() > 0 {
            let _ = self.shutdown();
        }
    }
}

// =============================================================================
// Shared Engine
// =============================================================================

/// An engine behind one mutex, for use from several threads.
///
/// Every operation holds the lock for its full duration, so a writer never
/// interleaves with a reader mid-record.
#[derive(Clone)]
pub struct SharedEngine {
    inner: Arc<Mutex<Engine>>,
}

impl SharedEngine {
    /// Wrap an engine
    pub fn new(engine: Engine) -> Self {
        Self {
            inner: Arc::new(Mutex::new(engine)),
        }
    }

    /// Lock the engine for a sequence of operations
    pub fn lock(&self) -> MutexGuard<'_, Engine> {
        self.inner.lock()
    }

    /// Run one closure with the engine locked
    pub fn with<R>(&self, f: impl FnOnce(&mut Engine) -> R) -> R {
        f(&mut self.inner.lock())
    }
}
