//! Configuration for genstore
//!
//! Centralized engine configuration with sensible defaults.

/// Main configuration for an [`Engine`](crate::Engine) instance
#[derive(Debug, Clone)]
pub struct StoreConfig {
    // -------------------------------------------------------------------------
    // Memory Store Configuration
    // -------------------------------------------------------------------------
    /// Initial capacity of a memory-backed index store, in records.
    /// The buffer doubles whenever an append would not fit.
    pub initial_records: usize,

    // -------------------------------------------------------------------------
    // Disk Store Configuration
    // -------------------------------------------------------------------------
    /// Capacity of the buffered writer in front of each disk store (bytes)
    pub write_buffer_size: usize,

    /// What a commit (and a dirty close) does after writing the header
    pub commit_durability: CommitDurability,

    // -------------------------------------------------------------------------
    // Copy Configuration
    // -------------------------------------------------------------------------
    /// Chunk size used by bulk copies between stores (bytes)
    pub copy_chunk_size: usize,

    // -------------------------------------------------------------------------
    // Registry Configuration
    // -------------------------------------------------------------------------
    /// Initial number of slots in the store and stream tables
    pub initial_slots: usize,
}

/// Durability level applied when committing a disk store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitDurability {
    /// Push buffered writes to the OS (fast, survives process exit)
    Flush,

    /// Flush and fsync the file (survives power loss)
    Sync,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            initial_records: 4096,
            write_buffer_size: 8 * 1024, // 8 KB
            commit_durability: CommitDurability::Flush,
            copy_chunk_size: 8 * 1024, // 8 KB
            initial_slots: 64,
        }
    }
}

impl StoreConfig {
    /// Create a new config builder
    pub fn builder() -> StoreConfigBuilder {
        StoreConfigBuilder::default()
    }
}

/// Builder for StoreConfig
#[derive(Default)]
pub struct StoreConfigBuilder {
    config: StoreConfig,
}

impl StoreConfigBuilder {
    /// Set the initial memory capacity of index stores (in records)
    pub fn initial_records(mut self, count: usize) -> Self {
        self.config.initial_records = count;
        self
    }

    /// Set the disk write buffer size (in bytes, 0 disables buffering)
    pub fn write_buffer_size(mut self, size: usize) -> Self {
        self.config.write_buffer_size = size;
        self
    }

    /// Set the commit durability level
    pub fn commit_durability(mut self, durability: CommitDurability) -> Self {
        self.config.commit_durability = durability;
        self
    }

    /// Set the bulk copy chunk size (in bytes)
    pub fn copy_chunk_size(mut self, size: usize) -> Self {
        self.config.copy_chunk_size = size;
        self
    }

    /// Set the initial number of registry slots
    pub fn initial_slots(mut self, count: usize) -> Self {
        self.config.initial_slots = count;
        self
    }

    pub fn build(self) -> StoreConfig {
        self.config
    }
}
