//! # genstore
//!
//! A generic record store engine for an assembly pipeline:
//! - Index stores of fixed-size records addressed by a contiguous ID range
//! - String stores of NUL-terminated strings addressed by byte offset
//! - VLRecord stores of length-prefixed blobs addressed by byte offset
//! - Forward-only streams over any store
//! - Partial materialization of disk stores into memory
//!
//! Every store is either a disk file or a memory buffer with the same image
//! layout, so a memory store can be dumped and reopened from disk unchanged.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          Engine                              │
//! │        (StoreHandle / StreamHandle, generation-checked)      │
//! └──────────────┬──────────────────────────────┬───────────────┘
//!                │                              │
//!                ▼                              ▼
//!        ┌───────────────┐              ┌───────────────┐
//!        │ Store Registry│◀─────────────│Stream Registry│
//!        └───────┬───────┘   bound to   └───────────────┘
//!                │
//!                ▼
//!        ┌───────────────┐
//!        │     Store     │  header + dirty / commit bookkeeping
//!        └───────┬───────┘
//!                │
//!        ┌───────┴────────┐
//!        ▼                ▼
//!   ┌─────────┐     ┌──────────┐
//!   │ Memory  │     │   File   │
//!   │ (Vec)   │     │(BufWriter)│
//!   └─────────┘     └──────────┘
//! ```
//!
//! ## Image Layout
//!
//! ```text
//! [Header: 64 bytes][Content ...]
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod header;
pub mod registry;
pub mod backing;
pub mod store;
pub mod stream;
pub mod copy;
pub mod engine;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{Result, StoreError};
pub use config::{CommitDurability, StoreConfig};
pub use engine::{Engine, SharedEngine};
pub use header::{StoreHeader, StoreKind, HEADER_SIZE};
pub use registry::{SlotStatus, StoreHandle, StreamHandle};
pub use backing::OpenMode;
pub use store::{record, LENGTH_PREFIX_SIZE};
pub use stream::StreamRecords;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of genstore
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
