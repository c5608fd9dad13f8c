//! Error types for genstore
//!
//! Provides a unified error type for all store and stream operations.
//! None of these are meant to be retried: a batch tool that receives one
//! reports it and stops.

use thiserror::Error;

use crate::header::StoreKind;
use crate::registry::{StoreHandle, StreamHandle};

/// Result type alias using StoreError
pub type Result<T> = std::result::Result<T, StoreError>;

/// Unified error type for genstore operations
#[derive(Debug, Error)]
pub enum StoreError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Handle Errors
    // -------------------------------------------------------------------------
    #[error("Invalid store handle: {0}")]
    InvalidHandle(StoreHandle),

    #[error("Invalid stream handle: {0}")]
    InvalidStream(StreamHandle),

    // -------------------------------------------------------------------------
    // Access Errors
    // -------------------------------------------------------------------------
    #[error("Index {index} out of range [{first}, {last}] in {handle}")]
    OutOfRange {
        handle: StoreHandle,
        index: i64,
        first: i64,
        last: i64,
    },

    #[error(
        "Inconsistent record length in {handle} at offset {offset}: \
         length {length}, store end {end}, max length {max_length}"
    )]
    CorruptLength {
        handle: StoreHandle,
        offset: i64,
        length: u64,
        end: i64,
        max_length: usize,
    },

    #[error("Byte range [{offset}, {offset}+{len}) exceeds {size} bytes")]
    ByteRange { offset: u64, len: u64, size: u64 },

    #[error("Store {handle} is a {found} store, expected {expected}")]
    WrongKind {
        handle: StoreHandle,
        expected: StoreKind,
        found: StoreKind,
    },

    #[error("Store {0} was opened read-only")]
    ReadOnly(StoreHandle),

    #[error("Store {0} is not memory-backed")]
    NotInMemory(StoreHandle),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // -------------------------------------------------------------------------
    // Format Errors
    // -------------------------------------------------------------------------
    #[error("Corrupt store header: {0}")]
    CorruptHeader(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Capacity Errors
    // -------------------------------------------------------------------------
    #[error("Capacity exhausted: cannot grow buffer to hold {required} bytes")]
    CapacityExhausted { required: u64 },
}

impl From<bincode::Error> for StoreError {
    fn from(err: bincode::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}
