//! Store Header
//!
//! Fixed-size metadata block persisted at byte 0 of every store, both on
//! disk and at the start of a memory store's buffer.
//!
//! ## Layout
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │ Header (64 bytes)                                            │
//! │   Magic: "GSTR" (4)                                          │
//! │   Body (53, bincode fixed-width little-endian):              │
//! │     Kind: u32 | Label: [u8; 8] | ElementSize: i32 |          │
//! │     Version: i32 | FirstElem: i64 | LastElem: i64 |          │
//! │     CreationTime: i64 | LastUpdateTime: i64 | IsDeleted: u8  │
//! │   CRC32 of magic + body (4)                                  │
//! │   Padding (3)                                                │
//! ├──────────────────────────────────────────────────────────────┤
//! │ Content                                                      │
//! └──────────────────────────────────────────────────────────────┘
//! ```

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};

// =============================================================================
// Layout Constants
// =============================================================================

/// Magic bytes identifying a genstore file
pub(crate) const MAGIC: &[u8; 4] = b"GSTR";

/// Size of the bincode-encoded header body
pub(crate) const HEADER_BODY_SIZE: usize = 53;

/// Total persisted header size; content starts at this byte offset
pub const HEADER_SIZE: u64 = 64;

/// Maximum number of label bytes kept (the eighth byte is always NUL)
pub const LABEL_LEN: usize = 7;

const BODY_START: usize = MAGIC.len();
const BODY_END: usize = BODY_START + HEADER_BODY_SIZE;
const CRC_END: usize = BODY_END + 4;

// =============================================================================
// Store Kind
// =============================================================================

/// Which container a store is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StoreKind {
    /// Fixed-size records addressed by a contiguous ID range
    Index,

    /// NUL-terminated strings addressed by byte offset
    String,

    /// Length-prefixed binary records addressed by byte offset
    VLRecord,
}

impl StoreKind {
    /// True for the kinds addressed by byte offset
    pub fn is_byte_addressed(self) -> bool {
        !matches!(self, StoreKind::Index)
    }
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StoreKind::Index => "index",
            StoreKind::String => "string",
            StoreKind::VLRecord => "vlrecord",
        };
        f.write_str(name)
    }
}

// =============================================================================
// Header
// =============================================================================

/// Persisted metadata of a store.
///
/// For index stores `first_elem..=last_elem` is the valid ID range and
/// `last_elem == first_elem - 1` means empty. For string and vlrecord stores
/// `last_elem` is the byte high-water mark: the offset the next append lands on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreHeader {
    pub kind: StoreKind,
    label: [u8; LABEL_LEN + 1],
    /// Record size (index) or advisory expected size (string, vlrecord)
    pub element_size: i32,
    pub version: i32,
    pub first_elem: i64,
    pub last_elem: i64,
    /// Seconds since the Unix epoch
    pub creation_time: i64,
    /// Seconds since the Unix epoch, refreshed on every header write
    pub last_update_time: i64,
    /// Whole-store deleted flag (distinct from per-record soft delete)
    pub is_deleted: bool,
}

impl StoreHeader {
    /// Build a header stamped with the current time
    pub(crate) fn new(
        kind: StoreKind,
        label: &str,
        element_size: i32,
        version: i32,
        first_elem: i64,
        last_elem: i64,
    ) -> Self {
        let mut header = Self {
            kind,
            label: [0u8; LABEL_LEN + 1],
            element_size,
            version,
            first_elem,
            last_elem,
            creation_time: unix_now(),
            last_update_time: 0,
            is_deleted: false,
        };
        header.set_label(label);
        header
    }

    /// The domain label ("frg", "dist", ...), at most 7 bytes
    pub fn label(&self) -> &str {
        let end = self.label.iter().position(|&b| b == 0).unwrap_or(LABEL_LEN);
        std::str::from_utf8(&self.label[..end]).unwrap_or("")
    }

    /// Store a label, truncated to 7 bytes on a char boundary
    pub(crate) fn set_label(&mut self, label: &str) {
        let mut end = label.len().min(LABEL_LEN);
        while !label.is_char_boundary(end) {
            end -= 1;
        }
        self.label = [0u8; LABEL_LEN + 1];
        self.label[..end].copy_from_slice(&label.as_bytes()[..end]);
    }

    /// Number of records in an index store
    pub fn record_count(&self) -> i64 {
        self.last_elem
            .saturating_sub(self.first_elem)
            .saturating_add(1)
    }

    /// Number of content bytes following the header.
    ///
    /// Saturates at `u64::MAX` for bounds that [`StoreHeader::decode`] would
    /// reject.
    pub fn content_len(&self) -> u64 {
        self.checked_content_len().unwrap_or(u64::MAX)
    }

    /// Content length, or None if it overflows (header included)
    fn checked_content_len(&self) -> Option<u64> {
        let len = match self.kind {
            StoreKind::Index => self
                .last_elem
                .checked_sub(self.first_elem)?
                .checked_add(1)?
                .checked_mul(i64::from(self.element_size))?,
            StoreKind::String | StoreKind::VLRecord => {
                self.last_elem.checked_sub(self.first_elem)?
            }
        };
        let len = len.max(0) as u64;
        len.checked_add(HEADER_SIZE).map(|_| len)
    }

    /// Encode into the fixed-size on-disk image
    pub fn encode(&self) -> Result<[u8; HEADER_SIZE as usize]> {
        let body = bincode::serialize(self)?;
        if body.len() != HEADER_BODY_SIZE {
            return Err(StoreError::Serialization(format!(
                "header body is {} bytes, expected {}",
                body.len(),
                HEADER_BODY_SIZE
            )));
        }

        let mut image = [0u8; HEADER_SIZE as usize];
        image[..BODY_START].copy_from_slice(MAGIC);
        image[BODY_START..BODY_END].copy_from_slice(&body);

        let crc = crc32fast::hash(&image[..BODY_END]);
        image[BODY_END..CRC_END].copy_from_slice(&crc.to_le_bytes());

        Ok(image)
    }

    /// Decode and validate an on-disk image
    pub fn decode(image: &[u8]) -> Result<Self> {
        if image.len() < HEADER_SIZE as usize {
            return Err(StoreError::CorruptHeader(format!(
                "expected {} bytes, got {}",
                HEADER_SIZE,
                image.len()
            )));
        }

        if &image[..BODY_START] != MAGIC {
            return Err(StoreError::CorruptHeader(format!(
                "invalid magic: expected GSTR, got {:?}",
                &image[..BODY_START]
            )));
        }

        let stored_crc = u32::from_le_bytes([
            image[BODY_END],
            image[BODY_END + 1],
            image[BODY_END + 2],
            image[BODY_END + 3],
        ]);
        let computed_crc = crc32fast::hash(&image[..BODY_END]);
        if stored_crc != computed_crc {
            return Err(StoreError::CorruptHeader(format!(
                "checksum mismatch: stored {:#010x}, computed {:#010x}",
                stored_crc, computed_crc
            )));
        }

        let header: StoreHeader = bincode::deserialize(&image[BODY_START..BODY_END])?;
        header.validate()?;
        Ok(header)
    }

    /// Structural sanity checks on decoded bounds
    fn validate(&self) -> Result<()> {
        match self.kind {
            StoreKind::Index => {
                if self.element_size <= 0 {
                    return Err(StoreError::CorruptHeader(format!(
                        "index store with element size {}",
                        self.element_size
                    )));
                }
                // IDs first - 1 and last + 1 must both be representable
                let inverted = match self.first_elem.checked_sub(1) {
                    Some(before_first) => self.last_elem < before_first,
                    None => true,
                };
                if inverted || self.last_elem == i64::MAX {
                    return Err(StoreError::CorruptHeader(format!(
                        "index range [{}, {}] is invalid",
                        self.first_elem, self.last_elem
                    )));
                }
            }
            StoreKind::String | StoreKind::VLRecord => {
                if self.first_elem < 0 || self.last_elem < self.first_elem {
                    return Err(StoreError::CorruptHeader(format!(
                        "byte range [{}, {}) is invalid",
                        self.first_elem, self.last_elem
                    )));
                }
            }
        }

        if self.checked_content_len().is_none() {
            return Err(StoreError::CorruptHeader(format!(
                "range [{}, {}] of {}-byte elements overflows the content length",
                self.first_elem, self.last_elem, self.element_size
            )));
        }
        Ok(())
    }

    /// Refresh the update timestamp before a header write
    pub(crate) fn touch(&mut self) {
        self.last_update_time = unix_now();
    }
}

impl fmt::Display for StoreHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "kind          {}", self.kind)?;
        writeln!(f, "label         {}", self.label())?;
        writeln!(f, "isDeleted     {}", self.is_deleted)?;
        writeln!(f, "firstElem     {}", self.first_elem)?;
        writeln!(f, "lastElem      {}", self.last_elem)?;
        writeln!(f, "version       {}", self.version)?;
        writeln!(f, "elementSize   {}", self.element_size)?;
        writeln!(f, "created       {}", self.creation_time)?;
        write!(f, "updated       {}", self.last_update_time)
    }
}

/// Wall clock in whole seconds since the Unix epoch
pub(crate) fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
