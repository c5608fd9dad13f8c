//! Soft-delete convention
//!
//! A record is deleted when the most significant bit of its first byte is
//! set. The bit shares the byte with domain data, so only that bit is ever
//! touched. Domain record layouts must reserve it.

/// Bit in the first byte of a record image that marks it deleted
pub const DELETED_FLAG: u8 = 0x80;

/// True if the record image carries the deleted bit
pub fn is_deleted(record: &[u8]) -> bool {
    record.first().is_some_and(|&b| b & DELETED_FLAG != 0)
}

/// Set the deleted bit, leaving every other bit alone
pub fn mark_deleted(record: &mut [u8]) {
    if let Some(b) = record.first_mut() {
        *b |= DELETED_FLAG;
    }
}

/// Clear the deleted bit, leaving every other bit alone
pub fn clear_deleted(record: &mut [u8]) {
    if let Some(b) = record.first_mut() {
        *b &= !DELETED_FLAG;
    }
}
