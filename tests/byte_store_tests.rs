//! Tests for String and VLRecord Stores
//!
//! These tests verify:
//! - Strings are stored NUL-terminated and addressed by start offset
//! - VLRecords are stored length-prefixed and addressed by prefix offset
//! - Length prefixes that run past the store or the caller's limit fail
//! - Reset returns a store to offset zero

use std::path::PathBuf;

use genstore::{Engine, StoreError, StoreKind, LENGTH_PREFIX_SIZE};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_path(name: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join(name);
    (temp_dir, path)
}

// =============================================================================
// String Store Tests
// =============================================================================

#[test]
fn test_append_strings_advances_high_water_mark() {
    let mut engine = Engine::default();
    let h = engine.create_string_store(None, "seq", 1024, 1).unwrap();

    assert_eq!(engine.append_string(h, "hello").unwrap(), 0);
    assert_eq!(engine.append_string(h, "world").unwrap(), 6);

    assert_eq!(engine.first_elem(h).unwrap(), 0);
    assert_eq!(engine.last_elem(h).unwrap(), 12);
    assert_eq!(engine.stats(h).unwrap().kind, StoreKind::String);
}

#[test]
fn test_get_string_by_offset() {
    let mut engine = Engine::default();
    let h = engine.create_string_store(None, "seq", 16, 1).unwrap();
    engine.append_string(h, "ACGTacgt").unwrap();
    engine.append_string(h, "").unwrap();
    engine.append_string(h, "NNN").unwrap();

    assert_eq!(engine.get_string(h, 0, 64).unwrap(), "ACGTacgt");
    assert_eq!(engine.get_string(h, 9, 64).unwrap(), "");
    assert_eq!(engine.get_string(h, 10, 64).unwrap(), "NNN");
    // Mid-string offsets are valid keys for the suffix
    assert_eq!(engine.get_string(h, 4, 64).unwrap(), "acgt");
}

#[test]
fn test_get_string_longer_than_limit() {
    let mut engine = Engine::default();
    let h = engine.create_string_store(None, "seq", 64, 1).unwrap();
    engine.append_string(h, "a fairly long string").unwrap();

    let result = engine.get_string(h, 0, 4);
    assert!(matches!(result, Err(StoreError::CorruptLength { .. })));
}

#[test]
fn test_get_string_out_of_range() {
    let mut engine = Engine::default();
    let h = engine.create_string_store(None, "seq", 64, 1).unwrap();
    engine.append_string(h, "abc").unwrap();

    assert!(matches!(engine.get_string(h, 4, 64), Err(StoreError::OutOfRange { .. })));
    assert!(matches!(engine.get_string(h, -1, 64), Err(StoreError::OutOfRange { .. })));
}

#[test]
fn test_append_string_rejects_interior_nul() {
    let mut engine = Engine::default();
    let h = engine.create_string_store(None, "seq", 64, 1).unwrap();

    assert!(matches!(
        engine.append_string(h, "ab\0cd"),
        Err(StoreError::InvalidArgument(_))
    ));
    assert_eq!(engine.last_elem(h).unwrap(), 0);
}

#[test]
fn test_string_store_on_disk() {
    let (_temp, path) = setup_temp_path("seq.str");
    let mut engine = Engine::default();
    let h = engine.create_string_store(Some(&path), "seq", 0, 1).unwrap();

    let offsets: Vec<i64> = (0..100)
        .map(|i| engine.append_string(h, &format!("read{:03}", i)).unwrap())
        .collect();

    for (i, offset) in offsets.iter().enumerate() {
        assert_eq!(engine.get_string(h, *offset, 64).unwrap(), format!("read{:03}", i));
    }
}

#[test]
fn test_memory_string_store_grows() {
    let mut engine = Engine::default();
    let h = engine.create_string_store(None, "seq", 1, 1).unwrap();

    let long = "X".repeat(10_000);
    let offset = engine.append_string(h, &long).unwrap();

    assert_eq!(engine.get_string(h, offset, 20_000).unwrap(), long);
}

// =============================================================================
// VLRecord Store Tests
// =============================================================================

#[test]
fn test_append_vlrecords() {
    let mut engine = Engine::default();
    let h = engine.create_vlrecord_store(None, "qlt", 256, 1).unwrap();

    let a = engine.append_vlrecord(h, b"first").unwrap();
    let b = engine.append_vlrecord(h, b"").unwrap();
    let c = engine.append_vlrecord(h, &[1, 2, 3]).unwrap();

    assert_eq!(a, 0);
    assert_eq!(b, 9);
    assert_eq!(c, 13);
    assert_eq!(engine.last_elem(h).unwrap(), 13 + LENGTH_PREFIX_SIZE as i64 + 3);

    assert_eq!(engine.get_vlrecord(h, a, 64).unwrap(), b"first");
    assert!(engine.get_vlrecord(h, b, 64).unwrap().is_empty());
    assert_eq!(engine.get_vlrecord(h, c, 64).unwrap(), vec![1, 2, 3]);
}

#[test]
fn test_get_vlrecord_into_buffer() {
    let mut engine = Engine::default();
    let h = engine.create_vlrecord_store(None, "qlt", 256, 1).unwrap();
    let offset = engine.append_vlrecord(h, b"payload").unwrap();

    let mut buf = [0u8; 16];
    let len = engine.get_vlrecord_into(h, offset, &mut buf).unwrap();
    assert_eq!(&buf[..len], b"payload");

    let mut small = [0u8; 3];
    assert!(matches!(
        engine.get_vlrecord_into(h, offset, &mut small),
        Err(StoreError::CorruptLength { .. })
    ));
}

#[test]
fn test_vlrecord_length_past_end_of_store() {
    let mut engine = Engine::default();
    let h = engine.create_vlrecord_store(None, "qlt", 256, 1).unwrap();
    // The payload itself looks like a huge length prefix
    engine.append_vlrecord(h, &[0xFF, 0xFF, 0xFF, 0x7F, 0, 0]).unwrap();

    match engine.get_vlrecord(h, LENGTH_PREFIX_SIZE as i64, usize::MAX) {
        Err(StoreError::CorruptLength { offset, length, end, .. }) => {
            assert_eq!(offset, 4);
            assert_eq!(length, 0x7FFF_FFFF);
            assert_eq!(end, 10);
        }
        other => panic!("expected CorruptLength, got {:?}", other),
    }
}

#[test]
fn test_vlrecord_prefix_straddles_end() {
    let mut engine = Engine::default();
    let h = engine.create_vlrecord_store(None, "qlt", 256, 1).unwrap();
    engine.append_vlrecord(h, &[0, 0]).unwrap();

    // Offset 4 leaves only two bytes, too few for a prefix
    assert!(matches!(
        engine.get_vlrecord(h, 4, 64),
        Err(StoreError::CorruptLength { .. })
    ));
}

#[test]
fn test_vlrecord_longer_than_limit() {
    let mut engine = Engine::default();
    let h = engine.create_vlrecord_store(None, "qlt", 256, 1).unwrap();
    let offset = engine.append_vlrecord(h, &[9u8; 32]).unwrap();

    assert!(matches!(
        engine.get_vlrecord(h, offset, 31),
        Err(StoreError::CorruptLength { max_length: 31, .. })
    ));
    assert_eq!(engine.get_vlrecord(h, offset, 32).unwrap().len(), 32);
}

#[test]
fn test_vlrecord_store_on_disk() {
    let (_temp, path) = setup_temp_path("qlt.vlr");
    let mut engine = Engine::default();
    let h = engine.create_vlrecord_store(Some(&path), "qlt", 0, 1).unwrap();

    let mut offsets = Vec::new();
    for i in 0..50u8 {
        offsets.push(engine.append_vlrecord(h, &vec![i; i as usize]).unwrap());
    }

    for (i, offset) in offsets.iter().enumerate() {
        assert_eq!(engine.get_vlrecord(h, *offset, 64).unwrap(), vec![i as u8; i]);
    }
}

#[test]
fn test_string_ops_on_vlrecord_store() {
    let mut engine = Engine::default();
    let h = engine.create_vlrecord_store(None, "qlt", 64, 1).unwrap();

    assert!(matches!(
        engine.append_string(h, "x"),
        Err(StoreError::WrongKind { expected: StoreKind::String, .. })
    ));
}

// =============================================================================
// Reset Tests
// =============================================================================

#[test]
fn test_reset_string_store() {
    let mut engine = Engine::default();
    let h = engine.create_string_store(None, "seq", 64, 1).unwrap();
    engine.append_string(h, "abc").unwrap();

    engine.reset_string_store(h).unwrap();

    assert_eq!(engine.last_elem(h).unwrap(), 0);
    assert!(matches!(engine.get_string(h, 0, 8), Err(StoreError::OutOfRange { .. })));
    assert_eq!(engine.append_string(h, "xyz").unwrap(), 0);
    assert_eq!(engine.get_string(h, 0, 8).unwrap(), "xyz");
}

#[test]
fn test_reset_string_store_rejects_index_store() {
    let mut engine = Engine::default();
    let h = engine.create_index_store(None, "frg", 8, 1, 1).unwrap();

    assert!(matches!(engine.reset_string_store(h), Err(StoreError::WrongKind { .. })));
}
