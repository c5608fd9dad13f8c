//! Tests for Bulk Copy and Partial Materialization
//!
//! These tests verify:
//! - Materialized stores keep original IDs/offsets over a narrowed range
//! - Materialized content matches a bulk copy of the same range
//! - The source handle is closed by materialization
//! - Chunked copies handle remainders, grow memory targets and reach disk targets
//! - Whole-store loading from disk

use std::path::{Path, PathBuf};

use genstore::{Engine, StoreConfig, StoreError, StoreHandle, HEADER_SIZE};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_path(name: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join(name);
    (temp_dir, path)
}

/// 8-byte record whose bytes all derive from `id`
fn record(id: i64) -> [u8; 8] {
    let mut r = (id as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15).to_le_bytes();
    r[0] &= 0x7F;
    r
}

/// Disk index store of `count` records starting at `first`
fn disk_index_store(engine: &mut Engine, path: &Path, first: i64, count: i64) -> StoreHandle {
    let h = engine.create_index_store(Some(path), "frg", 8, 2, first).unwrap();
    for id in first..first + count {
        engine.append(h, &record(id)).unwrap();
    }
    engine.commit(h).unwrap();
    h
}

/// Physical offset of `id` in an 8-byte index store starting at `first`
fn index_offset(first: i64, id: i64) -> u64 {
    HEADER_SIZE + (id - first) as u64 * 8
}

// =============================================================================
// Materialization Tests
// =============================================================================

#[test]
fn test_materialize_index_sub_range() {
    let (_temp, path) = setup_temp_path("frg.idx");
    let mut engine = Engine::default();
    let src = disk_index_store(&mut engine, &path, 22, 100);
    let originals: Vec<Vec<u8>> = (30..=40).map(|id| engine.get(src, id).unwrap()).collect();

    let partial = engine.materialize_partial(src, Some(30), Some(40)).unwrap();

    assert!(engine.is_memory_backed(partial).unwrap());
    assert_eq!(engine.first_elem(partial).unwrap(), 30);
    assert_eq!(engine.last_elem(partial).unwrap(), 40);
    assert_eq!(engine.record_count(partial).unwrap(), 11);
    for (i, id) in (30..=40).enumerate() {
        assert_eq!(engine.get(partial, id).unwrap(), originals[i]);
    }
    assert!(matches!(engine.get(partial, 29), Err(StoreError::OutOfRange { .. })));
    assert!(matches!(engine.get(partial, 41), Err(StoreError::OutOfRange { .. })));

    assert!(!engine.is_valid(src));
    assert!(matches!(engine.get(src, 30), Err(StoreError::InvalidHandle(_))));
}

#[test]
fn test_materialize_keeps_header_fields() {
    let (_temp, path) = setup_temp_path("frg.idx");
    let mut engine = Engine::default();
    let src = disk_index_store(&mut engine, &path, 1, 10);
    let before = engine.stats(src).unwrap();

    let partial = engine.materialize_partial(src, Some(2), None).unwrap();
    let after = engine.stats(partial).unwrap();

    assert_eq!(after.kind, before.kind);
    assert_eq!(after.label(), "frg");
    assert_eq!(after.version, 2);
    assert_eq!(after.element_size, 8);
    assert_eq!(after.creation_time, before.creation_time);
    assert_eq!((after.first_elem, after.last_elem), (2, 10));
    assert!(!engine.is_dirty(partial).unwrap());
}

#[test]
fn test_materialize_matches_bulk_copy() {
    let (_temp, path) = setup_temp_path("frg.idx");
    let mut engine = Engine::default();
    let src = disk_index_store(&mut engine, &path, 22, 100);

    // Target already spans IDs 30..=40; bulk copy overwrites its content
    let target = engine.create_index_store(None, "frg", 8, 2, 30).unwrap();
    for _ in 30..=40 {
        engine.append(target, &[0u8; 8]).unwrap();
    }
    let copied = engine
        .bulk_copy(src, index_offset(22, 30), index_offset(22, 41), target, HEADER_SIZE)
        .unwrap();
    assert_eq!(copied, 88);

    let partial = engine.materialize_partial(src, Some(30), Some(40)).unwrap();

    let partial_image = engine.export_image(partial).unwrap();
    let target_image = engine.export_image(target).unwrap();
    assert_eq!(partial_image.len(), target_image.len());
    assert_eq!(
        &partial_image[HEADER_SIZE as usize..],
        &target_image[HEADER_SIZE as usize..]
    );
}

#[test]
fn test_materialize_empty_range() {
    let (_temp, path) = setup_temp_path("frg.idx");
    let mut engine = Engine::default();
    let src = disk_index_store(&mut engine, &path, 1, 10);

    let partial = engine.materialize_partial(src, Some(5), Some(4)).unwrap();

    assert_eq!(engine.record_count(partial).unwrap(), 0);
    assert!(matches!(engine.get(partial, 5), Err(StoreError::OutOfRange { .. })));
}

#[test]
fn test_materialize_out_of_range_keeps_source() {
    let (_temp, path) = setup_temp_path("frg.idx");
    let mut engine = Engine::default();
    let src = disk_index_store(&mut engine, &path, 1, 10);

    assert!(matches!(
        engine.materialize_partial(src, Some(5), Some(11)),
        Err(StoreError::OutOfRange { index: 11, .. })
    ));
    assert!(matches!(
        engine.materialize_partial(src, Some(0), Some(5)),
        Err(StoreError::OutOfRange { index: 0, .. })
    ));

    assert!(engine.is_valid(src));
    assert_eq!(engine.open_store_count(), 1);
}

#[test]
fn test_materialize_string_store() {
    let (_temp, path) = setup_temp_path("seq.str");
    let mut engine = Engine::default();
    let src = engine.create_string_store(Some(&path), "seq", 0, 1).unwrap();
    engine.append_string(src, "a").unwrap();
    let bb = engine.append_string(src, "bb").unwrap();
    let ccc = engine.append_string(src, "ccc").unwrap();
    let end = engine.last_elem(src).unwrap();

    let partial = engine.materialize_partial(src, Some(bb), Some(end)).unwrap();

    assert_eq!(engine.first_elem(partial).unwrap(), 2);
    assert_eq!(engine.last_elem(partial).unwrap(), 9);
    assert_eq!(engine.get_string(partial, ccc, 16).unwrap(), "ccc");
    assert!(matches!(engine.get_string(partial, 0, 16), Err(StoreError::OutOfRange { .. })));

    let s = engine.open_stream(partial, None).unwrap();
    let seen: Vec<Vec<u8>> = engine.records(s).map(|r| r.unwrap()).collect();
    assert_eq!(seen, vec![b"bb".to_vec(), b"ccc".to_vec()]);

    // The new store accepts appends at the old high-water mark
    assert_eq!(engine.append_string(partial, "dd").unwrap(), 9);
}

#[test]
fn test_materialize_vlrecord_store_with_small_chunks() {
    let config = StoreConfig::builder().copy_chunk_size(7).build();
    let mut engine = Engine::new(config);
    let src = engine.create_vlrecord_store(None, "qlt", 16, 1).unwrap();
    let mut offsets = Vec::new();
    for i in 0..20u8 {
        offsets.push(engine.append_vlrecord(src, &vec![i; 3 + i as usize]).unwrap());
    }
    let end = engine.last_elem(src).unwrap();

    let partial = engine.materialize_partial(src, Some(offsets[5]), Some(end)).unwrap();

    for (i, offset) in offsets.iter().enumerate().skip(5) {
        assert_eq!(engine.get_vlrecord(partial, *offset, 64).unwrap(), vec![i as u8; 3 + i]);
    }
    // Memory sources are closed too
    assert!(!engine.is_valid(src));
}

// =============================================================================
// Bulk Copy Tests
// =============================================================================

#[test]
fn test_bulk_copy_grows_memory_target() {
    let (_temp, path) = setup_temp_path("frg.idx");
    let config = StoreConfig::builder().initial_records(1).copy_chunk_size(16).build();
    let mut engine = Engine::new(config);
    let src = disk_index_store(&mut engine, &path, 1, 50);
    // Only IDs 1..=10 are in bounds; the copy runs far past the allocation
    let target = engine.create_index_store(None, "frg", 8, 1, 1).unwrap();
    for _ in 1..=10 {
        engine.append(target, &[0u8; 8]).unwrap();
    }

    let copied = engine
        .bulk_copy(src, HEADER_SIZE, index_offset(1, 51), target, HEADER_SIZE)
        .unwrap();

    assert_eq!(copied, 400);
    assert!(engine.is_dirty(target).unwrap());
    for id in 1..=10 {
        assert_eq!(engine.get(target, id).unwrap(), record(id));
    }
}

#[test]
fn test_bulk_copy_into_disk_target() {
    let (_temp, path) = setup_temp_path("frg.idx");
    // 56 bytes in 5-byte chunks leaves a 1-byte remainder
    let config = StoreConfig::builder().copy_chunk_size(5).build();
    let mut engine = Engine::new(config);
    let src = engine.create_index_store(None, "frg", 8, 2, 1).unwrap();
    for id in 1..=7 {
        engine.append(src, &record(id)).unwrap();
    }
    let target = engine.create_index_store(Some(&path), "frg", 8, 2, 1).unwrap();
    for _ in 1..=7 {
        engine.append(target, &[0u8; 8]).unwrap();
    }
    engine.commit(target).unwrap();

    let copied = engine
        .bulk_copy(src, HEADER_SIZE, index_offset(1, 8), target, HEADER_SIZE)
        .unwrap();

    assert_eq!(copied, 56);
    assert!(!engine.is_memory_backed(target).unwrap());
    for id in 1..=7 {
        assert_eq!(engine.get(target, id).unwrap(), record(id));
    }

    engine.close(target).unwrap();
    let expected: Vec<u8> = (1..=7).flat_map(record).collect();
    let image = std::fs::read(&path).unwrap();
    assert_eq!(&image[HEADER_SIZE as usize..], &expected[..]);
}

#[test]
fn test_bulk_copy_rejects_header_target() {
    let mut engine = Engine::default();
    let src = engine.create_index_store(None, "frg", 8, 1, 1).unwrap();
    engine.append(src, &record(1)).unwrap();
    let target = engine.create_index_store(None, "frg", 8, 1, 1).unwrap();

    assert!(matches!(
        engine.bulk_copy(src, HEADER_SIZE, HEADER_SIZE + 8, target, 0),
        Err(StoreError::InvalidArgument(_))
    ));
}

#[test]
fn test_bulk_copy_past_source_end() {
    let mut engine = Engine::default();
    let src = engine.create_index_store(None, "frg", 8, 1, 1).unwrap();
    engine.append(src, &record(1)).unwrap();
    let target = engine.create_index_store(None, "frg", 8, 1, 1).unwrap();

    assert!(matches!(
        engine.bulk_copy(src, HEADER_SIZE, HEADER_SIZE + 16, target, HEADER_SIZE),
        Err(StoreError::ByteRange { .. })
    ));
    assert!(matches!(
        engine.bulk_copy(src, HEADER_SIZE + 8, HEADER_SIZE, target, HEADER_SIZE),
        Err(StoreError::InvalidArgument(_))
    ));
}

#[test]
fn test_bulk_copy_into_read_only_store() {
    let (_temp, path) = setup_temp_path("frg.idx");
    let mut engine = Engine::default();
    let disk = disk_index_store(&mut engine, &path, 1, 4);
    engine.close(disk).unwrap();
    let target = engine.open_store(&path, genstore::OpenMode::ReadOnly).unwrap();
    let src = engine.create_index_store(None, "frg", 8, 1, 1).unwrap();
    engine.append(src, &record(9)).unwrap();

    assert!(matches!(
        engine.bulk_copy(src, HEADER_SIZE, HEADER_SIZE + 8, target, HEADER_SIZE),
        Err(StoreError::ReadOnly(_))
    ));
}

// =============================================================================
// Load Tests
// =============================================================================

#[test]
fn test_load_store_into_memory() {
    let (_temp, path) = setup_temp_path("frg.idx");
    let mut engine = Engine::default();
    let disk = disk_index_store(&mut engine, &path, 22, 100);
    engine.close(disk).unwrap();

    let loaded = engine.load_store(&path).unwrap();

    assert!(engine.is_memory_backed(loaded).unwrap());
    assert_eq!(engine.open_store_count(), 1);
    assert_eq!(engine.first_elem(loaded).unwrap(), 22);
    assert_eq!(engine.last_elem(loaded).unwrap(), 121);
    assert_eq!(engine.get(loaded, 77).unwrap(), record(77));

    // Memory copies are writable even though the file was read-only
    assert_eq!(engine.append(loaded, &record(122)).unwrap(), 122);
}
