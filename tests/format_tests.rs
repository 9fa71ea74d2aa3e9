//! Tests for the cublet on-disk format
//!
//! These tests verify:
//! - The trailing index-start pointer contract (seek to length − 4)
//! - Footer index contents and strict offset ordering
//! - Exact byte layout of a minimal cublet
//! - Chunk/metachunk CRC validation
//! - Dictionary and metric-statistics round trips

use std::path::PathBuf;

use cubedb::storage::{CubletReader, MetaFieldData};
use cubedb::{Config, CubeError, CubletWriter, Field, FieldType, Schema};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn event_schema() -> Schema {
    Schema::new(vec![
        Field::new("user", FieldType::UserKey),
        Field::new("action", FieldType::Text),
        Field::new("value", FieldType::Metric),
    ])
}

fn setup_writer(schema: Schema, chunk_rows: usize, cublet_bytes: u64) -> (TempDir, CubletWriter) {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .output_dir(temp_dir.path())
        .chunk_row_limit(chunk_rows)
        .cublet_size_limit(cublet_bytes)
        .build();
    let writer = CubletWriter::new(schema, config).unwrap();
    (temp_dir, writer)
}

fn cublet_paths(dir: &TempDir) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| p.extension().is_some_and(|e| e == "dz"))
        .collect();
    paths.sort();
    paths
}

fn single_cublet(dir: &TempDir) -> PathBuf {
    let paths = cublet_paths(dir);
    assert_eq!(paths.len(), 1);
    paths.into_iter().next().unwrap()
}

fn u32_at(bytes: &[u8], pos: usize) -> u32 {
    u32::from_le_bytes(bytes[pos..pos + 4].try_into().unwrap())
}

// =============================================================================
// Footer Index Tests
// =============================================================================

#[test]
fn test_tail_pointer_reaches_index() {
    let (temp, mut writer) = setup_writer(event_schema(), 2, 1 << 20);
    writer.initialize().unwrap();
    for (user, value) in [("a", 1), ("a", 2), ("b", 3), ("b", 4), ("c", 5)] {
        writer.append(&[user, "click", &value.to_string()]).unwrap();
    }
    writer.finish().unwrap();

    let bytes = std::fs::read(single_cublet(&temp)).unwrap();
    let index_start = u32_at(&bytes, bytes.len() - 4) as usize;

    // Seeking to the tail value yields index_count followed by the offsets
    // recorded during writing, in write order.
    let index_count = u32_at(&bytes, index_start) as usize;
    let mut offsets = Vec::with_capacity(index_count);
    for i in 0..index_count {
        offsets.push(u32_at(&bytes, index_start + 4 + i * 4));
    }

    let reader = CubletReader::open(&single_cublet(&temp)).unwrap();
    assert_eq!(reader.index_start() as usize, index_start);
    assert_eq!(reader.offsets(), offsets.as_slice());
    // Index length = flushed chunks + the metachunk footer.
    assert_eq!(index_count, reader.chunk_count() + 1);
}

#[test]
fn test_offsets_strictly_increase() {
    let (temp, mut writer) = setup_writer(event_schema(), 1, 1 << 20);
    writer.initialize().unwrap();
    for i in 0..10 {
        let user = format!("u{}", i);
        writer.append(&[&user, "click", "0"]).unwrap();
    }
    writer.finish().unwrap();

    let reader = CubletReader::open(&single_cublet(&temp)).unwrap();
    let offsets = reader.offsets();
    assert_eq!(offsets[0], 0);
    for pair in offsets.windows(2) {
        assert!(pair[0] < pair[1]);
    }
    assert!(*offsets.last().unwrap() < reader.index_start());
}

#[test]
fn test_exact_layout_of_minimal_cublet() {
    // Single user-key column, two identical rows, one chunk:
    //   chunk     @  0: [rows=2][fields=1][cell 0][cell 0][crc]   = 20 bytes
    //   metachunk @ 20: [fields=1][tag=0][count=1][len=1]['a'][crc] = 21 bytes
    //   index     @ 41: [count=2][0][20][41]                       = 16 bytes
    let schema = Schema::new(vec![Field::new("user", FieldType::UserKey)]);
    let (temp, mut writer) = setup_writer(schema, 1024, 1 << 20);
    writer.initialize().unwrap();
    writer.append(&["a"]).unwrap();
    writer.append(&["a"]).unwrap();
    writer.finish().unwrap();

    let bytes = std::fs::read(single_cublet(&temp)).unwrap();
    assert_eq!(bytes.len(), 57);

    // Chunk header and cells.
    assert_eq!(u32_at(&bytes, 0), 2); // row count
    assert_eq!(u32_at(&bytes, 4), 1); // field count
    assert_eq!(u32_at(&bytes, 8), 0); // dictionary id of "a"
    assert_eq!(u32_at(&bytes, 12), 0);

    // Metachunk: one dictionary field holding "a".
    assert_eq!(u32_at(&bytes, 20), 1); // field count
    assert_eq!(u32_at(&bytes, 24), 0); // user-key tag
    assert_eq!(u32_at(&bytes, 28), 1); // dictionary size
    assert_eq!(u32_at(&bytes, 32), 1); // value length
    assert_eq!(bytes[36], b'a');

    // Footer index and trailing pointer.
    assert_eq!(u32_at(&bytes, 41), 2); // index count
    assert_eq!(u32_at(&bytes, 45), 0); // chunk offset
    assert_eq!(u32_at(&bytes, 49), 20); // metachunk offset
    assert_eq!(u32_at(&bytes, 53), 41); // index start
}

#[test]
fn test_empty_cublet_index_has_single_entry() {
    let (temp, mut writer) = setup_writer(event_schema(), 8, 1 << 20);
    writer.initialize().unwrap();
    writer.finish().unwrap();

    let bytes = std::fs::read(single_cublet(&temp)).unwrap();
    let index_start = u32_at(&bytes, bytes.len() - 4) as usize;
    assert_eq!(u32_at(&bytes, index_start), 1); // just the metachunk
    assert_eq!(u32_at(&bytes, index_start + 4), 0); // metachunk starts at 0
}

#[test]
fn test_every_rolled_cublet_has_valid_tail() {
    let (temp, mut writer) = setup_writer(event_schema(), 1, 64);
    writer.initialize().unwrap();
    for i in 0..20 {
        let user = if i % 2 == 0 { "a" } else { "b" };
        writer.append(&[user, "click", &i.to_string()]).unwrap();
    }
    writer.finish().unwrap();

    let paths = cublet_paths(&temp);
    assert!(paths.len() >= 2);
    for path in paths {
        let bytes = std::fs::read(&path).unwrap();
        let tail = u32_at(&bytes, bytes.len() - 4);
        let reader = CubletReader::open(&path).unwrap();
        assert_eq!(tail, reader.index_start());
        // The tail pointer plus the index spans exactly to EOF.
        let span = (reader.offsets().len() as u64 + 2) * 4;
        assert_eq!(tail as u64 + span, bytes.len() as u64);
    }
}

// =============================================================================
// Metachunk Content Tests
// =============================================================================

#[test]
fn test_dictionary_in_first_seen_order() {
    let (temp, mut writer) = setup_writer(event_schema(), 8, 1 << 20);
    writer.initialize().unwrap();
    for (user, action) in [
        ("charlie", "view"),
        ("alice", "click"),
        ("bob", "view"),
        ("alice", "buy"),
    ] {
        writer.append(&[user, action, "1"]).unwrap();
    }
    writer.finish().unwrap();

    let mut reader = CubletReader::open(&single_cublet(&temp)).unwrap();
    let meta = reader.read_metachunk().unwrap();

    match &meta[0] {
        MetaFieldData::Dict { field_type, values } => {
            assert_eq!(*field_type, FieldType::UserKey);
            assert_eq!(values, &["charlie", "alice", "bob"]);
        }
        other => panic!("expected user dictionary, got {:?}", other),
    }
    match &meta[1] {
        MetaFieldData::Dict { field_type, values } => {
            assert_eq!(*field_type, FieldType::Text);
            assert_eq!(values, &["view", "click", "buy"]);
        }
        other => panic!("expected action dictionary, got {:?}", other),
    }
}

#[test]
fn test_metric_statistics_and_cells() {
    let (temp, mut writer) = setup_writer(event_schema(), 8, 1 << 20);
    writer.initialize().unwrap();
    for value in [5, -3, 10] {
        writer.append(&["alice", "click", &value.to_string()]).unwrap();
    }
    writer.finish().unwrap();

    let mut reader = CubletReader::open(&single_cublet(&temp)).unwrap();

    // Metric cells round-trip through the u32 cell representation.
    let chunk = reader.read_chunk(0).unwrap();
    let metrics: Vec<i32> = chunk.columns[2].iter().map(|&c| c as i32).collect();
    assert_eq!(metrics, vec![5, -3, 10]);

    let meta = reader.read_metachunk().unwrap();
    match &meta[2] {
        MetaFieldData::Range { rows, min, max } => {
            assert_eq!(*rows, 3);
            assert_eq!(*min, -3);
            assert_eq!(*max, 10);
        }
        other => panic!("expected metric statistics, got {:?}", other),
    }
}

#[test]
fn test_dictionary_shared_across_chunks() {
    // The same user appearing in two chunks must map to one dictionary id.
    let (temp, mut writer) = setup_writer(event_schema(), 2, 1 << 20);
    writer.initialize().unwrap();
    for user in ["a", "a", "b", "b", "a"] {
        writer.append(&[user, "click", "0"]).unwrap();
    }
    writer.finish().unwrap();

    let mut reader = CubletReader::open(&single_cublet(&temp)).unwrap();
    assert_eq!(reader.chunk_count(), 3);
    let chunk1 = reader.read_chunk(0).unwrap();
    let chunk2 = reader.read_chunk(1).unwrap();
    let chunk3 = reader.read_chunk(2).unwrap();

    // "a" was seen first, so it holds id 0 in every chunk of the cublet.
    assert_eq!(chunk1.columns[0], vec![0, 0]);
    assert_eq!(chunk2.columns[0], vec![1, 1]);
    assert_eq!(chunk3.columns[0], vec![0]);
}

// =============================================================================
// Corruption Detection Tests
// =============================================================================

#[test]
fn test_chunk_crc_detects_corruption() {
    let (temp, mut writer) = setup_writer(event_schema(), 8, 1 << 20);
    writer.initialize().unwrap();
    for i in 0..4 {
        writer.append(&["alice", "click", &i.to_string()]).unwrap();
    }
    writer.finish().unwrap();

    let path = single_cublet(&temp);
    let mut bytes = std::fs::read(&path).unwrap();
    // Flip one cell inside the first chunk's data.
    bytes[10] ^= 0xFF;
    std::fs::write(&path, &bytes).unwrap();

    let mut reader = CubletReader::open(&path).unwrap();
    let result = reader.read_chunk(0);
    assert!(matches!(result, Err(CubeError::Storage(_))));
}

#[test]
fn test_truncated_file_rejected() {
    let (temp, mut writer) = setup_writer(event_schema(), 8, 1 << 20);
    writer.initialize().unwrap();
    writer.append(&["alice", "click", "1"]).unwrap();
    writer.finish().unwrap();

    let path = single_cublet(&temp);
    let bytes = std::fs::read(&path).unwrap();
    std::fs::write(&path, &bytes[..bytes.len() - 6]).unwrap();

    let result = CubletReader::open(&path);
    assert!(result.is_err());
}

#[test]
fn test_garbage_file_rejected() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("garbage.dz");
    std::fs::write(&path, b"THIS_IS_NOT_A_CUBLET_FILE").unwrap();

    let result = CubletReader::open(&path);
    assert!(matches!(result, Err(CubeError::Storage(_))));
}
