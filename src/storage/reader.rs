//! Cublet Reader
//!
//! Locates the trailing footer index via the file's last 4 bytes and decodes
//! chunks and the metachunk. This is the downstream reader contract made
//! concrete — enough to verify every written byte; the analytical scanner
//! that executes queries over cublets lives elsewhere.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use crate::error::{CubeError, Result};
use crate::schema::FieldType;

use super::{read_u32, INT_BYTES};

/// One decoded data chunk
#[derive(Debug)]
pub struct ChunkData {
    /// Rows in this chunk
    pub row_count: u32,
    /// Columnar u32 cells, one vector per schema field
    pub columns: Vec<Vec<u32>>,
}

/// One decoded metachunk field
#[derive(Debug)]
pub enum MetaFieldData {
    /// Dictionary values in id order
    Dict {
        field_type: FieldType,
        values: Vec<String>,
    },
    /// Metric statistics
    Range { rows: u32, min: i32, max: i32 },
}

/// Reader over one finalized cublet file
pub struct CubletReader {
    file: File,
    offsets: Vec<u32>,
    index_start: u32,
}

impl CubletReader {
    /// Open a cublet: seek to (length − 4), follow the tail pointer to the
    /// footer index, and validate it.
    pub fn open(path: &Path) -> Result<Self> {
        let mut file = File::open(path)?;
        let file_size = file.metadata()?.len();

        // Smallest valid cublet: empty metachunk + count + offset + tail.
        if file_size < 3 * INT_BYTES {
            return Err(CubeError::Storage(format!(
                "cublet too small ({} bytes)",
                file_size
            )));
        }

        let mut word = [0u8; 4];
        file.seek(SeekFrom::End(-(INT_BYTES as i64)))?;
        file.read_exact(&mut word)?;
        let index_start = read_u32(&word);

        // The index needs at least its count, one offset, and the tail.
        if index_start as u64 + 3 * INT_BYTES > file_size {
            return Err(CubeError::Storage(format!(
                "tail pointer {} out of range for a {}-byte file",
                index_start, file_size
            )));
        }

        file.seek(SeekFrom::Start(index_start as u64))?;
        file.read_exact(&mut word)?;
        let index_count = read_u32(&word);

        // The index plus its count and tail must span exactly to EOF.
        let expected_end = index_start as u64 + (index_count as u64 + 2) * INT_BYTES;
        if index_count == 0 || expected_end != file_size {
            return Err(CubeError::Storage(format!(
                "corrupt footer index: count {} at offset {} in a {}-byte file",
                index_count, index_start, file_size
            )));
        }

        let mut offsets = Vec::with_capacity(index_count as usize);
        for _ in 0..index_count {
            file.read_exact(&mut word)?;
            offsets.push(read_u32(&word));
        }
        for pair in offsets.windows(2) {
            if pair[1] <= pair[0] {
                return Err(CubeError::Storage(format!(
                    "footer index offsets not increasing: {} then {}",
                    pair[0], pair[1]
                )));
            }
        }
        if let Some(&last) = offsets.last() {
            if last as u64 >= index_start as u64 {
                return Err(CubeError::Storage(
                    "footer offset overlaps the index".to_string(),
                ));
            }
        }

        Ok(Self {
            file,
            offsets,
            index_start,
        })
    }

    /// Recorded offsets, in write order (chunks, then the metachunk)
    pub fn offsets(&self) -> &[u32] {
        &self.offsets
    }

    /// Start offset of the footer index (the tail pointer's value)
    pub fn index_start(&self) -> u32 {
        self.index_start
    }

    /// Number of data chunks in this cublet
    pub fn chunk_count(&self) -> usize {
        self.offsets.len() - 1
    }

    /// Decode one data chunk, verifying its CRC
    pub fn read_chunk(&mut self, i: usize) -> Result<ChunkData> {
        if i >= self.chunk_count() {
            return Err(CubeError::Storage(format!(
                "chunk {} out of range ({} chunks)",
                i,
                self.chunk_count()
            )));
        }
        let buf = self.read_region(self.offsets[i] as u64, self.offsets[i + 1] as u64)?;
        let mut cursor = Cursor::new(&buf);
        let row_count = cursor.read_u32()?;
        let field_count = cursor.read_u32()?;
        let mut columns = Vec::with_capacity(field_count as usize);
        for _ in 0..field_count {
            let mut column = Vec::with_capacity(row_count as usize);
            for _ in 0..row_count {
                column.push(cursor.read_u32()?);
            }
            columns.push(column);
        }
        cursor.expect_end()?;
        Ok(ChunkData { row_count, columns })
    }

    /// Decode the metachunk footer, verifying its CRC
    pub fn read_metachunk(&mut self) -> Result<Vec<MetaFieldData>> {
        let start = match self.offsets.last() {
            Some(&o) => o as u64,
            None => return Err(CubeError::Storage("empty footer index".to_string())),
        };
        let buf = self.read_region(start, self.index_start as u64)?;
        let mut cursor = Cursor::new(&buf);
        let field_count = cursor.read_u32()?;
        let mut fields = Vec::with_capacity(field_count as usize);
        for _ in 0..field_count {
            let tag = cursor.read_u32()?;
            let field_type = FieldType::from_tag(tag).ok_or_else(|| {
                CubeError::Storage(format!("unknown metachunk field tag {}", tag))
            })?;
            match field_type {
                FieldType::UserKey | FieldType::Text => {
                    let value_count = cursor.read_u32()?;
                    let mut values = Vec::with_capacity(value_count as usize);
                    for _ in 0..value_count {
                        let len = cursor.read_u32()? as usize;
                        let bytes = cursor.read_bytes(len)?;
                        let value = String::from_utf8(bytes.to_vec()).map_err(|_| {
                            CubeError::Storage(
                                "dictionary value is not valid UTF-8".to_string(),
                            )
                        })?;
                        values.push(value);
                    }
                    fields.push(MetaFieldData::Dict { field_type, values });
                }
                FieldType::Metric => {
                    let rows = cursor.read_u32()?;
                    let min = cursor.read_u32()? as i32;
                    let max = cursor.read_u32()? as i32;
                    fields.push(MetaFieldData::Range { rows, min, max });
                }
            }
        }
        cursor.expect_end()?;
        Ok(fields)
    }

    /// Read a [start, end) region and verify its trailing CRC32, returning
    /// the payload without the CRC word.
    fn read_region(&mut self, start: u64, end: u64) -> Result<Vec<u8>> {
        if end <= start + INT_BYTES {
            return Err(CubeError::Storage(format!(
                "region [{}, {}) too small for a checksum",
                start, end
            )));
        }
        self.file.seek(SeekFrom::Start(start))?;
        let mut buf = vec![0u8; (end - start) as usize];
        self.file.read_exact(&mut buf)?;

        let split = buf.len() - INT_BYTES as usize;
        let mut crc_word = [0u8; 4];
        crc_word.copy_from_slice(&buf[split..]);
        let stored = read_u32(&crc_word);
        let actual = crc32fast::hash(&buf[..split]);
        if stored != actual {
            return Err(CubeError::Storage(format!(
                "checksum mismatch at offset {}: stored {:#010x}, computed {:#010x}",
                start, stored, actual
            )));
        }
        buf.truncate(split);
        Ok(buf)
    }
}

// =============================================================================
// Decode Cursor
// =============================================================================

/// Bounds-checked cursor over a decoded region
struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn read_u32(&mut self) -> Result<u32> {
        let bytes = self.read_bytes(INT_BYTES as usize)?;
        let mut word = [0u8; 4];
        word.copy_from_slice(bytes);
        Ok(read_u32(&word))
    }

    fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        if self.pos + len > self.buf.len() {
            return Err(CubeError::Storage(format!(
                "truncated region: need {} bytes at position {} of {}",
                len,
                self.pos,
                self.buf.len()
            )));
        }
        let bytes = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    fn expect_end(&self) -> Result<()> {
        if self.pos != self.buf.len() {
            return Err(CubeError::Storage(format!(
                "{} trailing bytes after decoded region",
                self.buf.len() - self.pos
            )));
        }
        Ok(())
    }
}
