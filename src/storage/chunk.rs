//! Chunk — one contiguous row-group inside a cublet
//!
//! A chunk buffers encoded rows column by column and serializes itself on
//! demand. Cells are translated through the cublet's shared meta-field view,
//! so every chunk of a cublet uses the same dictionaries.

use std::io::Write;

use bytes::{BufMut, BytesMut};

use crate::error::Result;
use crate::schema::Schema;

use super::metachunk::MetaFields;

/// Buffers one chunk's rows and serializes them as columnar u32 cells
pub struct ChunkWriter {
    meta: MetaFields,
    columns: Vec<Vec<u32>>,
    row_count: u32,
    start_offset: u64,
}

impl ChunkWriter {
    /// Create an empty chunk starting at `start_offset` in the cublet
    pub fn new(schema: &Schema, meta: MetaFields, start_offset: u64) -> Self {
        Self {
            meta,
            columns: vec![Vec::new(); schema.field_count()],
            row_count: 0,
            start_offset,
        }
    }

    /// Append one validated record.
    ///
    /// The metachunk must have absorbed the record first so dictionary
    /// lookups resolve.
    pub fn put(&mut self, record: &[&str]) -> Result<()> {
        let meta = self.meta.borrow();
        for ((column, field), raw) in self.columns.iter_mut().zip(meta.iter()).zip(record) {
            column.push(field.encode(raw)?);
        }
        self.row_count += 1;
        Ok(())
    }

    /// Rows buffered so far
    pub fn row_count(&self) -> u32 {
        self.row_count
    }

    /// Start offset of this chunk within its cublet
    pub fn start_offset(&self) -> u64 {
        self.start_offset
    }

    /// Serialize the chunk, returning its byte length.
    ///
    /// Called at most once per chunk.
    pub fn write_to<W: Write>(&self, out: &mut W) -> Result<u64> {
        let mut buf = BytesMut::with_capacity(
            8 + self.columns.len() * self.row_count as usize * 4 + 4,
        );
        buf.put_u32_le(self.row_count);
        buf.put_u32_le(self.columns.len() as u32);
        for column in &self.columns {
            for &cell in column {
                buf.put_u32_le(cell);
            }
        }
        let crc = crc32fast::hash(&buf);
        buf.put_u32_le(crc);
        out.write_all(&buf)?;
        Ok(buf.len() as u64)
    }
}
