//! MetaChunk — per-cublet field dictionaries and statistics
//!
//! One metachunk accumulates over every row ingested into a cublet, across
//! all of its chunks, and is serialized exactly once as the cublet's footer.
//! Data chunks encode their cells through the same accumulators, so the
//! meta-field store is shared between the metachunk and the open chunk.

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::Write;
use std::rc::Rc;

use bytes::{BufMut, BytesMut};

use crate::error::{CubeError, Result};
use crate::schema::{FieldType, Schema};

/// Shared view of the per-field accumulators.
///
/// The writer is strictly single-threaded, so shared ownership between the
/// metachunk and the open chunk needs no locking.
pub type MetaFields = Rc<RefCell<Vec<MetaField>>>;

/// Accumulator for one schema field
#[derive(Debug)]
pub enum MetaField {
    /// Dictionary for UserKey/Text fields; ids assigned in first-seen order
    Dict {
        ids: HashMap<String, u32>,
        values: Vec<String>,
    },
    /// Running min/max statistics for Metric fields
    Range { rows: u32, min: i32, max: i32 },
}

impl MetaField {
    fn empty(field_type: FieldType) -> Self {
        match field_type {
            FieldType::UserKey | FieldType::Text => MetaField::Dict {
                ids: HashMap::new(),
                values: Vec::new(),
            },
            FieldType::Metric => MetaField::Range {
                rows: 0,
                min: i32::MAX,
                max: i32::MIN,
            },
        }
    }

    /// Absorb one raw field value
    fn update(&mut self, raw: &str) -> Result<()> {
        match self {
            MetaField::Dict { ids, values } => {
                if !ids.contains_key(raw) {
                    ids.insert(raw.to_string(), values.len() as u32);
                    values.push(raw.to_string());
                }
            }
            MetaField::Range { rows, min, max } => {
                let value: i32 = raw.parse().map_err(|_| {
                    CubeError::MalformedRecord(format!(
                        "'{}' is not a valid 32-bit integer",
                        raw
                    ))
                })?;
                *rows += 1;
                *min = (*min).min(value);
                *max = (*max).max(value);
            }
        }
        Ok(())
    }

    /// Encode one raw value into its u32 cell representation.
    ///
    /// For dictionary fields the value must already have been absorbed by
    /// `update`; the writer feeds the metachunk before the chunk.
    pub fn encode(&self, raw: &str) -> Result<u32> {
        match self {
            MetaField::Dict { ids, .. } => ids.get(raw).copied().ok_or_else(|| {
                CubeError::Storage(format!("value '{}' missing from dictionary", raw))
            }),
            MetaField::Range { .. } => {
                let value: i32 = raw.parse().map_err(|_| {
                    CubeError::MalformedRecord(format!(
                        "'{}' is not a valid 32-bit integer",
                        raw
                    ))
                })?;
                Ok(value as u32)
            }
        }
    }
}

/// Accumulates a cublet's metachunk and serializes it as the footer
pub struct MetaChunkWriter {
    field_types: Vec<FieldType>,
    fields: MetaFields,
}

impl MetaChunkWriter {
    /// Create empty accumulators for a freshly opened cublet
    pub fn new(schema: &Schema) -> Self {
        let field_types: Vec<FieldType> =
            schema.fields.iter().map(|f| f.field_type).collect();
        let fields = field_types
            .iter()
            .map(|&t| MetaField::empty(t))
            .collect::<Vec<_>>();
        Self {
            field_types,
            fields: Rc::new(RefCell::new(fields)),
        }
    }

    /// Shared meta-field view handed to every chunk of this cublet
    pub fn fields(&self) -> MetaFields {
        Rc::clone(&self.fields)
    }

    /// Absorb one validated record into the running dictionaries/statistics
    pub fn update(&mut self, record: &[&str]) -> Result<()> {
        let mut fields = self.fields.borrow_mut();
        for (field, raw) in fields.iter_mut().zip(record) {
            field.update(raw)?;
        }
        Ok(())
    }

    /// Serialize the metachunk footer, returning its byte length.
    ///
    /// Invoked exactly once per cublet at finalize time.
    pub fn write_to<W: Write>(&self, out: &mut W) -> Result<u64> {
        let fields = self.fields.borrow();
        let mut buf = BytesMut::new();
        buf.put_u32_le(fields.len() as u32);
        for (field, &field_type) in fields.iter().zip(&self.field_types) {
            buf.put_u32_le(field_type.tag());
            match field {
                MetaField::Dict { values, .. } => {
                    buf.put_u32_le(values.len() as u32);
                    for value in values {
                        buf.put_u32_le(value.len() as u32);
                        buf.put_slice(value.as_bytes());
                    }
                }
                MetaField::Range { rows, min, max } => {
                    buf.put_u32_le(*rows);
                    if *rows == 0 {
                        buf.put_i32_le(0);
                        buf.put_i32_le(0);
                    } else {
                        buf.put_i32_le(*min);
                        buf.put_i32_le(*max);
                    }
                }
            }
        }
        let crc = crc32fast::hash(&buf);
        buf.put_u32_le(crc);
        out.write_all(&buf)?;
        Ok(buf.len() as u64)
    }
}
