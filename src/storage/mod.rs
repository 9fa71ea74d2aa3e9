//! Cublet Storage Module
//!
//! Immutable columnar storage files ("cublets") holding chunked row-groups,
//! a metachunk footer, and a trailing random-access offset index.
//!
//! ## File Format
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │ Data Chunks (zero or more)                                   │
//! │   [RowCount: u32][FieldCount: u32]                           │
//! │   [Column: RowCount × u32] ... one column per field ...      │
//! │   [CRC32: u32]                                               │
//! ├──────────────────────────────────────────────────────────────┤
//! │ MetaChunk (exactly one)                                      │
//! │   [FieldCount: u32]                                          │
//! │   per field: [TypeTag: u32] + dictionary or min/max stats    │
//! │   [CRC32: u32]                                               │
//! ├──────────────────────────────────────────────────────────────┤
//! │ Footer Index                                                 │
//! │   [IndexCount: u32]                                          │
//! │   [Offset: u32] × IndexCount   (chunk starts, then metachunk)│
//! │   [IndexStart: u32]            (absolute offset of IndexCount)│
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! All integers are little-endian regardless of the running platform, so
//! cublets are portable across machines. There is no magic header and no
//! version field; a reader locates the index by seeking to (length − 4).

mod chunk;
mod footer;
mod metachunk;
mod naming;
mod reader;
mod writer;

use std::io::{self, Write};

pub use chunk::ChunkWriter;
pub use footer::FooterIndex;
pub use metachunk::{MetaChunkWriter, MetaField, MetaFields};
pub use naming::{NamingStrategy, SequentialNaming, TimestampNaming};
pub use reader::{ChunkData, CubletReader, MetaFieldData};
pub use writer::CubletWriter;

// =============================================================================
// Shared Constants
// =============================================================================

/// File extension for cublet files
pub const CUBLET_EXT: &str = "dz";

/// Size of every integer in the format
pub(crate) const INT_BYTES: u64 = 4;

// =============================================================================
// Byte-Order Primitives
// =============================================================================
// One fixed convention for every integer in the format, chosen once and
// independent of the platform's native order.

/// Write one u32 in the format's fixed byte order
pub(crate) fn write_u32<W: Write>(out: &mut W, value: u32) -> io::Result<()> {
    out.write_all(&value.to_le_bytes())
}

/// Decode one u32 from the format's fixed byte order
pub(crate) fn read_u32(buf: &[u8; 4]) -> u32 {
    u32::from_le_bytes(*buf)
}
