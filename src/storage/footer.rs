//! Footer offset index
//!
//! In-process offset table built while writing a cublet and flushed as the
//! file's trailing index: count, the recorded offsets (chunks, then the
//! metachunk), and one final integer holding the index's own start offset so
//! a reader can jump straight to it from (file length − 4).

use std::io::Write;

use crate::error::{CubeError, Result};

use super::write_u32;

/// Ordered table of absolute byte offsets within one cublet
#[derive(Debug, Default)]
pub struct FooterIndex {
    offsets: Vec<u32>,
}

impl FooterIndex {
    /// Create an empty index for a freshly opened cublet
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the start offset of a flushed chunk or the metachunk.
    ///
    /// Offsets must strictly increase in write order.
    pub fn push(&mut self, offset: u32) -> Result<()> {
        if let Some(&last) = self.offsets.last() {
            if offset <= last {
                return Err(CubeError::Storage(format!(
                    "footer index offset {} does not increase past {}",
                    offset, last
                )));
            }
        }
        self.offsets.push(offset);
        Ok(())
    }

    /// Number of recorded offsets (flushed chunks plus the metachunk)
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Recorded offsets in write order
    pub fn offsets(&self) -> &[u32] {
        &self.offsets
    }

    /// Serialize the index: count, offsets, trailing index-start pointer.
    ///
    /// `index_start` is the absolute offset at which this index begins —
    /// the value a reader finds in the file's last 4 bytes.
    pub fn write_to<W: Write>(&self, out: &mut W, index_start: u32) -> Result<u64> {
        write_u32(out, self.offsets.len() as u32)?;
        for &offset in &self.offsets {
            write_u32(out, offset)?;
        }
        write_u32(out, index_start)?;
        Ok((self.offsets.len() as u64 + 2) * super::INT_BYTES)
    }
}
