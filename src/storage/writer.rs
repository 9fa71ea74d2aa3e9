//! CubletWriter — the top-level cublet build orchestrator
//!
//! Owns the open/append/finish/close lifecycle and the chunk/cublet boundary
//! policy. Records flow in append order; the writer decides when a chunk is
//! flushed and when a cublet rolls over to a new file.
//!
//! ## Boundary Policy
//! - A chunk closes only once it holds at least `chunk_row_limit` rows AND
//!   the incoming record's user key differs from the previous record's, so
//!   one user's run of rows is never split across a chunk boundary. A heavy
//!   user therefore yields one oversized chunk; that trade is accepted for
//!   per-user locality.
//! - Cublet rollover is evaluated only immediately after a chunk boundary,
//!   so a chunk is never torn across cublet files.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use crate::config::Config;
use crate::error::{CubeError, Result};
use crate::schema::Schema;

use super::chunk::ChunkWriter;
use super::footer::FooterIndex;
use super::metachunk::MetaChunkWriter;
use super::naming::{NamingStrategy, SequentialNaming};
use super::CUBLET_EXT;

/// Writer lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriterState {
    Unopened,
    Open,
    Finished,
}

/// Builds immutable cublet files from an append-only record stream.
///
/// Strictly single-threaded and sequential: `append`/`finish`/`close` must
/// come from one logical stream. Each cublet file is exclusively owned by
/// this writer for its full lifetime.
pub struct CubletWriter {
    // -------------------------------------------------------------------------
    // Fixed for the writer's lifetime
    // -------------------------------------------------------------------------
    schema: Schema,
    config: Config,
    naming: Box<dyn NamingStrategy>,
    /// Resolved chunk-boundary continuity column
    user_key_index: usize,

    // -------------------------------------------------------------------------
    // Lifecycle state
    // -------------------------------------------------------------------------
    state: WriterState,

    // -------------------------------------------------------------------------
    // Per-cublet build context
    // -------------------------------------------------------------------------
    out: Option<BufWriter<File>>,
    current_path: Option<PathBuf>,
    /// Running byte offset within the open cublet
    offset: u64,
    index: FooterIndex,
    meta: Option<MetaChunkWriter>,
    chunk: Option<ChunkWriter>,
    /// User key of the previous appended record
    last_user: Option<String>,

    // -------------------------------------------------------------------------
    // Counters (for logging and tests)
    // -------------------------------------------------------------------------
    rows_appended: u64,
    cublets_created: u64,
}

impl CubletWriter {
    /// Create a writer with the default deterministic naming strategy.
    ///
    /// Validates schema and config up front; no file is created until
    /// `initialize`.
    pub fn new(schema: Schema, config: Config) -> Result<Self> {
        Self::with_naming(schema, config, Box::new(SequentialNaming::default()))
    }

    /// Create a writer with an injected cublet naming strategy
    pub fn with_naming(
        schema: Schema,
        config: Config,
        naming: Box<dyn NamingStrategy>,
    ) -> Result<Self> {
        config.validate()?;
        schema.validate()?;
        // Any stable grouping column works when no user key is declared.
        let user_key_index = schema.user_key_index().unwrap_or(0);
        Ok(Self {
            schema,
            config,
            naming,
            user_key_index,
            state: WriterState::Unopened,
            out: None,
            current_path: None,
            offset: 0,
            index: FooterIndex::new(),
            meta: None,
            chunk: None,
            last_user: None,
            rows_appended: 0,
            cublets_created: 0,
        })
    }

    /// Open the first cublet with an empty chunk and a fresh metachunk.
    ///
    /// Idempotent while the writer is open; fails only on I/O errors
    /// creating the output location or file.
    pub fn initialize(&mut self) -> Result<()> {
        match self.state {
            WriterState::Open => return Ok(()),
            WriterState::Finished => {
                return Err(CubeError::InvalidState(
                    "initialize called after finish".to_string(),
                ))
            }
            WriterState::Unopened => {}
        }
        fs::create_dir_all(&self.config.output_dir)?;
        self.open_cublet()?;
        self.state = WriterState::Open;
        Ok(())
    }

    /// Append one record.
    ///
    /// Evaluated in order: chunk-switch decision, then — only immediately
    /// after a chunk switch — cublet rollover, then the record is absorbed
    /// into the metachunk and the current chunk. A malformed record fails
    /// without mutating any writer state.
    pub fn append<S: AsRef<str>>(&mut self, record: &[S]) -> Result<()> {
        match self.state {
            WriterState::Open => {}
            WriterState::Unopened => {
                return Err(CubeError::InvalidState(
                    "append called before initialize".to_string(),
                ))
            }
            WriterState::Finished => {
                return Err(CubeError::InvalidState(
                    "append called after finish".to_string(),
                ))
            }
        }

        let fields: Vec<&str> = record.iter().map(|s| s.as_ref()).collect();
        self.schema.validate_record(&fields)?;
        let cur_user = fields[self.user_key_index].to_string();

        if self.switch_chunk_if_due(&cur_user)? {
            self.switch_cublet_if_due()?;
        }
        self.last_user = Some(cur_user);

        // The metachunk absorbs the record first so the chunk's dictionary
        // lookups resolve.
        self.meta_mut()?.update(&fields)?;
        self.chunk_mut()?.put(&fields)?;
        self.rows_appended += 1;
        Ok(())
    }

    /// Flush the in-flight chunk (if it holds rows) and finalize the open
    /// cublet: metachunk footer, offset index, trailing pointer, flush,
    /// sync, close.
    ///
    /// Idempotent terminal step; no `append` is valid afterwards.
    pub fn finish(&mut self) -> Result<()> {
        match self.state {
            WriterState::Finished => return Ok(()),
            WriterState::Unopened => {
                self.state = WriterState::Finished;
                return Ok(());
            }
            WriterState::Open => {}
        }
        // An I/O failure leaves the cublet non-resumable either way, so the
        // writer transitions to Finished even when finalization fails.
        let result = self.finish_open();
        self.state = WriterState::Finished;
        result
    }

    /// Guarantee `finish` has run, surfacing its error; safe to repeat
    pub fn close(&mut self) -> Result<()> {
        self.finish()
    }

    // =========================================================================
    // Boundary Decisions
    // =========================================================================

    /// Close the current chunk when it is full AND the user key changed.
    ///
    /// User keys are compared by value equality.
    fn switch_chunk_if_due(&mut self, cur_user: &str) -> Result<bool> {
        if (self.chunk_ref()?.row_count() as usize) < self.config.chunk_row_limit {
            return Ok(false);
        }
        match &self.last_user {
            Some(last) if last.as_str() != cur_user => {}
            // Same user, or the first record of the stream: keep the chunk.
            _ => return Ok(false),
        }
        self.flush_chunk()?;
        Ok(true)
    }

    /// Roll over to a new cublet file once the running offset has reached
    /// the size limit. Checked only right after a chunk boundary.
    fn switch_cublet_if_due(&mut self) -> Result<()> {
        if self.offset < self.config.cublet_size_limit {
            return Ok(());
        }
        self.finish_cublet()?;
        self.open_cublet()?;
        Ok(())
    }

    // =========================================================================
    // Cublet Lifecycle
    // =========================================================================

    /// Create the next cublet file and reset the per-cublet build context
    fn open_cublet(&mut self) -> Result<()> {
        let name = self.naming.next_name();
        let path = self
            .config
            .output_dir
            .join(format!("{}.{}", name, CUBLET_EXT));
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)?;
        self.out = Some(BufWriter::new(file));
        self.offset = 0;
        self.index = FooterIndex::new();
        let meta = MetaChunkWriter::new(&self.schema);
        self.chunk = Some(ChunkWriter::new(&self.schema, meta.fields(), 0));
        self.meta = Some(meta);
        self.cublets_created += 1;
        tracing::info!(path = %path.display(), "created cublet");
        self.current_path = Some(path);
        Ok(())
    }

    /// Serialize the current chunk, record its start offset, and start a
    /// fresh empty chunk at the new offset
    fn flush_chunk(&mut self) -> Result<()> {
        let chunk = self.take_chunk()?;
        let start = cast_offset(self.offset)?;
        let out = self.out_mut()?;
        let len = chunk.write_to(out)?;
        self.offset += len;
        self.index.push(start)?;
        tracing::debug!(
            rows = chunk.row_count(),
            start,
            bytes = len,
            "flushed chunk"
        );
        let meta_fields = self.meta_ref()?.fields();
        self.chunk = Some(ChunkWriter::new(&self.schema, meta_fields, self.offset));
        Ok(())
    }

    /// Write the metachunk footer, the offset index, and the trailing
    /// index-start pointer, then flush, sync, and close the file.
    fn finish_cublet(&mut self) -> Result<()> {
        // Moving the handle out of the writer ties its release to this
        // scope: every exit path, success or error, closes the file.
        let mut out = self.take_out()?;
        let meta = self.take_meta()?;

        let footer_start = cast_offset(self.offset)?;
        let len = meta.write_to(&mut out)?;
        self.offset += len;
        self.index.push(footer_start)?;

        let index_start = cast_offset(self.offset)?;
        self.index.write_to(&mut out, index_start)?;
        out.flush()?;
        let file = out
            .into_inner()
            .map_err(|e| CubeError::Storage(format!("failed to flush cublet: {}", e)))?;
        file.sync_all()?;

        if let Some(path) = &self.current_path {
            tracing::info!(
                path = %path.display(),
                chunks = self.index.len() - 1,
                footer_start,
                index_start,
                "finalized cublet"
            );
        }
        Ok(())
    }

    /// Finalize from the Open state: flush a non-empty in-flight chunk,
    /// then close out the cublet. An empty in-flight chunk is discarded, so
    /// an immediately finished writer yields a cublet with zero data chunks.
    fn finish_open(&mut self) -> Result<()> {
        if self.chunk_ref()?.row_count() > 0 {
            self.flush_chunk()?;
        }
        self.finish_cublet()
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Total records appended across all cublets
    pub fn rows_appended(&self) -> u64 {
        self.rows_appended
    }

    /// Number of cublet files created so far
    pub fn cublets_created(&self) -> u64 {
        self.cublets_created
    }

    /// Resolved user-key column index
    pub fn user_key_index(&self) -> usize {
        self.user_key_index
    }

    /// Path of the cublet currently being written, if any
    pub fn current_path(&self) -> Option<&PathBuf> {
        self.current_path.as_ref()
    }

    // =========================================================================
    // Internal State Access
    // =========================================================================
    // The per-cublet context fields are always populated while the writer is
    // Open; a missing one means the lifecycle was violated or a prior
    // finalization failure left the cublet non-resumable.

    fn out_mut(&mut self) -> Result<&mut BufWriter<File>> {
        self.out
            .as_mut()
            .ok_or_else(|| CubeError::InvalidState("no open cublet".to_string()))
    }

    fn take_out(&mut self) -> Result<BufWriter<File>> {
        self.out
            .take()
            .ok_or_else(|| CubeError::InvalidState("no open cublet".to_string()))
    }

    fn meta_ref(&self) -> Result<&MetaChunkWriter> {
        self.meta
            .as_ref()
            .ok_or_else(|| CubeError::InvalidState("no open metachunk".to_string()))
    }

    fn meta_mut(&mut self) -> Result<&mut MetaChunkWriter> {
        self.meta
            .as_mut()
            .ok_or_else(|| CubeError::InvalidState("no open metachunk".to_string()))
    }

    fn take_meta(&mut self) -> Result<MetaChunkWriter> {
        self.meta
            .take()
            .ok_or_else(|| CubeError::InvalidState("no open metachunk".to_string()))
    }

    fn chunk_ref(&self) -> Result<&ChunkWriter> {
        self.chunk
            .as_ref()
            .ok_or_else(|| CubeError::InvalidState("no open chunk".to_string()))
    }

    fn chunk_mut(&mut self) -> Result<&mut ChunkWriter> {
        self.chunk
            .as_mut()
            .ok_or_else(|| CubeError::InvalidState("no open chunk".to_string()))
    }

    fn take_chunk(&mut self) -> Result<ChunkWriter> {
        self.chunk
            .take()
            .ok_or_else(|| CubeError::InvalidState("no open chunk".to_string()))
    }
}

impl Drop for CubletWriter {
    /// Last-resort safety net: finalize an abandoned open writer so the
    /// cublet on disk still ends with a footer and index. Callers that need
    /// the error must call `close` explicitly.
    fn drop(&mut self) {
        if self.state == WriterState::Open {
            if let Err(e) = self.finish() {
                tracing::error!("failed to finalize cublet on drop: {}", e);
            }
        }
    }
}

/// Offsets in the footer index are 32-bit; the cublet size limit keeps
/// files far below this in practice.
fn cast_offset(offset: u64) -> Result<u32> {
    u32::try_from(offset).map_err(|_| {
        CubeError::Storage(format!(
            "offset {} exceeds the 32-bit offset space",
            offset
        ))
    })
}
