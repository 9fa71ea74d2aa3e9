//! Configuration for CubeDB
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::error::{CubeError, Result};

/// Configuration for a cublet writer run
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Output Configuration
    // -------------------------------------------------------------------------
    /// Directory where cublet files are created.
    /// Internal structure:
    ///   {output_dir}/
    ///     ├── 0000000000000000.dz
    ///     ├── 0000000000000001.dz
    ///     └── ...
    pub output_dir: PathBuf,

    // -------------------------------------------------------------------------
    // Boundary Thresholds
    // -------------------------------------------------------------------------
    /// Rows per chunk before a chunk switch becomes eligible. A chunk may
    /// exceed this while absorbing a run of same-user rows.
    pub chunk_row_limit: usize,

    /// Bytes per cublet before the writer rolls over to a new file.
    /// Checked only right after a chunk boundary, so a chunk is never torn
    /// across cublet files.
    pub cublet_size_limit: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./cubedb_data"),
            chunk_row_limit: 65_536,
            cublet_size_limit: 1024 * 1024 * 1024, // 1 GB
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Validate thresholds before any file is created
    pub fn validate(&self) -> Result<()> {
        if self.output_dir.as_os_str().is_empty() {
            return Err(CubeError::Config("output directory is empty".to_string()));
        }
        if self.chunk_row_limit == 0 {
            return Err(CubeError::Config(
                "chunk row limit must be at least 1".to_string(),
            ));
        }
        if self.cublet_size_limit == 0 {
            return Err(CubeError::Config(
                "cublet size limit must be at least 1 byte".to_string(),
            ));
        }
        // Offsets in the footer index are 32-bit.
        if self.cublet_size_limit > u32::MAX as u64 {
            return Err(CubeError::Config(format!(
                "cublet size limit {} exceeds the 32-bit offset space",
                self.cublet_size_limit
            )));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the output directory for cublet files
    pub fn output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.output_dir = path.into();
        self
    }

    /// Set the chunk row limit
    pub fn chunk_row_limit(mut self, rows: usize) -> Self {
        self.config.chunk_row_limit = rows;
        self
    }

    /// Set the cublet size limit (in bytes)
    pub fn cublet_size_limit(mut self, bytes: u64) -> Self {
        self.config.cublet_size_limit = bytes;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
