//! Error types for CubeDB
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using CubeError
pub type Result<T> = std::result::Result<T, CubeError>;

/// Unified error type for CubeDB operations
#[derive(Debug, Error)]
pub enum CubeError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    // -------------------------------------------------------------------------
    // Record Errors
    // -------------------------------------------------------------------------
    /// A record's shape does not match the schema. Reported per record and
    /// never aborts the writer; the caller decides to skip or abort.
    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    // -------------------------------------------------------------------------
    // Lifecycle Errors
    // -------------------------------------------------------------------------
    /// An operation was invoked outside its valid writer state
    /// (e.g. append before initialize or after finish).
    #[error("Invalid writer state: {0}")]
    InvalidState(String),

    // -------------------------------------------------------------------------
    // Storage Errors
    // -------------------------------------------------------------------------
    #[error("Storage error: {0}")]
    Storage(String),
}
