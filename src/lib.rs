//! # CubeDB
//!
//! Write path of a columnar data-cube (OLAP) storage engine:
//! - Immutable columnar storage files ("cublets")
//! - Progressive row-group segmentation ("chunks") with per-user locality
//! - Cross-chunk field dictionaries/statistics ("the meta chunk")
//! - Trailing random-access footer index
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   Delimited Records                          │
//! │                 (append-only stream)                         │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                   CubletWriter                               │
//! │         (lifecycle + chunk/cublet boundary policy)           │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │  MetaChunk  │◄─shared──│    Chunk    │
//!   │ (dict/stats)│   view   │  (columns)  │
//!   └──────┬──────┘          └──────┬──────┘
//!          │                        │
//!          ▼                        ▼
//!   ┌─────────────────────────────────────┐
//!   │        Cublet file + footer index    │
//!   └─────────────────────────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod schema;
pub mod storage;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{CubeError, Result};
pub use config::Config;
pub use schema::{Field, FieldType, Schema};
pub use storage::{CubletReader, CubletWriter};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of CubeDB
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
