//! Cublet naming strategies
//!
//! Cublet identifiers must be unique per writer run. The strategy is
//! injectable so tests and re-runs get deterministic file names; the
//! wall-clock strategy reproduces the classic timestamp-derived naming.

use std::time::{SystemTime, UNIX_EPOCH};

/// Produces the identifier for each newly opened cublet
pub trait NamingStrategy {
    /// Next unique cublet identifier (without extension)
    fn next_name(&mut self) -> String;
}

/// Deterministic zero-padded monotonic counter — the default
#[derive(Debug, Clone)]
pub struct SequentialNaming {
    prefix: String,
    next: u64,
}

impl SequentialNaming {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: 0,
        }
    }
}

impl Default for SequentialNaming {
    fn default() -> Self {
        Self::new("")
    }
}

impl NamingStrategy for SequentialNaming {
    fn next_name(&mut self) -> String {
        let name = format!("{}{:016x}", self.prefix, self.next);
        self.next += 1;
        name
    }
}

/// Hex wall-clock milliseconds — non-deterministic, process-wide
#[derive(Debug, Clone, Default)]
pub struct TimestampNaming;

impl NamingStrategy for TimestampNaming {
    fn next_name(&mut self) -> String {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        format!("{:x}", millis)
    }
}
