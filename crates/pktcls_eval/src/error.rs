//! Driver-level error type.

use std::fmt;

use thiserror::Error;

use pktcls_core::engine::EngineError;

/// A search outcome, printable as a rule priority or "no match".
#[derive(Debug, PartialEq, Eq)]
pub struct MatchOut(pub Option<u32>);

impl fmt::Display for MatchOut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(priority) => write!(f, "rule {priority}"),
            None => write!(f, "no match"),
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] pktcls_io::Error),

    #[error("building failed: {0}")]
    Build(EngineError),

    #[error("updating failed: {0}")]
    Update(EngineError),

    #[error("search mismatch at packet {index}: expected {expected}, got {got}")]
    SearchMismatch {
        index: usize,
        expected: MatchOut,
        got: MatchOut,
    },

    #[error("unknown algorithm id {0} (0: HyperSplit, 1: TSS)")]
    UnknownAlgorithm(u8),
}
