//! Error types for rule and trace ingestion.

use std::path::PathBuf;

use thiserror::Error;

/// Error type for ingestion operations. Every variant is fatal at its point
/// of detection; the driver reports it and terminates.
#[derive(Error, Debug)]
pub enum Error {
    /// The input file could not be opened or read.
    #[error("cannot open {path}: {source}")]
    FileOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A line did not match the expected record format.
    #[error("{path}:{line}: {detail}")]
    ParseFormat {
        path: PathBuf,
        line: usize,
        detail: String,
    },

    /// A protocol mask other than 0x00 or 0xFF.
    #[error("{path}:{line}: unsupported protocol mask {mask:#04x}")]
    UnsupportedMask {
        path: PathBuf,
        line: usize,
        mask: u8,
    },

    /// The input held more records than the fixed capacity cap.
    #[error("{path}: too many records (limit {cap})")]
    CapacityExceeded { path: PathBuf, cap: usize },
}

/// Result type alias for ingestion operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Per-line failure, before file/line context is attached.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum LineError {
    #[error("malformed record")]
    Syntax,

    #[error("unsupported protocol mask {0:#04x}")]
    ProtoMask(u8),

    #[error("port prefix length {0} out of range (0..=16)")]
    PortLen(u32),

    #[error("rule id must be 1-based and nonzero")]
    RuleId,
}
