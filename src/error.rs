//! Error types for chatlog

use thiserror::Error;

/// Structural problems found while decoding a chat log container
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("Truncated chat log: need {needed} bytes, have {actual}")]
    Truncated { needed: usize, actual: usize },

    #[error("Invalid header: total ({total}) is less than body ({body})")]
    InvalidHeader { body: u32, total: u32 },

    #[error("Invalid offset table: entry {index} is {offset} (previous {previous}, pool length {pool_len})")]
    InvalidOffsets {
        index: usize,
        offset: u32,
        previous: u32,
        pool_len: usize,
    },

    #[error("Malformed record {index}: expected 3 fields, found {fields}")]
    MalformedRecord { index: usize, fields: usize },
}

/// Main error type for chatlog operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error("Unknown channel: {0}")]
    UnknownChannel(String),
}

/// Result type alias for chatlog operations
pub type Result<T> = std::result::Result<T, Error>;
