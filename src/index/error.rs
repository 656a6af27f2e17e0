//! Error types for item index decoding, encoding and storage.

use thiserror::Error;

/// Errors that can occur while building, decoding or storing item indexes
#[derive(Error, Debug)]
pub enum IndexError {
    /// Requested position is not smaller than the index size
    #[error("Position {pos} out of bounds for size {size}")]
    OutOfBounds { pos: u64, size: u64 },

    /// Header fields are inconsistent with the available bytes
    #[error("Corrupt data: {0}")]
    CorruptData(String),

    /// Stored format version differs from the one this reader understands
    #[error("Version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u8, found: u8 },

    /// A regression parameter or residual does not fit its representation
    #[error("Overflow: {0}")]
    Overflow(String),

    /// Input values are not strictly ascending
    #[error("Values not strictly ascending at position {pos}")]
    Unsorted { pos: usize },

    /// Unknown codec tag byte
    #[error("Unknown index type tag: {0}")]
    UnknownType(u8),

    /// The requested codec cannot represent the given values
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A shared lock was poisoned by a panicking writer
    #[error("Lock poisoned: {0}")]
    Poisoned(String),
}

impl IndexError {
    pub(crate) fn corrupt(msg: impl Into<String>) -> Self {
        IndexError::CorruptData(msg.into())
    }

    pub(crate) fn out_of_bounds(pos: impl Into<u64>, size: impl Into<u64>) -> Self {
        IndexError::OutOfBounds {
            pos: pos.into(),
            size: size.into(),
        }
    }
}

/// Result type alias for item index operations
pub type IndexResult<T> = Result<T, IndexError>;
