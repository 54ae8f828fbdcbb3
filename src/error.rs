//! Error type for buffer operations
//!
//! Storage growth is the only thing that can fail at runtime. Broken
//! internal invariants are bugs and panic instead of surfacing here.

use std::collections::TryReserveError;

/// Errors that can occur while editing a [`crate::Buffer`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BufferError {
    /// A layer, the segment chain or the mark table could not grow
    Alloc(TryReserveError),
}

impl std::fmt::Display for BufferError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BufferError::Alloc(e) => write!(f, "Allocation failed: {}", e),
        }
    }
}

impl std::error::Error for BufferError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BufferError::Alloc(e) => Some(e),
        }
    }
}

impl From<TryReserveError> for BufferError {
    fn from(e: TryReserveError) -> Self {
        BufferError::Alloc(e)
    }
}

impl From<BufferError> for std::io::Error {
    fn from(e: BufferError) -> Self {
        std::io::Error::new(std::io::ErrorKind::OutOfMemory, e)
    }
}

/// Result alias used throughout the buffer API
pub type Result<T> = std::result::Result<T, BufferError>;
