//! Storage layer errors.

use crate::storage::PageId;

/// Errors from the page I/O backends.
#[derive(Debug)]
pub enum StorageError {
    /// Page has not been allocated in this storage.
    PageNotFound(PageId),

    /// Buffer passed to read_page/write_page is not exactly PAGE_SIZE bytes.
    InvalidBufferSize {
        /// Expected buffer size (PAGE_SIZE).
        expected: usize,
        /// Actual buffer size provided.
        actual: usize,
    },

    /// I/O error from the underlying file system.
    Io(std::io::Error),

    /// The backing file has an invalid format or size.
    Corrupted(String),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::PageNotFound(id) => write!(f, "page not found: {}", id),
            StorageError::InvalidBufferSize { expected, actual } => {
                write!(f, "invalid buffer size: expected {}, got {}", expected, actual)
            }
            StorageError::Io(e) => write!(f, "I/O error: {}", e),
            StorageError::Corrupted(msg) => write!(f, "data corruption: {}", msg),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        StorageError::Io(e)
    }
}
