//! Error types for the heap module.

use crate::heap::page::{RecordId, SlotId};
use crate::storage::{BufferPoolError, StorageError};

/// Errors from heap file operations.
///
/// Recoverable iteration sentinels do not appear here: scan exhaustion is
/// `Ok(None)` and intra-page exhaustion is `Option<SlotId>`. `PageFull` is
/// the one recoverable variant, consumed internally by the insert path when
/// it grows the page chain.
#[derive(Debug)]
pub enum HeapError {
    /// A heap file with this name already exists.
    FileExists(String),
    /// No heap file with this name exists.
    FileNotFound(String),
    /// File name is empty, too long, or contains a path separator.
    BadFileName(String),
    /// Record larger than a page's payload capacity.
    InvalidRecordLength {
        /// Length of the rejected record.
        length: usize,
        /// Maximum record length a page can hold.
        max: usize,
    },
    /// Invalid filter geometry or operator parameters.
    BadScanParam(String),
    /// Page is full, cannot insert the record.
    PageFull {
        /// Bytes required for the record and slot.
        required: usize,
        /// Bytes available in free space.
        available: usize,
    },
    /// Slot not found or already deleted.
    SlotNotFound(SlotId),
    /// No record at this id (deleted, or never existed).
    RecordNotFound(RecordId),
    /// The scan has no current record to act on.
    NoCurrentRecord,
    /// The file does not look like a heap file.
    Corrupted(String),
    /// Error from the buffer pool.
    Buffer(BufferPoolError),
    /// I/O error from the file system.
    Io(std::io::Error),
}

impl std::fmt::Display for HeapError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HeapError::FileExists(name) => write!(f, "heap file already exists: {}", name),
            HeapError::FileNotFound(name) => write!(f, "heap file not found: {}", name),
            HeapError::BadFileName(name) => write!(f, "bad heap file name: {:?}", name),
            HeapError::InvalidRecordLength { length, max } => {
                write!(f, "record of {} bytes exceeds page capacity of {}", length, max)
            }
            HeapError::BadScanParam(msg) => write!(f, "bad scan parameter: {}", msg),
            HeapError::PageFull {
                required,
                available,
            } => {
                write!(f, "page full: need {} bytes, have {} available", required, available)
            }
            HeapError::SlotNotFound(slot_id) => {
                write!(f, "slot {} not found or deleted", slot_id)
            }
            HeapError::RecordNotFound(rid) => write!(f, "no record at {}", rid),
            HeapError::NoCurrentRecord => write!(f, "scan has no current record"),
            HeapError::Corrupted(msg) => write!(f, "corrupted heap file: {}", msg),
            HeapError::Buffer(e) => write!(f, "buffer pool error: {}", e),
            HeapError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for HeapError {}

impl From<BufferPoolError> for HeapError {
    fn from(e: BufferPoolError) -> Self {
        HeapError::Buffer(e)
    }
}

impl From<StorageError> for HeapError {
    fn from(e: StorageError) -> Self {
        HeapError::Buffer(BufferPoolError::Storage(e))
    }
}

impl From<std::io::Error> for HeapError {
    fn from(e: std::io::Error) -> Self {
        HeapError::Io(e)
    }
}
