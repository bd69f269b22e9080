//! Page I/O backend implementations.
//!
//! This module provides the `Storage` trait for page-based I/O, along with
//! the `MemoryStorage` and `FileStorage` implementations.

mod file;
mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

use super::page::PageId;
use crate::storage::error::StorageError;

/// Page I/O backend trait.
///
/// Reads and writes fixed-size pages through caller-owned buffers. The
/// backend never interprets page contents and does no caching; caching and
/// pinning are the buffer pool's job.
///
/// Pages are allocated explicitly with [`allocate_page`](Storage::allocate_page),
/// which grows the storage by one zeroed page. The first allocation on an
/// empty storage returns `PageId(0)`, and page numbers increase sequentially
/// from there.
pub trait Storage {
    /// Reads a page into a caller-provided buffer.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::PageNotFound` if the page has not been
    /// allocated, and `StorageError::InvalidBufferSize` if
    /// `buf.len() != PAGE_SIZE`.
    fn read_page(&self, page_id: PageId, buf: &mut [u8]) -> Result<(), StorageError>;

    /// Writes a page from a caller-provided buffer.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::PageNotFound` if the page has not been
    /// allocated, and `StorageError::InvalidBufferSize` if
    /// `buf.len() != PAGE_SIZE`.
    fn write_page(&self, page_id: PageId, buf: &[u8]) -> Result<(), StorageError>;

    /// Allocates a new zero-filled page and returns its id.
    fn allocate_page(&self) -> Result<PageId, StorageError>;

    /// Returns the total number of allocated pages.
    fn page_count(&self) -> usize;

    /// Syncs all pending writes to physical disk.
    ///
    /// A no-op for `MemoryStorage`; `FileStorage` calls `sync_all` so data
    /// survives a crash.
    fn sync_all(&self) -> Result<(), StorageError>;
}
