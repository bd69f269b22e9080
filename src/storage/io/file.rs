//! File-backed storage implementation.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use super::Storage;
use crate::storage::error::StorageError;
use crate::storage::page::{PageId, PAGE_SIZE};

/// File-backed storage: one heap file on disk.
///
/// Pages are stored as contiguous PAGE_SIZE blocks in a single file:
///
/// ```text
/// +------------------+------------------+------------------+
/// | Page 0 (8KB)     | Page 1 (8KB)     | Page 2 (8KB)     | ...
/// +------------------+------------------+------------------+
/// ^ offset 0         ^ offset 8192      ^ offset 16384
/// ```
///
/// The file handle sits behind a `parking_lot::Mutex` so a storage can be
/// shared by reference; all I/O through it is serialized.
#[derive(Debug)]
pub struct FileStorage {
    /// Path to the storage file.
    path: PathBuf,
    /// File handle, serialized access.
    file: Mutex<File>,
    /// Number of pages currently in the file.
    page_count: AtomicU64,
}

impl FileStorage {
    /// Opens an existing storage file.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Io` if the file cannot be opened and
    /// `StorageError::Corrupted` if its size is not a multiple of
    /// PAGE_SIZE.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let file = OpenOptions::new().read(true).write(true).open(&path)?;
        Self::from_file(path, file)
    }

    /// Creates a new storage file.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Io` with kind `AlreadyExists` if a file
    /// already exists at `path`.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(&path)?;
        Self::from_file(path, file)
    }

    fn from_file(path: PathBuf, file: File) -> Result<Self, StorageError> {
        let file_size = file.metadata()?.len();
        if file_size % PAGE_SIZE as u64 != 0 {
            return Err(StorageError::Corrupted(format!(
                "file size {} is not a multiple of page size {}",
                file_size, PAGE_SIZE
            )));
        }

        Ok(Self {
            path,
            file: Mutex::new(file),
            page_count: AtomicU64::new(file_size / PAGE_SIZE as u64),
        })
    }

    /// Returns the path to the storage file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn check_bounds(&self, page_id: PageId) -> Result<(), StorageError> {
        if page_id.page_num() >= self.page_count.load(Ordering::Acquire) {
            return Err(StorageError::PageNotFound(page_id));
        }
        Ok(())
    }
}

impl Storage for FileStorage {
    fn read_page(&self, page_id: PageId, buf: &mut [u8]) -> Result<(), StorageError> {
        if buf.len() != PAGE_SIZE {
            return Err(StorageError::InvalidBufferSize {
                expected: PAGE_SIZE,
                actual: buf.len(),
            });
        }
        self.check_bounds(page_id)?;

        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(page_id.byte_offset()))?;
        file.read_exact(buf)?;
        Ok(())
    }

    fn write_page(&self, page_id: PageId, buf: &[u8]) -> Result<(), StorageError> {
        if buf.len() != PAGE_SIZE {
            return Err(StorageError::InvalidBufferSize {
                expected: PAGE_SIZE,
                actual: buf.len(),
            });
        }
        self.check_bounds(page_id)?;

        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(page_id.byte_offset()))?;
        file.write_all(buf)?;
        Ok(())
    }

    fn allocate_page(&self) -> Result<PageId, StorageError> {
        let mut file = self.file.lock();

        let page_num = self.page_count.load(Ordering::Acquire);
        let page_id = PageId::new(page_num);

        // Extend the file with a zeroed page.
        file.seek(SeekFrom::Start(page_id.byte_offset()))?;
        file.write_all(&[0u8; PAGE_SIZE])?;

        self.page_count.store(page_num + 1, Ordering::Release);
        Ok(page_id)
    }

    fn page_count(&self) -> usize {
        self.page_count.load(Ordering::Acquire) as usize
    }

    fn sync_all(&self) -> Result<(), StorageError> {
        let file = self.file.lock();
        file.sync_all()?;
        Ok(())
    }
}
