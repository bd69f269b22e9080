//! Database façade: a directory of named heap files.

use std::path::{Path, PathBuf};

use crate::heap::{self, HeapError, MAX_NAME_SIZE};
use crate::storage::{BufferPool, FileStorage, LruReplacer};

/// Default number of buffer pool frames per open heap file.
pub const DEFAULT_POOL_SIZE: usize = 64;

/// A directory of named heap files.
///
/// The façade maps relation names to files inside one directory and hands
/// out a buffer pool per opened file; callers construct
/// [`HeapFile`](crate::heap::HeapFile) handles that borrow the pool:
///
/// ```no_run
/// use heapstore::db::Database;
/// use heapstore::heap::{HeapFile, InsertFileScan};
///
/// # fn main() -> Result<(), heapstore::heap::HeapError> {
/// let db = Database::open("data")?;
/// db.create_heap_file("accounts")?;
///
/// let pool = db.open_heap_file("accounts")?;
/// let mut file = HeapFile::open(&pool)?;
/// let _rid = InsertFileScan::new(&mut file).insert(b"hello")?;
/// # Ok(())
/// # }
/// ```
///
/// No registry of open files is kept: destroying a heap file while a pool
/// for it is live is the caller's mistake, as is opening two handles on
/// the same file.
pub struct Database {
    dir: PathBuf,
    pool_size: usize,
}

impl Database {
    /// Opens a database directory, creating it if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, HeapError> {
        Self::with_pool_size(dir, DEFAULT_POOL_SIZE)
    }

    /// Opens a database directory with a custom per-file pool size.
    pub fn with_pool_size(dir: impl Into<PathBuf>, pool_size: usize) -> Result<Self, HeapError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir, pool_size })
    }

    /// Returns the database directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Creates a new, empty heap file named `name`.
    ///
    /// # Errors
    ///
    /// Returns `HeapError::FileExists` if the name is taken and
    /// `HeapError::BadFileName` if the name is empty, longer than
    /// [`MAX_NAME_SIZE`], or contains a path separator.
    pub fn create_heap_file(&self, name: &str) -> Result<(), HeapError> {
        let path = self.path_of(name)?;
        heap::create_heap_file(path, name)
    }

    /// Removes the heap file named `name`.
    ///
    /// # Errors
    ///
    /// Returns `HeapError::FileNotFound` if no such file exists.
    pub fn destroy_heap_file(&self, name: &str) -> Result<(), HeapError> {
        let path = self.path_of(name)?;
        if !path.exists() {
            return Err(HeapError::FileNotFound(name.to_string()));
        }
        heap::destroy_heap_file(path)
    }

    /// Whether a heap file named `name` exists.
    pub fn heap_file_exists(&self, name: &str) -> bool {
        self.path_of(name).map(|p| p.exists()).unwrap_or(false)
    }

    /// Opens the heap file named `name`, returning its buffer pool.
    ///
    /// # Errors
    ///
    /// Returns `HeapError::FileNotFound` if no such file exists.
    pub fn open_heap_file(&self, name: &str) -> Result<BufferPool<FileStorage>, HeapError> {
        let path = self.path_of(name)?;
        if !path.exists() {
            return Err(HeapError::FileNotFound(name.to_string()));
        }
        let storage = FileStorage::open(path)?;
        let replacer = LruReplacer::with_capacity(self.pool_size);
        Ok(BufferPool::new(storage, replacer, self.pool_size))
    }

    fn path_of(&self, name: &str) -> Result<PathBuf, HeapError> {
        if name.is_empty()
            || name.len() > MAX_NAME_SIZE
            || name.contains('/')
            || name.contains('\\')
            || name == "."
            || name == ".."
        {
            return Err(HeapError::BadFileName(name.to_string()));
        }
        Ok(self.dir.join(name))
    }
}
