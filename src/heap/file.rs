//! Heap file lifecycle and the open-file handle.

use std::path::Path;

use log::debug;

use super::error::HeapError;
use super::header::HeaderPage;
use super::page::{HeapPage, RecordId};
use crate::storage::{
    BufferPool, FileStorage, LruReplacer, PageId, PageWriteGuard, Replacer, Storage,
};

/// Page number of the file header page in every heap file.
pub const HEADER_PAGE_ID: PageId = PageId::new(0);

/// Frames used by the short-lived pool inside [`create_heap_file`].
const CREATE_POOL_FRAMES: usize = 4;

/// Creates a new heap file at `path`.
///
/// Lays out the header page (page 0) carrying `name` and zeroed counters,
/// allocates the first data page with an empty chain link, points the
/// header's chain endpoints at it, flushes everything, and closes the
/// file. A freshly created heap file therefore always has exactly one
/// (empty) data page.
///
/// # Errors
///
/// Returns `HeapError::FileExists` if `path` already exists. Storage and
/// buffer errors propagate; guard scoping guarantees no page stays pinned
/// on any failure path.
pub fn create_heap_file(path: impl AsRef<Path>, name: &str) -> Result<(), HeapError> {
    let path = path.as_ref();
    if path.exists() {
        return Err(HeapError::FileExists(name.to_string()));
    }

    let storage = FileStorage::create(path)?;
    let pool = BufferPool::new(storage, LruReplacer::new(), CREATE_POOL_FRAMES);
    {
        let hdr_guard = pool.new_page()?;
        debug_assert_eq!(hdr_guard.page_id(), HEADER_PAGE_ID);

        let data_guard = pool.new_page()?;
        let data_page_id = data_guard.page_id();

        let mut data_page = HeapPage::new(data_guard);
        data_page.init();

        let mut header = HeaderPage::new(hdr_guard);
        header.init(name);
        header.set_first_page(Some(data_page_id));
        header.set_last_page(Some(data_page_id));
        header.set_page_cnt(1);
    }
    pool.flush_all()?;

    debug!("created heap file {:?} as {}", name, path.display());
    Ok(())
}

/// Removes the heap file at `path`.
///
/// The caller is responsible for not destroying a file that is currently
/// open; this layer keeps no registry of open handles.
///
/// # Errors
///
/// Returns `HeapError::FileNotFound` if `path` does not exist.
pub fn destroy_heap_file(path: impl AsRef<Path>) -> Result<(), HeapError> {
    let path = path.as_ref();
    std::fs::remove_file(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => HeapError::FileNotFound(path.display().to_string()),
        _ => HeapError::Io(e),
    })
}

/// A data page pinned as the handle's current page.
pub(super) struct PinnedPage<'p, S: Storage, R: Replacer> {
    pub(super) page_id: PageId,
    pub(super) page: HeapPage<PageWriteGuard<'p, S, R>>,
}

/// An open heap file handle.
///
/// The handle pins the header page for its whole lifetime and keeps at
/// most one data page pinned as the "current" page, switching it on
/// demand. Scans and inserts drive the same current-page slot, so a
/// handle never pins more than the header plus one data page between
/// calls (the append path briefly pins a second data page while growing
/// the chain, so the pool needs at least three frames).
///
/// Dropping the handle releases both pins. There is no failure to report
/// on teardown: unpinning is guard scoping, not an operation.
pub struct HeapFile<'p, S: Storage, R: Replacer> {
    pub(super) pool: &'p BufferPool<S, R>,
    pub(super) header: HeaderPage<PageWriteGuard<'p, S, R>>,
    pub(super) cur: Option<PinnedPage<'p, S, R>>,
}

impl<'p, S: Storage, R: Replacer> HeapFile<'p, S, R> {
    /// Opens the heap file behind `pool`.
    ///
    /// Pins and validates the header page, then pins the first data page
    /// as the initial current page.
    ///
    /// # Errors
    ///
    /// Returns `HeapError::Corrupted` if page 0 is not a valid heap file
    /// header or the chain endpoints are unset. If pinning the first data
    /// page fails, the header pin is released before returning.
    pub fn open(pool: &'p BufferPool<S, R>) -> Result<Self, HeapError> {
        let hdr_guard = pool.fetch_page_mut(HEADER_PAGE_ID)?;
        let header = HeaderPage::new(hdr_guard);
        let parsed = header.header().map_err(HeapError::Corrupted)?;

        let first = parsed
            .first_page
            .ok_or_else(|| HeapError::Corrupted("header has no first page".to_string()))?;
        if first == HEADER_PAGE_ID {
            return Err(HeapError::Corrupted(
                "data page chain references the header page".to_string(),
            ));
        }
        if parsed.last_page.is_none() {
            return Err(HeapError::Corrupted("header has no last page".to_string()));
        }

        let cur_guard = pool.fetch_page_mut(first)?;
        Ok(Self {
            pool,
            header,
            cur: Some(PinnedPage {
                page_id: first,
                page: HeapPage::new(cur_guard),
            }),
        })
    }

    /// Number of live records in the file.
    pub fn rec_cnt(&self) -> u64 {
        self.header.rec_cnt()
    }

    /// Number of data pages in the file's chain.
    pub fn page_cnt(&self) -> u64 {
        self.header.page_cnt()
    }

    /// The file name recorded in the header at creation.
    pub fn file_name(&self) -> String {
        self.header.file_name()
    }

    /// Reads the record at `rid`.
    ///
    /// If `rid` is on a different page than the current one, the current
    /// page is unpinned (its dirty flag travels with the guard) and the
    /// target page is pinned in its place. The returned slice borrows the
    /// pinned page.
    ///
    /// # Errors
    ///
    /// Returns `HeapError::RecordNotFound` if the slot is deleted or out
    /// of range; pin errors propagate.
    pub fn record(&mut self, rid: RecordId) -> Result<&[u8], HeapError> {
        let cur = self.pin_page(rid.page_id)?;
        cur.page.read(rid.slot_id).ok_or(HeapError::RecordNotFound(rid))
    }

    /// Makes `page_id` the current page, keeping the existing pin when it
    /// already is. Swapping drops the old guard first, so its dirty flag
    /// reaches the pool before the new page is pinned.
    pub(super) fn pin_page(
        &mut self,
        page_id: PageId,
    ) -> Result<&mut PinnedPage<'p, S, R>, HeapError> {
        // The handle already holds the header's write guard; refetching it
        // as a data page would self-deadlock on the frame lock.
        if page_id == HEADER_PAGE_ID {
            return Err(HeapError::Corrupted(
                "data page chain references the header page".to_string(),
            ));
        }
        let needs_pin = match &self.cur {
            Some(cur) => cur.page_id != page_id,
            None => true,
        };
        if needs_pin {
            self.cur = None;
            let guard = self.pool.fetch_page_mut(page_id)?;
            self.cur = Some(PinnedPage {
                page_id,
                page: HeapPage::new(guard),
            });
        }
        Ok(self.cur.as_mut().expect("current page just pinned"))
    }

    /// Releases the current data page, if any.
    pub(super) fn release_current(&mut self) {
        self.cur = None;
    }
}
