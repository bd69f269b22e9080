//! Buffer pool manager.

use std::collections::HashMap;

use log::warn;
use parking_lot::Mutex;

use super::error::BufferPoolError;
use super::frame::{Frame, FrameId, FrameMetadata};
use super::guard::{PageReadGuard, PageWriteGuard};
use super::replacer::{LruReplacer, Replacer};
use crate::storage::page::PageId;
use crate::storage::Storage;

/// Buffer pool manager: a fixed set of frames caching pages from one
/// storage backend.
///
/// Pages are faulted in on demand. When no frame is free, the replacement
/// policy picks an unpinned victim; dirty victims are written back before
/// reuse. Pages with outstanding guards (pin count > 0) are never evicted.
///
/// # Architecture
///
/// ```text
/// +-------------------+
/// |    Heap layer     |
/// +-------------------+
///          |  fetch_page / fetch_page_mut / new_page -> guards
///          v
/// +-------------------+
/// |    BufferPool     |
/// +-------------------+
///          |  read_page / write_page / allocate_page
///          v
/// +-------------------+
/// |  Storage (trait)  |
/// +-------------------+
/// ```
///
/// # Locking
///
/// Each frame's bytes sit behind their own `RwLock`, acquired by guards.
/// Page table, frame metadata, free list, and replacer share one mutex,
/// taken briefly by fetch/unpin/flush. The locks are not re-entrant: a
/// caller that already holds a write guard on a page must not fetch that
/// page again, and must not flush while the guard is outstanding. The
/// heap layer's one-current-page discipline satisfies both.
pub struct BufferPool<S: Storage, R: Replacer = LruReplacer> {
    inner: BufferPoolInner<S, R>,
}

/// Internal pool state, shared with guards for the unpin on drop.
pub(super) struct BufferPoolInner<S: Storage, R: Replacer> {
    /// The underlying storage backend.
    storage: S,

    /// Frame array; each frame's bytes have their own lock.
    frames: Vec<Frame>,

    /// Page table, frame metadata, free list, and replacer.
    state: Mutex<BufferPoolState<R>>,

    /// Number of frames in the pool.
    pool_size: usize,
}

struct BufferPoolState<R: Replacer> {
    /// Maps loaded pages to their frames.
    page_table: HashMap<PageId, FrameId>,

    /// Bookkeeping per frame, indexed by FrameId.
    frame_metadata: Vec<FrameMetadata>,

    /// Frames not currently holding any page.
    free_list: Vec<FrameId>,

    /// Eviction policy over unpinned frames.
    replacer: R,
}

impl<S: Storage, R: Replacer> BufferPool<S, R> {
    /// Creates a buffer pool over `storage` with `pool_size` frames.
    ///
    /// # Panics
    ///
    /// Panics if `pool_size` is 0.
    pub fn new(storage: S, replacer: R, pool_size: usize) -> Self {
        assert!(pool_size > 0, "pool_size must be > 0");

        let frames: Vec<_> = (0..pool_size).map(|_| Frame::new()).collect();
        let frame_metadata: Vec<_> = (0..pool_size).map(|_| FrameMetadata::new()).collect();
        let free_list: Vec<_> = (0..pool_size).map(FrameId::new).collect();

        Self {
            inner: BufferPoolInner {
                storage,
                frames,
                state: Mutex::new(BufferPoolState {
                    page_table: HashMap::with_capacity(pool_size),
                    frame_metadata,
                    free_list,
                    replacer,
                }),
                pool_size,
            },
        }
    }

    /// Pins a page for reading.
    ///
    /// Faults the page in from storage if it is not already cached. The
    /// returned guard holds the pin until dropped.
    ///
    /// # Errors
    ///
    /// `BufferPoolError::NoFreeFrames` if every frame is pinned;
    /// `BufferPoolError::Storage` if the page does not exist or I/O fails.
    pub fn fetch_page(&self, page_id: PageId) -> Result<PageReadGuard<'_, S, R>, BufferPoolError> {
        let frame_id = self.inner.get_or_load_frame(page_id)?;
        let data = self.inner.frames[frame_id.as_usize()].data.read();

        Ok(PageReadGuard {
            inner: &self.inner,
            frame_id,
            page_id,
            data,
        })
    }

    /// Pins a page for writing.
    ///
    /// Like [`fetch_page`](Self::fetch_page) but the guard allows mutation.
    /// The page is marked dirty on the first mutable access, not on fetch.
    pub fn fetch_page_mut(
        &self,
        page_id: PageId,
    ) -> Result<PageWriteGuard<'_, S, R>, BufferPoolError> {
        let frame_id = self.inner.get_or_load_frame(page_id)?;
        let data = self.inner.frames[frame_id.as_usize()].data.write();

        Ok(PageWriteGuard {
            inner: &self.inner,
            frame_id,
            page_id,
            data,
            is_dirty: false,
        })
    }

    /// Allocates a new zeroed page in storage and pins it for writing.
    pub fn new_page(&self) -> Result<PageWriteGuard<'_, S, R>, BufferPoolError> {
        let page_id = self.inner.storage.allocate_page()?;
        self.fetch_page_mut(page_id)
    }

    /// Writes a page back to storage if it is cached and dirty.
    ///
    /// Must not be called while a write guard on the page is outstanding.
    pub fn flush_page(&self, page_id: PageId) -> Result<(), BufferPoolError> {
        let frame_id = {
            let state = self.inner.state.lock();
            match state.page_table.get(&page_id) {
                Some(&fid) if state.frame_metadata[fid.as_usize()].is_dirty => Some(fid),
                _ => None,
            }
        };

        if let Some(frame_id) = frame_id {
            self.inner.write_back(frame_id, page_id)?;
        }
        Ok(())
    }

    /// Writes all dirty pages back to storage and syncs it.
    ///
    /// Must not be called while any write guard is outstanding.
    pub fn flush_all(&self) -> Result<(), BufferPoolError> {
        let dirty: Vec<(FrameId, PageId)> = {
            let state = self.inner.state.lock();
            state
                .frame_metadata
                .iter()
                .enumerate()
                .filter(|(_, meta)| meta.is_dirty)
                .filter_map(|(fid, meta)| meta.page_id.map(|pid| (FrameId::new(fid), pid)))
                .collect()
        };

        for (frame_id, page_id) in dirty {
            self.inner.write_back(frame_id, page_id)?;
        }

        self.inner.storage.sync_all()?;
        Ok(())
    }

    /// Returns the number of frames in the pool.
    pub fn pool_size(&self) -> usize {
        self.inner.pool_size
    }

    /// Returns the number of pages currently cached.
    pub fn cached_pages(&self) -> usize {
        self.inner.state.lock().page_table.len()
    }

    /// Returns the number of pages currently pinned by outstanding guards.
    pub fn pinned_pages(&self) -> usize {
        let state = self.inner.state.lock();
        state
            .frame_metadata
            .iter()
            .filter(|meta| meta.pin_count > 0)
            .count()
    }

    /// Returns a reference to the underlying storage.
    pub fn storage(&self) -> &S {
        &self.inner.storage
    }
}

impl<S: Storage, R: Replacer> Drop for BufferPool<S, R> {
    fn drop(&mut self) {
        // Best-effort flush so a dropped pool behaves like a closed file.
        // Guards borrow the pool, so none can be outstanding here.
        if let Err(e) = self.flush_all() {
            warn!("buffer pool teardown flush failed: {}", e);
        }
    }
}

impl<S: Storage, R: Replacer> BufferPoolInner<S, R> {
    /// Returns the frame holding `page_id`, loading it from storage into a
    /// free or evicted frame if necessary. The frame's pin count is
    /// incremented; the caller owes exactly one `unpin`.
    fn get_or_load_frame(&self, page_id: PageId) -> Result<FrameId, BufferPoolError> {
        // Hit: bump the pin count and shield the frame from eviction.
        {
            let mut state = self.state.lock();
            if let Some(&frame_id) = state.page_table.get(&page_id) {
                let meta = &mut state.frame_metadata[frame_id.as_usize()];
                meta.pin_count += 1;
                state.replacer.pin(frame_id);
                return Ok(frame_id);
            }
        }

        // Miss: claim a frame and fault the page in.
        let frame_id = self.take_frame()?;

        let read_result = {
            let mut data = self.frames[frame_id.as_usize()].data.write();
            self.storage.read_page(page_id, data.as_mut_slice())
        };
        if let Err(e) = read_result {
            let mut state = self.state.lock();
            state.free_list.push(frame_id);
            return Err(e.into());
        }

        let mut state = self.state.lock();
        state.page_table.insert(page_id, frame_id);
        state.frame_metadata[frame_id.as_usize()].reset(page_id);
        Ok(frame_id)
    }

    /// Claims an empty frame, evicting an unpinned victim if none is free.
    fn take_frame(&self) -> Result<FrameId, BufferPoolError> {
        let (frame_id, old_page) = {
            let mut state = self.state.lock();
            if let Some(frame_id) = state.free_list.pop() {
                (frame_id, None)
            } else {
                let frame_id = state.replacer.victim().ok_or(BufferPoolError::NoFreeFrames)?;
                let meta = &state.frame_metadata[frame_id.as_usize()];
                let old = meta.page_id.filter(|_| meta.is_dirty);
                (frame_id, old)
            }
        };

        // Victim frames are unpinned, so nothing else holds their lock.
        if let Some(old_page_id) = old_page {
            if let Err(e) = self.write_back(frame_id, old_page_id) {
                // Keep the victim evictable so the pool stays consistent.
                let mut state = self.state.lock();
                state.replacer.unpin(frame_id);
                return Err(e);
            }
        }

        let mut state = self.state.lock();
        if let Some(old_page_id) = state.frame_metadata[frame_id.as_usize()].page_id {
            state.page_table.remove(&old_page_id);
        }
        state.frame_metadata[frame_id.as_usize()].clear();
        Ok(frame_id)
    }

    /// Writes the frame's bytes back to storage and clears its dirty bit.
    fn write_back(&self, frame_id: FrameId, page_id: PageId) -> Result<(), BufferPoolError> {
        let data = self.frames[frame_id.as_usize()].data.read();
        self.storage.write_page(page_id, data.as_slice())?;
        drop(data);

        let mut state = self.state.lock();
        let meta = &mut state.frame_metadata[frame_id.as_usize()];
        if meta.page_id == Some(page_id) {
            meta.is_dirty = false;
        }
        Ok(())
    }

    /// Releases one pin, recording whether the holder dirtied the page.
    /// Called from guard drops.
    pub(super) fn unpin(&self, frame_id: FrameId, is_dirty: bool) {
        let mut state = self.state.lock();
        let meta = &mut state.frame_metadata[frame_id.as_usize()];

        debug_assert!(meta.pin_count > 0, "unpin without a matching pin");
        if meta.pin_count > 0 {
            meta.pin_count -= 1;
            if is_dirty {
                meta.is_dirty = true;
            }
            if meta.pin_count == 0 {
                state.replacer.unpin(frame_id);
            }
        }
    }
}
