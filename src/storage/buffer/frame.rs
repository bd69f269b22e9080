//! Frames: the in-memory page slots of the buffer pool.

use parking_lot::RwLock;

use crate::storage::page::{PageData, PageId};

/// Identifier for a frame in the buffer pool.
///
/// Distinct from `PageId`: a `PageId` names a logical page on disk, a
/// `FrameId` names a physical memory slot. FrameIds are only meaningful
/// within one `BufferPool` instance and range from 0 to pool_size - 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameId(usize);

impl FrameId {
    /// Creates a new `FrameId`.
    pub const fn new(id: usize) -> Self {
        Self(id)
    }

    /// Returns the frame id as a `usize`.
    pub const fn as_usize(&self) -> usize {
        self.0
    }
}

/// A buffer pool frame holding one page's bytes.
///
/// The page data sits behind its own `RwLock`: read guards share the frame,
/// a write guard has it exclusively. Bookkeeping about the frame (which
/// page it holds, pin count, dirty bit) lives in [`FrameMetadata`] under
/// the pool's state mutex, not here.
pub(super) struct Frame {
    pub(super) data: RwLock<PageData>,
}

impl Frame {
    pub(super) fn new() -> Self {
        Self {
            data: RwLock::new(PageData::new()),
        }
    }
}

/// Bookkeeping for one frame, kept under the pool's state mutex.
#[derive(Debug)]
pub(super) struct FrameMetadata {
    /// The page currently loaded in this frame, if any.
    pub(super) page_id: Option<PageId>,

    /// Number of outstanding guards on this frame.
    ///
    /// A frame with `pin_count > 0` is never evicted.
    pub(super) pin_count: u32,

    /// Whether the page differs from its on-disk image.
    pub(super) is_dirty: bool,
}

impl FrameMetadata {
    pub(super) fn new() -> Self {
        Self {
            page_id: None,
            pin_count: 0,
            is_dirty: false,
        }
    }

    /// Resets the metadata for a freshly loaded page, initially pinned once.
    pub(super) fn reset(&mut self, page_id: PageId) {
        self.page_id = Some(page_id);
        self.pin_count = 1;
        self.is_dirty = false;
    }

    /// Clears the metadata, returning the frame to the empty state.
    pub(super) fn clear(&mut self) {
        self.page_id = None;
        self.pin_count = 0;
        self.is_dirty = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_reset_pins_once() {
        let mut meta = FrameMetadata::new();
        meta.reset(PageId::new(7));
        assert_eq!(meta.page_id, Some(PageId::new(7)));
        assert_eq!(meta.pin_count, 1);
        assert!(!meta.is_dirty);
    }

    #[test]
    fn test_metadata_clear() {
        let mut meta = FrameMetadata::new();
        meta.reset(PageId::new(7));
        meta.is_dirty = true;
        meta.clear();
        assert_eq!(meta.page_id, None);
        assert_eq!(meta.pin_count, 0);
        assert!(!meta.is_dirty);
    }
}
