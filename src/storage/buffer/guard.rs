//! RAII guards for buffer pool page access.
//!
//! A guard is a pin token: while it lives, the page stays in its frame.
//! Dropping the guard is the one and only unpin, and it carries the dirty
//! flag the guard accumulated.

use std::ops::{Deref, DerefMut};

use parking_lot::{RwLockReadGuard, RwLockWriteGuard};

use super::frame::FrameId;
use super::pool::BufferPoolInner;
use super::replacer::Replacer;
use crate::storage::page::{PageData, PageId};
use crate::storage::Storage;

/// Read-only pin on a page.
///
/// Dereferences to the page bytes. Dropping the guard unpins the page
/// clean; a read guard never dirties its frame.
pub struct PageReadGuard<'a, S: Storage, R: Replacer> {
    pub(super) inner: &'a BufferPoolInner<S, R>,
    pub(super) frame_id: FrameId,
    pub(super) page_id: PageId,
    pub(super) data: RwLockReadGuard<'a, PageData>,
}

impl<S: Storage, R: Replacer> PageReadGuard<'_, S, R> {
    /// Returns the id of the pinned page.
    pub fn page_id(&self) -> PageId {
        self.page_id
    }
}

impl<S: Storage, R: Replacer> Deref for PageReadGuard<'_, S, R> {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        self.data.as_slice()
    }
}

impl<S: Storage, R: Replacer> AsRef<[u8]> for PageReadGuard<'_, S, R> {
    fn as_ref(&self) -> &[u8] {
        self.data.as_slice()
    }
}

impl<S: Storage, R: Replacer> Drop for PageReadGuard<'_, S, R> {
    fn drop(&mut self) {
        self.inner.unpin(self.frame_id, false);
    }
}

/// Writable pin on a page.
///
/// Dereferences to the page bytes. Any mutable access marks the guard
/// dirty, so the dirty flag handed back on drop is accurate without the
/// caller having to remember it; [`mark_dirty`](Self::mark_dirty) covers
/// mutations made through interior views.
pub struct PageWriteGuard<'a, S: Storage, R: Replacer> {
    pub(super) inner: &'a BufferPoolInner<S, R>,
    pub(super) frame_id: FrameId,
    pub(super) page_id: PageId,
    pub(super) data: RwLockWriteGuard<'a, PageData>,
    pub(super) is_dirty: bool,
}

impl<S: Storage, R: Replacer> PageWriteGuard<'_, S, R> {
    /// Returns the id of the pinned page.
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    /// Marks the page as modified.
    pub fn mark_dirty(&mut self) {
        self.is_dirty = true;
    }

    /// Whether this guard has marked the page dirty.
    pub fn is_dirty(&self) -> bool {
        self.is_dirty
    }
}

impl<S: Storage, R: Replacer> Deref for PageWriteGuard<'_, S, R> {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        self.data.as_slice()
    }
}

impl<S: Storage, R: Replacer> DerefMut for PageWriteGuard<'_, S, R> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.is_dirty = true;
        self.data.as_mut_slice()
    }
}

impl<S: Storage, R: Replacer> AsRef<[u8]> for PageWriteGuard<'_, S, R> {
    fn as_ref(&self) -> &[u8] {
        self.data.as_slice()
    }
}

impl<S: Storage, R: Replacer> AsMut<[u8]> for PageWriteGuard<'_, S, R> {
    fn as_mut(&mut self) -> &mut [u8] {
        self.is_dirty = true;
        self.data.as_mut_slice()
    }
}

impl<S: Storage, R: Replacer> Drop for PageWriteGuard<'_, S, R> {
    fn drop(&mut self) {
        self.inner.unpin(self.frame_id, self.is_dirty);
    }
}
