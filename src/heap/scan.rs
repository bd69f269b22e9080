//! Filtered sequential scans over a heap file.
//!
//! A scan walks the data page chain in order, yielding record ids in
//! (chain order, slot order). At most one data page is pinned at a time;
//! hopping to the next page releases the previous pin first. The cursor
//! survives deletion of the record it sits on, and can be snapshotted
//! with [`mark`](HeapFileScan::mark) and restored with
//! [`reset`](HeapFileScan::reset).

use super::error::HeapError;
use super::file::HeapFile;
use super::filter::ScanFilter;
use super::page::RecordId;
use crate::storage::{Replacer, Storage};

/// Cursor state of a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    /// The scan has not yielded anything yet.
    Fresh,
    /// The cursor sits on a record id (possibly deleted since).
    Positioned(RecordId),
    /// The scan ran past the last record of the last page.
    Exhausted,
}

/// A resumable scan over a heap file, optionally filtered.
///
/// Borrows the [`HeapFile`] handle mutably and drives its current-page
/// slot. With no filter every record matches; with one, only records
/// whose extracted field satisfies the predicate are yielded.
pub struct HeapFileScan<'f, 'p, S: Storage, R: Replacer> {
    file: &'f mut HeapFile<'p, S, R>,
    filter: Option<ScanFilter>,
    state: ScanState,
    marked: ScanState,
}

impl<'f, 'p, S: Storage, R: Replacer> HeapFileScan<'f, 'p, S, R> {
    /// Starts a scan over `file`. A `None` filter matches every record.
    pub fn new(file: &'f mut HeapFile<'p, S, R>, filter: Option<ScanFilter>) -> Self {
        Self {
            file,
            filter,
            state: ScanState::Fresh,
            marked: ScanState::Fresh,
        }
    }

    /// Advances to the next matching record and returns its id.
    ///
    /// Returns `Ok(None)` once the scan has passed the last record of the
    /// last page; further calls keep returning `Ok(None)`.
    pub fn next(&mut self) -> Result<Option<RecordId>, HeapError> {
        let mut candidate = match self.state {
            ScanState::Exhausted => return Ok(None),
            ScanState::Fresh => {
                let first = match self.file.header.first_page() {
                    Some(page_id) => page_id,
                    None => {
                        self.state = ScanState::Exhausted;
                        return Ok(None);
                    }
                };
                let cur = self.file.pin_page(first)?;
                cur.page.first_slot().map(|slot| RecordId::new(first, slot))
            }
            ScanState::Positioned(rid) => {
                let cur = self.file.pin_page(rid.page_id)?;
                cur.page
                    .next_slot(rid.slot_id)
                    .map(|slot| RecordId::new(rid.page_id, slot))
            }
        };

        loop {
            let rid = match candidate {
                Some(rid) => rid,
                None => match self.next_page_first_slot()? {
                    Some(rid) => rid,
                    None => {
                        self.state = ScanState::Exhausted;
                        self.file.release_current();
                        return Ok(None);
                    }
                },
            };
            self.state = ScanState::Positioned(rid);

            let matched = {
                let cur = self.file.cur.as_ref().expect("scan page pinned");
                match cur.page.read(rid.slot_id) {
                    Some(record) => self.filter.as_ref().map_or(true, |f| f.matches(record)),
                    None => false,
                }
            };
            if matched {
                return Ok(Some(rid));
            }

            candidate = {
                let cur = self.file.cur.as_ref().expect("scan page pinned");
                cur.page
                    .next_slot(rid.slot_id)
                    .map(|slot| RecordId::new(rid.page_id, slot))
            };
        }
    }

    /// Follows next-links from the current page until a page with records
    /// is found; returns its first slot. `Ok(None)` at the end of the
    /// chain. Pages emptied by deletion stay in the chain and are skipped
    /// here.
    fn next_page_first_slot(&mut self) -> Result<Option<RecordId>, HeapError> {
        loop {
            let next = match &self.file.cur {
                Some(cur) => cur.page.next_page(),
                None => None,
            };
            let next_id = match next {
                Some(page_id) => page_id,
                None => return Ok(None),
            };
            let cur = self.file.pin_page(next_id)?;
            if let Some(slot) = cur.page.first_slot() {
                return Ok(Some(RecordId::new(next_id, slot)));
            }
        }
    }

    /// Returns the record id the cursor sits on, if any.
    pub fn position(&self) -> Option<RecordId> {
        match self.state {
            ScanState::Positioned(rid) => Some(rid),
            _ => None,
        }
    }

    /// Snapshots the cursor so [`reset`](Self::reset) can restore it.
    pub fn mark(&mut self) {
        self.marked = self.state;
    }

    /// Restores the cursor to the last [`mark`](Self::mark) (the start of
    /// the scan if none was taken).
    ///
    /// If the marked record's page is not the current page, the current
    /// page is unpinned and the marked page pinned fresh (clean); if it is,
    /// only the cursor moves and no repin happens.
    pub fn reset(&mut self) -> Result<(), HeapError> {
        self.state = self.marked;
        if let ScanState::Positioned(rid) = self.state {
            self.file.pin_page(rid.page_id)?;
        }
        Ok(())
    }

    /// Reads the record at the cursor. The page stays pinned.
    ///
    /// # Errors
    ///
    /// Returns `HeapError::NoCurrentRecord` if the scan is not positioned
    /// on a record, and `HeapError::RecordNotFound` if the record was
    /// deleted out from under the cursor.
    pub fn record(&self) -> Result<&[u8], HeapError> {
        let rid = match self.state {
            ScanState::Positioned(rid) => rid,
            _ => return Err(HeapError::NoCurrentRecord),
        };
        let cur = match &self.file.cur {
            Some(cur) if cur.page_id == rid.page_id => cur,
            _ => return Err(HeapError::NoCurrentRecord),
        };
        cur.page.read(rid.slot_id).ok_or(HeapError::RecordNotFound(rid))
    }

    /// Deletes the record at the cursor.
    ///
    /// Marks the page dirty and decrements the header's record count. The
    /// cursor stays on the deleted id; the next [`next`](Self::next)
    /// resumes from it.
    pub fn delete_record(&mut self) -> Result<(), HeapError> {
        let rid = match self.state {
            ScanState::Positioned(rid) => rid,
            _ => return Err(HeapError::NoCurrentRecord),
        };
        let cur = self.file.pin_page(rid.page_id)?;
        cur.page.delete(rid.slot_id)?;

        let rec_cnt = self.file.header.rec_cnt();
        self.file.header.set_rec_cnt(rec_cnt.saturating_sub(1));
        Ok(())
    }

    /// Overwrites the record at the cursor in place.
    ///
    /// The new bytes may differ in length as long as the page can hold
    /// them; the record keeps its id.
    pub fn update_record(&mut self, data: &[u8]) -> Result<(), HeapError> {
        let rid = match self.state {
            ScanState::Positioned(rid) => rid,
            _ => return Err(HeapError::NoCurrentRecord),
        };
        let cur = self.file.pin_page(rid.page_id)?;
        cur.page.update(rid.slot_id, data)
    }

    /// Marks the current page dirty without going through an accessor.
    ///
    /// Mutations made through [`update_record`](Self::update_record) or
    /// [`delete_record`](Self::delete_record) dirty the page on their own;
    /// this is for callers that mutated record bytes some other way.
    pub fn mark_dirty(&mut self) {
        if let Some(cur) = self.file.cur.as_mut() {
            cur.page.inner_mut().mark_dirty();
        }
    }

    /// Releases the current page. Idempotent; the scan can keep going and
    /// will repin from its cursor.
    pub fn end(&mut self) {
        self.file.release_current();
    }
}

impl<S: Storage, R: Replacer> Drop for HeapFileScan<'_, '_, S, R> {
    fn drop(&mut self) {
        self.file.release_current();
    }
}
