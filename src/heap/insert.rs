//! Appending records to a heap file.

use super::error::HeapError;
use super::file::{HeapFile, PinnedPage};
use super::page::{HeapPage, RecordId, MAX_RECORD_SIZE};
use crate::storage::{PageId, Replacer, Storage};

/// The append path of a heap file.
///
/// Borrows the [`HeapFile`] handle mutably and inserts records into the
/// tail page of the chain, allocating and linking a fresh page whenever
/// the tail cannot hold the next record.
pub struct InsertFileScan<'f, 'p, S: Storage, R: Replacer> {
    file: &'f mut HeapFile<'p, S, R>,
}

impl<'f, 'p, S: Storage, R: Replacer> InsertFileScan<'f, 'p, S, R> {
    /// Starts an append pass over `file`.
    pub fn new(file: &'f mut HeapFile<'p, S, R>) -> Self {
        Self { file }
    }

    /// Inserts a record and returns its id.
    ///
    /// The record goes to the chain's tail page. When the tail is full, a
    /// fresh page is allocated, linked behind the old tail, and recorded
    /// as the new `last_page`; a record within the length bound always
    /// fits a fresh page. Header counters are kept truthful on success,
    /// and guard scoping releases every pin on error paths.
    ///
    /// # Errors
    ///
    /// Returns `HeapError::InvalidRecordLength` if the record exceeds
    /// [`MAX_RECORD_SIZE`]; allocation and pin errors propagate.
    pub fn insert(&mut self, record: &[u8]) -> Result<RecordId, HeapError> {
        if record.len() > MAX_RECORD_SIZE {
            return Err(HeapError::InvalidRecordLength {
                length: record.len(),
                max: MAX_RECORD_SIZE,
            });
        }

        let tail = self
            .file
            .header
            .last_page()
            .ok_or_else(|| HeapError::Corrupted("header has no last page".to_string()))?;

        match self.file.pin_page(tail)?.page.insert(record) {
            Ok(slot_id) => {
                let rec_cnt = self.file.header.rec_cnt();
                self.file.header.set_rec_cnt(rec_cnt + 1);
                Ok(RecordId::new(tail, slot_id))
            }
            Err(HeapError::PageFull { .. }) => self.insert_into_fresh_page(tail, record),
            Err(e) => Err(e),
        }
    }

    /// Grows the chain by one page and inserts the record there.
    ///
    /// The old tail stays pinned until the new page is linked behind it,
    /// so the chain is never observable in a half-linked state.
    fn insert_into_fresh_page(
        &mut self,
        old_tail: PageId,
        record: &[u8],
    ) -> Result<RecordId, HeapError> {
        let new_guard = self.file.pool.new_page()?;
        let new_page_id = new_guard.page_id();

        let mut new_page = HeapPage::new(new_guard);
        new_page.init();
        let slot_id = new_page.insert(record)?;

        // Link the old tail forward and move the header's tail pointer.
        self.file.pin_page(old_tail)?.page.set_next_page(Some(new_page_id));
        self.file.header.set_last_page(Some(new_page_id));
        let page_cnt = self.file.header.page_cnt();
        self.file.header.set_page_cnt(page_cnt + 1);
        let rec_cnt = self.file.header.rec_cnt();
        self.file.header.set_rec_cnt(rec_cnt + 1);

        // Adopt the new page as current; the old tail's guard drops here,
        // carrying its dirty flag to the pool.
        self.file.cur = Some(PinnedPage {
            page_id: new_page_id,
            page: new_page,
        });

        Ok(RecordId::new(new_page_id, slot_id))
    }
}
