//! Heap files: unordered collections of variable-length records.
//!
//! A heap file stores opaque byte records in a forward-linked chain of
//! slotted pages, rooted in a header page that tracks the chain endpoints
//! and counters. The module provides:
//!
//! - [`HeapPage`]: page-level record storage using a slotted page layout
//! - [`HeaderPage`]: the file header page (page 0) with chain endpoints
//!   and record/page counters
//! - [`HeapFile`]: an open handle keeping the header pinned and caching
//!   one current data page
//! - [`HeapFileScan`]: a resumable, optionally filtered sequential scan
//! - [`InsertFileScan`]: the append path, growing the chain on demand
//! - [`create_heap_file`] / [`destroy_heap_file`]: file lifecycle

mod error;
mod file;
mod filter;
mod header;
mod insert;
mod page;
mod scan;

pub use error::HeapError;
pub use file::{create_heap_file, destroy_heap_file, HeapFile, HEADER_PAGE_ID};
pub use filter::{AttrType, AttrValue, CompOp, ScanFilter};
pub use header::{FileHeader, HeaderPage, MAX_NAME_SIZE};
pub use insert::InsertFileScan;
pub use page::{
    HeapPage, PageType, RecordId, SlotId, MAX_RECORD_SIZE, PAGE_HEADER_SIZE, SLOT_SIZE,
};
pub use scan::HeapFileScan;
