//! The heap file header page.
//!
//! Page 0 of every heap file carries the file-level metadata: the endpoints
//! of the data page chain, the live record count, the data page count, and
//! the file's name. An open [`HeapFile`](super::HeapFile) keeps this page
//! pinned for the lifetime of the handle.

use crate::storage::{PageId, PAGE_SIZE};

/// Maximum stored length of a heap file name, in bytes.
pub const MAX_NAME_SIZE: usize = 64;

/// Identifies a heap file header page ("HEAP" in ASCII).
const HEADER_MAGIC: u32 = 0x4845_4150;

/// Current header layout version.
const HEADER_VERSION: u8 = 1;

/// On-disk encoding of an unset page reference.
const NO_PAGE: u64 = u64::MAX;

/// Size of the encoded header in bytes.
const FILE_HEADER_SIZE: usize = 42 + MAX_NAME_SIZE;

/// Decoded file header contents.
///
/// Layout (little-endian):
/// - `magic`: u32 (4 bytes)
/// - `version`: u8 (1 byte), 3 bytes reserved
/// - `first_page`: u64 (8 bytes, head of the data page chain)
/// - `last_page`: u64 (8 bytes, tail of the data page chain)
/// - `rec_cnt`: u64 (8 bytes, live records in the file)
/// - `page_cnt`: u64 (8 bytes, data pages in the chain; the header page
///   itself is not counted)
/// - `name_len`: u16 (2 bytes) + `name`: up to [`MAX_NAME_SIZE`] bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHeader {
    /// Head of the data page chain.
    pub first_page: Option<PageId>,
    /// Tail of the data page chain.
    pub last_page: Option<PageId>,
    /// Live records in the file.
    pub rec_cnt: u64,
    /// Data pages reachable from `first_page`; the header page is not
    /// counted.
    pub page_cnt: u64,
    /// File name, truncated to [`MAX_NAME_SIZE`] bytes when stored.
    pub file_name: String,
}

impl FileHeader {
    /// Creates the header of a freshly created, still empty heap file.
    pub fn new(file_name: &str) -> Self {
        let name = if file_name.len() > MAX_NAME_SIZE {
            let mut end = MAX_NAME_SIZE;
            while !file_name.is_char_boundary(end) {
                end -= 1;
            }
            file_name[..end].to_string()
        } else {
            file_name.to_string()
        };
        Self {
            first_page: None,
            last_page: None,
            rec_cnt: 0,
            page_cnt: 0,
            file_name: name,
        }
    }

    fn read_page_ref(data: &[u8]) -> Option<PageId> {
        let raw = u64::from_le_bytes([
            data[0], data[1], data[2], data[3], data[4], data[5], data[6], data[7],
        ]);
        match raw {
            NO_PAGE => None,
            n => Some(PageId::new(n)),
        }
    }

    /// Decodes a header from the start of a page buffer.
    ///
    /// # Errors
    ///
    /// Returns a description of the mismatch if the magic or version is
    /// wrong.
    pub fn read_from(data: &[u8]) -> Result<Self, String> {
        let magic = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);
        if magic != HEADER_MAGIC {
            return Err(format!("bad header magic {:#010x}", magic));
        }
        if data[4] != HEADER_VERSION {
            return Err(format!("unsupported header version {}", data[4]));
        }

        let name_len = u16::from_le_bytes([data[40], data[41]]) as usize;
        if name_len > MAX_NAME_SIZE {
            return Err(format!("header name length {} out of range", name_len));
        }
        let file_name = String::from_utf8_lossy(&data[42..42 + name_len]).into_owned();

        Ok(Self {
            first_page: Self::read_page_ref(&data[8..16]),
            last_page: Self::read_page_ref(&data[16..24]),
            rec_cnt: u64::from_le_bytes([
                data[24], data[25], data[26], data[27], data[28], data[29], data[30], data[31],
            ]),
            page_cnt: u64::from_le_bytes([
                data[32], data[33], data[34], data[35], data[36], data[37], data[38], data[39],
            ]),
            file_name,
        })
    }

    /// Encodes the header into the start of a page buffer.
    pub fn write_to(&self, data: &mut [u8]) {
        data[0..4].copy_from_slice(&HEADER_MAGIC.to_le_bytes());
        data[4] = HEADER_VERSION;
        // Bytes 5..8 reserved
        let first = self.first_page.map_or(NO_PAGE, |p| p.page_num());
        let last = self.last_page.map_or(NO_PAGE, |p| p.page_num());
        data[8..16].copy_from_slice(&first.to_le_bytes());
        data[16..24].copy_from_slice(&last.to_le_bytes());
        data[24..32].copy_from_slice(&self.rec_cnt.to_le_bytes());
        data[32..40].copy_from_slice(&self.page_cnt.to_le_bytes());

        let name_bytes = self.file_name.as_bytes();
        let name_len = name_bytes.len().min(MAX_NAME_SIZE);
        data[40..42].copy_from_slice(&(name_len as u16).to_le_bytes());
        data[42..42 + name_len].copy_from_slice(&name_bytes[..name_len]);
        data[42 + name_len..FILE_HEADER_SIZE].fill(0);
    }
}

/// A header page view over any page-sized byte buffer, mirroring
/// [`HeapPage`](super::HeapPage)'s view-over-bytes pattern.
pub struct HeaderPage<T> {
    data: T,
}

impl<T: AsRef<[u8]>> HeaderPage<T> {
    /// Creates a header page view over the given buffer.
    ///
    /// # Panics
    ///
    /// Panics if `data.as_ref().len() != PAGE_SIZE`.
    pub fn new(data: T) -> Self {
        assert_eq!(
            data.as_ref().len(),
            PAGE_SIZE,
            "HeaderPage requires exactly {} bytes",
            PAGE_SIZE
        );
        Self { data }
    }

    /// Decodes the full header.
    ///
    /// # Errors
    ///
    /// Returns a description of the mismatch if the buffer does not hold a
    /// valid heap file header.
    pub fn header(&self) -> Result<FileHeader, String> {
        FileHeader::read_from(self.data.as_ref())
    }

    fn header_unchecked(&self) -> FileHeader {
        // Only called after open() has validated the page once.
        FileHeader::read_from(self.data.as_ref()).expect("header validated at open")
    }

    /// Head of the data page chain.
    pub fn first_page(&self) -> Option<PageId> {
        self.header_unchecked().first_page
    }

    /// Tail of the data page chain.
    pub fn last_page(&self) -> Option<PageId> {
        self.header_unchecked().last_page
    }

    /// Live records in the file.
    pub fn rec_cnt(&self) -> u64 {
        self.header_unchecked().rec_cnt
    }

    /// Data pages in the chain (the header page is not counted).
    pub fn page_cnt(&self) -> u64 {
        self.header_unchecked().page_cnt
    }

    /// The file name recorded at creation.
    pub fn file_name(&self) -> String {
        self.header_unchecked().file_name
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> HeaderPage<T> {
    /// Initializes this buffer as the header of a new, empty heap file.
    pub fn init(&mut self, file_name: &str) {
        self.data.as_mut().fill(0);
        FileHeader::new(file_name).write_to(self.data.as_mut());
    }

    fn update(&mut self, f: impl FnOnce(&mut FileHeader)) {
        let mut header = self.header_unchecked();
        f(&mut header);
        header.write_to(self.data.as_mut());
    }

    /// Sets the head of the data page chain.
    pub fn set_first_page(&mut self, page: Option<PageId>) {
        self.update(|h| h.first_page = page);
    }

    /// Sets the tail of the data page chain.
    pub fn set_last_page(&mut self, page: Option<PageId>) {
        self.update(|h| h.last_page = page);
    }

    /// Sets the live record count.
    pub fn set_rec_cnt(&mut self, rec_cnt: u64) {
        self.update(|h| h.rec_cnt = rec_cnt);
    }

    /// Sets the data page count.
    pub fn set_page_cnt(&mut self, page_cnt: u64) {
        self.update(|h| h.page_cnt = page_cnt);
    }
}
