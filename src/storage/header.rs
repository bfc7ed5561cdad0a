use crate::types::{
    METADATA_PAGE_NO, PageNo, ROWID_NULL_VALUE, RowId,
    error::{Result, StorageError},
    page::{PAGE_TYPE_OFFSET, Page, PageType},
};

// Metadata page field offsets
const RESERVED_OFFSET: usize = 0x01;
const ROOT_PAGE_OFFSET: usize = 0x05;
const PAGE_SIZE_OFFSET: usize = 0x09;

/// Contents of page 1 of every table and index file.
///
/// The reserved word holds the current max rowid in a table file and the
/// key data-type code in an index file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHeader {
    pub reserved: i32,
    pub root_page: PageNo,
    pub page_size: usize,
}

impl FileHeader {
    pub fn new_table(root_page: PageNo, page_size: usize) -> Self {
        Self {
            reserved: ROWID_NULL_VALUE,
            root_page,
            page_size,
        }
    }

    pub fn new_index(root_page: PageNo, page_size: usize, key_type_code: u8) -> Self {
        Self {
            reserved: key_type_code as i32,
            root_page,
            page_size,
        }
    }

    pub fn max_row_id(&self) -> RowId {
        self.reserved
    }

    pub fn to_page(&self) -> Page {
        let mut page = Page::new(METADATA_PAGE_NO, self.page_size, PageType::Metadata);
        page.write_i32_at(RESERVED_OFFSET, self.reserved);
        page.write_u32_at(ROOT_PAGE_OFFSET, self.root_page);
        page.write_u16_at(PAGE_SIZE_OFFSET, self.page_size as u16);
        page
    }

    pub fn from_page(page: &Page) -> Result<Self> {
        if page.read_u8_at(PAGE_TYPE_OFFSET) != PageType::Metadata.as_u8() {
            return Err(StorageError::corrupt(
                page.page_no(),
                "page 1 is not a metadata page",
            ));
        }
        let page_size = page.read_u16_at(PAGE_SIZE_OFFSET) as usize;
        if page_size != page.page_size() {
            return Err(StorageError::InvalidConfig {
                reason: format!(
                    "file was written with page size {}, opened with {}",
                    page_size,
                    page.page_size()
                ),
            });
        }
        let root_page = page.read_u32_at(ROOT_PAGE_OFFSET);
        if root_page <= METADATA_PAGE_NO {
            return Err(StorageError::corrupt(
                page.page_no(),
                format!("invalid root page number {}", root_page),
            ));
        }
        Ok(Self {
            reserved: page.read_i32_at(RESERVED_OFFSET),
            root_page,
            page_size,
        })
    }
}
