use crate::types::{
    CELL_POINTER_SIZE, NO_PAGE, PAGE_HEADER_SIZE, PageNo,
    error::{Result, StorageError},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageType {
    InteriorIndex = 0x02,
    InteriorTable = 0x05,
    LeafIndex = 0x0A,
    LeafTable = 0x0D,
    Metadata = 0xFF,
}

impl PageType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x02 => Some(PageType::InteriorIndex),
            0x05 => Some(PageType::InteriorTable),
            0x0A => Some(PageType::LeafIndex),
            0x0D => Some(PageType::LeafTable),
            0xFF => Some(PageType::Metadata),
            _ => None,
        }
    }

    pub fn as_u8(&self) -> u8 {
        *self as u8
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, PageType::LeafTable | PageType::LeafIndex)
    }

    pub fn is_interior(&self) -> bool {
        matches!(self, PageType::InteriorTable | PageType::InteriorIndex)
    }
}

// Header field offsets, relative to the page start
pub const PAGE_TYPE_OFFSET: usize = 0x00;
pub const CELL_COUNT_OFFSET: usize = 0x01;
pub const CONTENT_START_OFFSET: usize = 0x03;
pub const RIGHT_POINTER_OFFSET: usize = 0x06;
pub const PARENT_OFFSET: usize = 0x0A;

/// Byte offset of a 1-based page number within its file.
pub fn page_offset(page_no: PageNo, page_size: usize) -> Result<u64> {
    if page_no == 0 {
        return Err(StorageError::corrupt(0, "page numbers start at 1"));
    }
    Ok((page_no as u64 - 1) * page_size as u64)
}

/*
 * Page Layout on Disk (Slotted Page Structure, big-endian)
 * ┌─────────────────────────────────────────────────────────────────┐
 * │                    PAGE HEADER (16 bytes)                       │
 * │  type(1) | cell_count(2) | content_start(2) | unused(1) |      │
 * │  right_pointer(4) | parent(4) | unused(2)                      │
 * ├─────────────────────────────────────────────────────────────────┤
 * │             CELL POINTER ARRAY (2 bytes per cell)               │
 * ├─────────────────────────────────────────────────────────────────┤
 * │                    FREE SPACE                                   │
 * ├─────────────────────────────────────────────────────────────────┤
 * │                   CELL CONTENT                                  │
 * │  [...cell N...] [...cell 2...] [...cell 1...] [...cell 0...]   │
 * └─────────────────────────────────────────────────────────────────┘
 *
 * The right pointer is the rightmost child on interior pages and the
 * right sibling on leaf pages.
 */

#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    page_no: PageNo,
    data: Vec<u8>,
}

impl Page {
    /// Create an empty page: no cells, no parent, no right pointer.
    pub fn new(page_no: PageNo, page_size: usize, page_type: PageType) -> Self {
        let mut page = Self {
            page_no,
            data: vec![0; page_size],
        };
        page.data[PAGE_TYPE_OFFSET] = page_type.as_u8();
        if page_type != PageType::Metadata {
            page.reset_cells();
            page.set_right_pointer(None);
            page.set_parent(None);
        }
        page
    }

    /// Wrap bytes read from disk, validating the header and pointer array.
    pub fn from_bytes(page_no: PageNo, bytes: Vec<u8>) -> Result<Self> {
        let page = Self {
            page_no,
            data: bytes,
        };
        if page.data.len() < PAGE_HEADER_SIZE {
            return Err(StorageError::corrupt(page_no, "page shorter than its header"));
        }
        let page_type = page.page_type()?;
        if page_type == PageType::Metadata {
            return Ok(page);
        }

        let count = page.cell_count();
        let content_start = page.content_start();
        let pointer_end = PAGE_HEADER_SIZE + count * CELL_POINTER_SIZE;
        if pointer_end > content_start || content_start > page.data.len() {
            return Err(StorageError::corrupt(
                page_no,
                format!(
                    "cell pointer array ends at {} but cell content starts at {}",
                    pointer_end, content_start
                ),
            ));
        }
        for index in 0..count {
            let offset = page.cell_offset(index)?;
            if offset < content_start {
                return Err(StorageError::corrupt(
                    page_no,
                    format!("cell {} at offset {} lies outside cell content", index, offset),
                ));
            }
            page.cell_len_at(offset)?;
        }
        Ok(page)
    }

    pub fn page_no(&self) -> PageNo {
        self.page_no
    }

    pub fn page_size(&self) -> usize {
        self.data.len()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    // Typed accessors at page-relative offsets

    pub fn read_u8_at(&self, offset: usize) -> u8 {
        self.data[offset]
    }

    pub fn read_u16_at(&self, offset: usize) -> u16 {
        u16::from_be_bytes([self.data[offset], self.data[offset + 1]])
    }

    pub fn read_u32_at(&self, offset: usize) -> u32 {
        u32::from_be_bytes([
            self.data[offset],
            self.data[offset + 1],
            self.data[offset + 2],
            self.data[offset + 3],
        ])
    }

    pub fn read_i32_at(&self, offset: usize) -> i32 {
        self.read_u32_at(offset) as i32
    }

    pub fn write_u8_at(&mut self, offset: usize, value: u8) {
        self.data[offset] = value;
    }

    pub fn write_u16_at(&mut self, offset: usize, value: u16) {
        self.data[offset..offset + 2].copy_from_slice(&value.to_be_bytes());
    }

    pub fn write_u32_at(&mut self, offset: usize, value: u32) {
        self.data[offset..offset + 4].copy_from_slice(&value.to_be_bytes());
    }

    pub fn write_i32_at(&mut self, offset: usize, value: i32) {
        self.write_u32_at(offset, value as u32);
    }

    // Header fields

    pub fn page_type(&self) -> Result<PageType> {
        let code = self.data[PAGE_TYPE_OFFSET];
        PageType::from_u8(code).ok_or_else(|| {
            StorageError::corrupt(self.page_no, format!("unknown page type code {:#04x}", code))
        })
    }

    pub fn cell_count(&self) -> usize {
        self.read_u16_at(CELL_COUNT_OFFSET) as usize
    }

    fn set_cell_count(&mut self, count: usize) {
        self.write_u16_at(CELL_COUNT_OFFSET, count as u16);
    }

    /// Offset of the lowest-addressed cell. Equals the page size when empty.
    pub fn content_start(&self) -> usize {
        let raw = self.read_u16_at(CONTENT_START_OFFSET) as usize;
        // 0 would only appear if a 65536-byte page were allowed; treat as end
        if raw == 0 { self.data.len() } else { raw }
    }

    fn set_content_start(&mut self, offset: usize) {
        self.write_u16_at(CONTENT_START_OFFSET, offset as u16);
    }

    /// Rightmost child (interior pages) or right sibling (leaf pages).
    pub fn right_pointer(&self) -> Option<PageNo> {
        page_or_none(self.read_u32_at(RIGHT_POINTER_OFFSET))
    }

    pub fn set_right_pointer(&mut self, page_no: Option<PageNo>) {
        self.write_u32_at(RIGHT_POINTER_OFFSET, page_no.unwrap_or(NO_PAGE));
    }

    pub fn parent(&self) -> Option<PageNo> {
        page_or_none(self.read_u32_at(PARENT_OFFSET))
    }

    pub fn set_parent(&mut self, page_no: Option<PageNo>) {
        self.write_u32_at(PARENT_OFFSET, page_no.unwrap_or(NO_PAGE));
    }

    // Cell pointer array and cell storage

    pub fn cell_offset(&self, index: usize) -> Result<usize> {
        if index >= self.cell_count() {
            return Err(StorageError::corrupt(
                self.page_no,
                format!("cell index {} out of range ({} cells)", index, self.cell_count()),
            ));
        }
        Ok(self.read_u16_at(PAGE_HEADER_SIZE + index * CELL_POINTER_SIZE) as usize)
    }

    fn set_cell_offset(&mut self, index: usize, offset: usize) {
        self.write_u16_at(PAGE_HEADER_SIZE + index * CELL_POINTER_SIZE, offset as u16);
    }

    /// Bytes available between the end of the pointer array and the cell content.
    pub fn free_space(&self) -> usize {
        let pointer_end = PAGE_HEADER_SIZE + self.cell_count() * CELL_POINTER_SIZE;
        self.content_start().saturating_sub(pointer_end)
    }

    /// Bytes a page of this size can hold in cells and pointers when empty.
    pub fn capacity(page_size: usize) -> usize {
        page_size - PAGE_HEADER_SIZE
    }

    pub fn can_fit(&self, cell_len: usize) -> bool {
        self.free_space() >= cell_len + CELL_POINTER_SIZE
    }

    pub fn cell(&self, index: usize) -> Result<&[u8]> {
        let offset = self.cell_offset(index)?;
        let len = self.cell_len_at(offset)?;
        Ok(&self.data[offset..offset + len])
    }

    /// All cells, in pointer-array order.
    pub fn cells(&self) -> Result<Vec<Vec<u8>>> {
        (0..self.cell_count())
            .map(|index| self.cell(index).map(|cell| cell.to_vec()))
            .collect()
    }

    /// Append a cell at the end of the pointer array.
    pub fn insert_cell(&mut self, cell: &[u8]) -> Result<usize> {
        let position = self.cell_count();
        self.insert_cell_at(position, cell)?;
        Ok(position)
    }

    /// Insert a cell so that its pointer lands at `position`, shifting later
    /// pointers one slot right.
    pub fn insert_cell_at(&mut self, position: usize, cell: &[u8]) -> Result<()> {
        let count = self.cell_count();
        if position > count {
            return Err(StorageError::corrupt(
                self.page_no,
                format!("insert position {} beyond {} cells", position, count),
            ));
        }
        if !self.can_fit(cell.len()) {
            return Err(StorageError::PageFull {
                page_no: self.page_no,
            });
        }

        let new_offset = self.content_start() - cell.len();
        self.data[new_offset..new_offset + cell.len()].copy_from_slice(cell);

        let array_start = PAGE_HEADER_SIZE + position * CELL_POINTER_SIZE;
        let array_end = PAGE_HEADER_SIZE + count * CELL_POINTER_SIZE;
        self.data
            .copy_within(array_start..array_end, array_start + CELL_POINTER_SIZE);
        self.set_cell_offset(position, new_offset);

        self.set_cell_count(count + 1);
        self.set_content_start(new_offset);
        Ok(())
    }

    /// Overwrite a cell with bytes of the same length.
    pub fn overwrite_cell(&mut self, index: usize, cell: &[u8]) -> Result<()> {
        let offset = self.cell_offset(index)?;
        let len = self.cell_len_at(offset)?;
        if len != cell.len() {
            return Err(StorageError::corrupt(
                self.page_no,
                format!("overwrite of {}-byte cell with {} bytes", len, cell.len()),
            ));
        }
        self.data[offset..offset + len].copy_from_slice(cell);
        Ok(())
    }

    /// Remove a cell and its pointer, sliding the cells stored below it
    /// upward so the content area stays contiguous.
    pub fn remove_cell(&mut self, index: usize) -> Result<()> {
        let count = self.cell_count();
        let offset = self.cell_offset(index)?;
        let len = self.cell_len_at(offset)?;
        let content_start = self.content_start();

        self.data
            .copy_within(content_start..offset, content_start + len);
        self.data[content_start..content_start + len].fill(0);

        for i in 0..count {
            let other = self.read_u16_at(PAGE_HEADER_SIZE + i * CELL_POINTER_SIZE) as usize;
            if i != index && other < offset {
                self.set_cell_offset(i, other + len);
            }
        }

        let array_start = PAGE_HEADER_SIZE + index * CELL_POINTER_SIZE;
        let array_end = PAGE_HEADER_SIZE + count * CELL_POINTER_SIZE;
        self.data
            .copy_within(array_start + CELL_POINTER_SIZE..array_end, array_start);
        self.data[array_end - CELL_POINTER_SIZE..array_end].fill(0);

        self.set_cell_count(count - 1);
        self.set_content_start(content_start + len);
        Ok(())
    }

    /// Drop every cell, keeping the page type, parent and right pointer.
    pub fn reset_cells(&mut self) {
        let page_size = self.data.len();
        self.data[PAGE_HEADER_SIZE..].fill(0);
        self.set_cell_count(0);
        self.set_content_start(page_size);
    }

    /// Length of the cell stored at `offset`, derived from its own header
    /// bytes according to the page type.
    pub fn cell_len_at(&self, offset: usize) -> Result<usize> {
        let page_size = self.data.len();
        let byte = |at: usize| -> Result<usize> {
            self.data
                .get(at)
                .map(|b| *b as usize)
                .ok_or_else(|| StorageError::corrupt(self.page_no, "cell header past page end"))
        };
        let len = match self.page_type()? {
            PageType::LeafTable => {
                let columns = byte(offset)?;
                let mut payload = 0;
                for i in 0..columns {
                    payload += byte(offset + 1 + i)?;
                }
                1 + columns + 4 + payload
            }
            PageType::InteriorTable => 8,
            PageType::LeafIndex => {
                let row_ids = byte(offset)?;
                let key_len = byte(offset + 1)?;
                2 + key_len + 4 * row_ids
            }
            PageType::InteriorIndex => {
                let row_ids = byte(offset + 4)?;
                let key_len = byte(offset + 5)?;
                6 + key_len + 4 * row_ids
            }
            PageType::Metadata => {
                return Err(StorageError::corrupt(self.page_no, "metadata page holds no cells"));
            }
        };
        if offset + len > page_size {
            return Err(StorageError::corrupt(
                self.page_no,
                format!("cell at {} with length {} exceeds page boundary", offset, len),
            ));
        }
        Ok(len)
    }
}

fn page_or_none(raw: u32) -> Option<PageNo> {
    if raw == NO_PAGE || raw == 0 {
        None
    } else {
        Some(raw)
    }
}
