pub mod entry;
pub mod error;
pub mod page;
pub mod row;
pub mod value;

// Common type aliases
pub type PageNo = u32;
pub type RowId = i32;

// Page geometry
pub const DEFAULT_PAGE_SIZE: usize = 512;
pub const MIN_PAGE_SIZE: usize = 512;
pub const MAX_PAGE_SIZE: usize = 32768;
pub const PAGE_HEADER_SIZE: usize = 0x10; // fixed header before the cell pointer array
pub const CELL_POINTER_SIZE: usize = 2;

// Page 1 of every file is the metadata page
pub const METADATA_PAGE_NO: PageNo = 1;

// On-disk sentinel for "no page" (parent of a root, right sibling of the last leaf)
pub const NO_PAGE: u32 = u32::MAX;

// Rowids are zero-based and strictly increasing; -1 means "no rows yet"
pub const ROWID_NULL_VALUE: RowId = -1;
pub const MAX_ROWID: RowId = i32::MAX - 1;

// TEXT values are stored with a one-byte length of at most 127
pub const MAX_TEXT_LENGTH: usize = 127;
