//! Single-file paged storage engine for a small relational store.
//!
//! Every table lives in its own file of fixed-size pages. Page 1 is a
//! metadata page, and the remaining pages form a rowid-keyed B+-tree of
//! table pages. Secondary indexes live in separate files whose pages form a
//! value-keyed B+-tree.

pub mod storage;
pub mod types;
pub mod utils;

pub use storage::{
    config::StorageConfig,
    cursor::{TableCursor, WriteOutcome},
    index_file::IndexFile,
    storage_context::StorageContext,
    table_file::TableFile,
};
pub use types::{
    error::{Result, StorageError},
    row::Row,
    value::{DataType, Value},
};
