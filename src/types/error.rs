use std::path::PathBuf;

use thiserror::Error;

use crate::types::PageNo;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File '{}' not found", path.display())]
    NotFound { path: PathBuf },

    #[error("File '{}' already exists", path.display())]
    AlreadyExists { path: PathBuf },

    #[error("Corrupt page: page_no={page_no}, reason={reason}")]
    CorruptPage { page_no: PageNo, reason: String },

    #[error("Page is full (page_no: {page_no})")]
    PageFull { page_no: PageNo },

    #[error("Column index {index} out of range (column count: {count})")]
    ColumnIndexOutOfRange { index: usize, count: usize },

    #[error("Value too large: {size} bytes (max: {max})")]
    ValueTooLarge { size: usize, max: usize },

    #[error("Value {value} is out of range for {data_type}")]
    ValueOutOfRange { value: String, data_type: String },

    #[error("Invalid value: {reason}")]
    InvalidValue { reason: String },

    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    #[error("Cursor has no current row")]
    NoCurrentRow,

    #[error("Rowid space exhausted")]
    RowIdExhausted,

    #[error("Invalid name '{name}'")]
    InvalidName { name: String },

    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },
}

impl StorageError {
    pub(crate) fn corrupt(page_no: PageNo, reason: impl Into<String>) -> Self {
        StorageError::CorruptPage {
            page_no,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, StorageError>;
