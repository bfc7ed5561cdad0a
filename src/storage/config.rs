use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::types::{
    DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, MIN_PAGE_SIZE,
    error::{Result, StorageError},
};

/// Where and how table and index files are laid out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    pub table_extension: String,
    pub index_extension: String,
    pub page_size: usize,
    /// Upper bound on cells per page on top of the byte limit.
    pub max_cells_per_page: Option<usize>,
    pub page_cache_capacity: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            table_extension: "tbl".to_string(),
            index_extension: "ndx".to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            max_cells_per_page: None,
            page_cache_capacity: 64,
        }
    }
}

impl StorageConfig {
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_max_cells_per_page(mut self, max_cells: usize) -> Self {
        self.max_cells_per_page = Some(max_cells);
        self
    }

    pub fn with_extensions(mut self, table_extension: &str, index_extension: &str) -> Self {
        self.table_extension = table_extension.to_string();
        self.index_extension = index_extension.to_string();
        self
    }

    pub fn with_page_cache_capacity(mut self, capacity: usize) -> Self {
        self.page_cache_capacity = capacity;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !self.page_size.is_power_of_two()
            || !(MIN_PAGE_SIZE..=MAX_PAGE_SIZE).contains(&self.page_size)
        {
            return Err(StorageError::InvalidConfig {
                reason: format!(
                    "page size {} must be a power of two in [{}, {}]",
                    self.page_size, MIN_PAGE_SIZE, MAX_PAGE_SIZE
                ),
            });
        }
        if let Some(max_cells) = self.max_cells_per_page {
            if max_cells < 2 {
                return Err(StorageError::InvalidConfig {
                    reason: format!("max_cells_per_page must be at least 2, got {}", max_cells),
                });
            }
        }
        for extension in [&self.table_extension, &self.index_extension] {
            if extension.is_empty() || extension.contains('.') || extension.contains('/') {
                return Err(StorageError::InvalidConfig {
                    reason: format!("invalid file extension '{}'", extension),
                });
            }
        }
        if self.table_extension == self.index_extension {
            return Err(StorageError::InvalidConfig {
                reason: "table and index extensions must differ".to_string(),
            });
        }
        Ok(())
    }
}
