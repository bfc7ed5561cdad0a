use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use log::debug;

use crate::{
    storage::{
        config::StorageConfig, header::FileHeader, index_file::IndexFile, paged_file::PagedFile,
        table_file::TableFile,
    },
    types::{
        METADATA_PAGE_NO,
        error::{Result, StorageError},
        page::PageType,
        value::DataType,
    },
};

// The root of a freshly created file directly follows the metadata page
const INITIAL_ROOT_PAGE: u32 = METADATA_PAGE_NO + 1;

/// Entry point of the engine: maps table and index names to files in the
/// data directory and opens them with the configured page size.
pub struct StorageContext {
    config: StorageConfig,
}

impl StorageContext {
    pub fn new(config: StorageConfig) -> Result<Self> {
        config.validate()?;
        fs::create_dir_all(&config.data_dir)?;
        debug!(
            "Storage context at {} ({} byte pages)",
            config.data_dir.display(),
            config.page_size
        );
        Ok(Self { config })
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    fn check_name(name: &str) -> Result<()> {
        if name.is_empty() || name.contains(['/', '\\', '.']) {
            return Err(StorageError::InvalidName {
                name: name.to_string(),
            });
        }
        Ok(())
    }

    /// `{data_dir}/{table}.{table_extension}`
    pub fn table_path(&self, table: &str) -> Result<PathBuf> {
        Self::check_name(table)?;
        Ok(self
            .config
            .data_dir
            .join(format!("{}.{}", table, self.config.table_extension)))
    }

    /// `{data_dir}/{table}.{column}.{index_extension}`
    pub fn index_path(&self, table: &str, column: &str) -> Result<PathBuf> {
        Self::check_name(table)?;
        Self::check_name(column)?;
        Ok(self
            .config
            .data_dir
            .join(format!("{}.{}.{}", table, column, self.config.index_extension)))
    }

    /// Create an empty table: a metadata page followed by an empty root leaf.
    pub fn create_table_file(&self, table: &str) -> Result<TableFile> {
        let path = self.table_path(table)?;
        let file = PagedFile::create(
            &path,
            self.config.page_size,
            PageType::LeafTable,
            FileHeader::new_table(INITIAL_ROOT_PAGE, self.config.page_size),
            self.config.page_cache_capacity,
        )?;
        debug!("Created table '{}'", table);
        Ok(TableFile::new(table, file, self.config.max_cells_per_page))
    }

    pub fn open_table_file(&self, table: &str) -> Result<TableFile> {
        let path = self.table_path(table)?;
        let file = PagedFile::open(&path, self.config.page_size, self.config.page_cache_capacity)?;
        Ok(TableFile::new(table, file, self.config.max_cells_per_page))
    }

    pub fn delete_table_file(&self, table: &str) -> Result<()> {
        remove_file(&self.table_path(table)?)?;
        debug!("Deleted table '{}'", table);
        Ok(())
    }

    pub fn table_file_exists(&self, table: &str) -> Result<bool> {
        Ok(self.table_path(table)?.is_file())
    }

    /// Names of all tables in the data directory, sorted.
    pub fn list_table_files(&self) -> Result<Vec<String>> {
        let mut tables = Vec::new();
        for entry in fs::read_dir(&self.config.data_dir)? {
            let path = entry?.path();
            if !path.is_file()
                || path.extension().and_then(|e| e.to_str()) != Some(self.config.table_extension.as_str())
            {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                if Self::check_name(stem).is_ok() {
                    tables.push(stem.to_string());
                }
            }
        }
        tables.sort();
        Ok(tables)
    }

    /// Create an empty index on `table.column` keyed by `key_type`.
    pub fn create_index_file(&self, table: &str, column: &str, key_type: DataType) -> Result<IndexFile> {
        if key_type == DataType::Null {
            return Err(StorageError::InvalidValue {
                reason: "an index key type cannot be NULL".to_string(),
            });
        }
        let path = self.index_path(table, column)?;
        let file = PagedFile::create(
            &path,
            self.config.page_size,
            PageType::LeafIndex,
            FileHeader::new_index(INITIAL_ROOT_PAGE, self.config.page_size, key_type.as_u8()),
            self.config.page_cache_capacity,
        )?;
        debug!("Created index '{}.{}' on {}", table, column, key_type);
        IndexFile::new(table, column, file, self.config.max_cells_per_page)
    }

    pub fn open_index_file(&self, table: &str, column: &str) -> Result<IndexFile> {
        let path = self.index_path(table, column)?;
        let file = PagedFile::open(&path, self.config.page_size, self.config.page_cache_capacity)?;
        IndexFile::new(table, column, file, self.config.max_cells_per_page)
    }

    pub fn delete_index_file(&self, table: &str, column: &str) -> Result<()> {
        remove_file(&self.index_path(table, column)?)?;
        debug!("Deleted index '{}.{}'", table, column);
        Ok(())
    }

    pub fn index_file_exists(&self, table: &str, column: &str) -> Result<bool> {
        Ok(self.index_path(table, column)?.is_file())
    }
}

fn remove_file(path: &Path) -> Result<()> {
    fs::remove_file(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => StorageError::NotFound {
            path: path.to_path_buf(),
        },
        _ => StorageError::Io(e),
    })
}
