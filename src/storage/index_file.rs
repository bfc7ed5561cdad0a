use std::path::Path;

use log::debug;

use crate::{
    storage::{
        index_tree::{IndexBTree, IndexEntry},
        paged_file::PagedFile,
    },
    types::{
        PageNo, RowId,
        error::Result,
        value::{DataType, Value},
    },
};

/// An open index file over one column of one table.
pub struct IndexFile {
    table: String,
    column: String,
    key_type: DataType,
    file: PagedFile,
    max_cells: Option<usize>,
}

impl IndexFile {
    pub(crate) fn new(table: &str, column: &str, mut file: PagedFile, max_cells: Option<usize>) -> Result<Self> {
        let key_type = IndexBTree::new(&mut file, max_cells)?.key_type();
        Ok(Self {
            table: table.to_string(),
            column: column.to_string(),
            key_type,
            file,
            max_cells,
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn key_type(&self) -> DataType {
        self.key_type
    }

    pub fn page_count(&self) -> PageNo {
        self.file.page_count()
    }

    pub fn tree(&mut self) -> Result<IndexBTree<'_>> {
        IndexBTree::new(&mut self.file, self.max_cells)
    }

    /// Returns false when `row_id` was already stored under `key`.
    pub fn insert(&mut self, key: &Value, row_id: RowId) -> Result<bool> {
        self.tree()?.insert(key, row_id)
    }

    pub fn remove(&mut self, key: &Value, row_id: RowId) -> Result<bool> {
        self.tree()?.remove(key, row_id)
    }

    pub fn lookup(&mut self, key: &Value) -> Result<Vec<RowId>> {
        self.tree()?.lookup(key)
    }

    pub fn scan(&mut self) -> Result<Vec<IndexEntry>> {
        self.tree()?.scan()
    }

    pub fn close(mut self) -> Result<()> {
        self.file.sync()?;
        debug!("Closed index '{}.{}'", self.table, self.column);
        Ok(())
    }
}
