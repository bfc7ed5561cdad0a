use std::path::Path;

use log::debug;

use crate::{
    storage::{bplus_tree::TableBTree, cursor::TableCursor, paged_file::PagedFile},
    types::{PageNo, RowId, error::Result, value::Value},
};

/// An open table file. Cursors borrow it mutably, so they cannot outlive it
/// and only one can be active at a time.
pub struct TableFile {
    name: String,
    file: PagedFile,
    max_cells: Option<usize>,
}

impl TableFile {
    pub(crate) fn new(name: &str, file: PagedFile, max_cells: Option<usize>) -> Self {
        Self {
            name: name.to_string(),
            file,
            max_cells,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn cursor(&mut self) -> TableCursor<'_> {
        TableCursor::new(&mut self.file, self.max_cells)
    }

    pub fn tree(&mut self) -> TableBTree<'_> {
        TableBTree::new(&mut self.file, self.max_cells)
    }

    pub fn append_row(&mut self, values: &[Value]) -> Result<RowId> {
        self.tree().append_row(values)
    }

    /// Delete a row by rowid; false when it does not exist.
    pub fn remove_row(&mut self, row_id: RowId) -> Result<bool> {
        self.tree().remove_row(row_id)
    }

    pub fn row_count(&mut self) -> Result<usize> {
        self.tree().row_count()
    }

    pub fn max_row_id(&self) -> RowId {
        self.file.header().max_row_id()
    }

    pub fn page_count(&self) -> PageNo {
        self.file.page_count()
    }

    /// Flush to disk and release the file handle.
    pub fn close(mut self) -> Result<()> {
        self.file.sync()?;
        debug!("Closed table '{}'", self.name);
        Ok(())
    }
}
