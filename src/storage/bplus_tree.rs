use log::{debug, trace, warn};

use crate::{
    storage::{
        btree::{self, Separator},
        paged_file::PagedFile,
    },
    types::{
        CELL_POINTER_SIZE, MAX_ROWID, PageNo, RowId,
        entry::TableInteriorCell,
        error::{Result, StorageError},
        page::{Page, PageType},
        row::LeafCell,
        value::Value,
    },
};

impl Separator for RowId {
    fn encode_cell(&self, child: PageNo) -> Vec<u8> {
        TableInteriorCell::new(child, *self).to_bytes()
    }

    fn decode_cell(bytes: &[u8]) -> Result<(PageNo, Self)> {
        let cell = TableInteriorCell::from_bytes(bytes)?;
        Ok((cell.child, cell.max_row_id))
    }
}

/// A cell location inside a table leaf, remembered together with the rowid
/// found there so it can be re-validated after the tree changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellPosition {
    pub page_no: PageNo,
    pub index: usize,
    pub row_id: RowId,
}

/// Rowid-keyed B+-tree of one table file.
///
/// Rows are only ever appended with a fresh rowid above every existing one,
/// so inserts always land on the rightmost leaf. Interior entries route by
/// the max rowid of the child subtree.
pub struct TableBTree<'a> {
    file: &'a mut PagedFile,
    max_cells: Option<usize>,
}

impl<'a> TableBTree<'a> {
    pub fn new(file: &'a mut PagedFile, max_cells: Option<usize>) -> Self {
        Self { file, max_cells }
    }

    pub fn root_page(&self) -> PageNo {
        self.file.header().root_page
    }

    /// Largest rowid ever handed out, or -1 for a fresh table.
    pub fn max_row_id(&self) -> RowId {
        self.file.header().max_row_id()
    }

    pub fn page(&mut self, page_no: PageNo) -> Result<Page> {
        self.file.read_page(page_no)
    }

    pub fn find_leftmost_leaf(&mut self) -> Result<PageNo> {
        btree::descend::<RowId>(self.file, PageType::LeafTable, PageType::InteriorTable, |node| {
            Ok(node.entries.first().map_or(node.rightmost, |(child, _)| *child))
        })
    }

    pub fn find_rightmost_leaf(&mut self) -> Result<PageNo> {
        let mut leaf_no =
            btree::descend::<RowId>(self.file, PageType::LeafTable, PageType::InteriorTable, |node| {
                Ok(node.rightmost)
            })?;
        let mut hops = 0;
        loop {
            let leaf = self.file.read_page(leaf_no)?;
            match btree::next_leaf(self.file, &leaf) {
                Some(next) if hops < self.file.page_count() => {
                    leaf_no = next;
                    hops += 1;
                }
                Some(next) => {
                    return Err(StorageError::corrupt(next, "leaf sibling chain forms a cycle"));
                }
                None => return Ok(leaf_no),
            }
        }
    }

    /// Leaf whose rowid range covers `row_id`.
    pub fn find_leaf(&mut self, row_id: RowId) -> Result<PageNo> {
        btree::descend::<RowId>(self.file, PageType::LeafTable, PageType::InteriorTable, |node| {
            Ok(node
                .entries
                .iter()
                .find(|(_, max_row_id)| row_id <= *max_row_id)
                .map_or(node.rightmost, |(child, _)| *child))
        })
    }

    /// Leaf page numbers in scan order.
    pub fn leaf_pages(&mut self) -> Result<Vec<PageNo>> {
        let leftmost = self.find_leftmost_leaf()?;
        btree::leaf_chain(self.file, leftmost)
    }

    pub fn row_count(&mut self) -> Result<usize> {
        let mut count = 0;
        for page_no in self.leaf_pages()? {
            count += self.file.read_page(page_no)?.cell_count();
        }
        Ok(count)
    }

    fn read_leaf(&mut self, page_no: PageNo) -> Result<Page> {
        let page = self.file.read_page(page_no)?;
        if page.page_type()? != PageType::LeafTable {
            return Err(StorageError::corrupt(page_no, "expected a table leaf page"));
        }
        Ok(page)
    }

    pub fn read_cell(&mut self, page_no: PageNo, index: usize) -> Result<LeafCell> {
        let page = self.read_leaf(page_no)?;
        LeafCell::from_bytes(page.cell(index)?)
    }

    /// Append a row under the next rowid and return that rowid.
    pub fn append_row(&mut self, values: &[Value]) -> Result<RowId> {
        let columns = values
            .iter()
            .map(Value::encode)
            .collect::<Result<Vec<_>>>()?;
        self.append_columns(columns)
    }

    /// Append already-encoded columns. The max rowid in the metadata page is
    /// only bumped once the cell is on disk, so a failed append consumes no
    /// rowid. If that last header write fails the cell is removed again; a
    /// split it caused stays in place.
    pub fn append_columns(&mut self, columns: Vec<Vec<u8>>) -> Result<RowId> {
        let max_row_id = self.max_row_id();
        if max_row_id >= MAX_ROWID {
            return Err(StorageError::RowIdExhausted);
        }
        let row_id = max_row_id + 1;
        let cell = LeafCell::from_columns(row_id, columns)?.to_bytes();

        let limit = Page::capacity(self.file.page_size()) - CELL_POINTER_SIZE;
        if cell.len() > limit {
            return Err(StorageError::ValueTooLarge {
                size: cell.len(),
                max: limit,
            });
        }

        let leaf_no = self.find_rightmost_leaf()?;
        let mut leaf = self.read_leaf(leaf_no)?;
        if btree::has_room(&leaf, cell.len(), self.max_cells) {
            leaf.insert_cell(&cell)?;
            self.file.write_page(&leaf)?;
        } else {
            self.split_leaf_and_append(leaf, &cell)?;
        }

        let mut header = *self.file.header();
        header.reserved = row_id;
        if let Err(e) = self.file.write_header(header) {
            self.discard_appended(row_id);
            return Err(e);
        }
        trace!("Appended rowid {} ({} bytes)", row_id, cell.len());
        Ok(row_id)
    }

    /// Take back a row whose rowid never reached the metadata page, so the
    /// rowid can be handed out again without a duplicate.
    fn discard_appended(&mut self, row_id: RowId) {
        match self.remove_row(row_id) {
            Ok(true) => debug!("Discarded unrecorded rowid {}", row_id),
            Ok(false) => warn!("Unrecorded rowid {} was not found to discard", row_id),
            Err(e) => warn!("Failed to discard unrecorded rowid {}: {}", row_id, e),
        }
    }

    /// Move the upper part of a full rightmost leaf to a new right sibling
    /// and place the new cell there. Starts from the upper half and moves
    /// fewer cells if the new cell would not fit beside them.
    fn split_leaf_and_append(&mut self, mut leaf: Page, new_cell: &[u8]) -> Result<()> {
        let page_size = self.file.page_size();
        let cells = leaf.cells()?;
        let count = cells.len();
        if count == 0 {
            return Err(StorageError::PageFull {
                page_no: leaf.page_no(),
            });
        }

        let mut split = count.div_ceil(2);
        while split < count {
            let moved = cells[split..].iter().map(Vec::len).chain(std::iter::once(new_cell.len()));
            if btree::fits_in_page(moved, page_size, self.max_cells) {
                break;
            }
            split += 1;
        }

        let mut sibling = self.file.allocate_page(PageType::LeafTable, leaf.parent())?;
        sibling.set_right_pointer(leaf.right_pointer());
        for cell in &cells[split..] {
            sibling.insert_cell(cell)?;
        }
        sibling.insert_cell(new_cell)?;

        leaf.reset_cells();
        for cell in &cells[..split] {
            leaf.insert_cell(cell)?;
        }
        leaf.set_right_pointer(Some(sibling.page_no()));
        let separator = LeafCell::row_id_of(&cells[split - 1])?;

        self.file.write_page(&sibling)?;
        self.file.write_page(&leaf)?;
        debug!(
            "Split table leaf {} -> {} ({} cells moved, separator rowid {})",
            leaf.page_no(),
            sibling.page_no(),
            count - split,
            separator
        );

        btree::propagate_split(
            self.file,
            PageType::InteriorTable,
            self.max_cells,
            leaf.page_no(),
            sibling.page_no(),
            separator,
        )
    }

    /// Where a rowid is stored, if it exists.
    pub fn locate(&mut self, row_id: RowId) -> Result<Option<CellPosition>> {
        let leaf_no = self.find_leaf(row_id)?;
        let leaf = self.read_leaf(leaf_no)?;
        for index in 0..leaf.cell_count() {
            if LeafCell::row_id_of(leaf.cell(index)?)? == row_id {
                return Ok(Some(CellPosition {
                    page_no: leaf_no,
                    index,
                    row_id,
                }));
            }
        }
        Ok(None)
    }

    /// First row at or after `(page_no, index)` in scan order.
    pub fn next_position(&mut self, page_no: PageNo, index: usize) -> Result<Option<CellPosition>> {
        let (mut page_no, mut index) = (page_no, index);
        for _ in 0..=self.file.page_count() {
            let leaf = self.read_leaf(page_no)?;
            if index < leaf.cell_count() {
                let row_id = LeafCell::row_id_of(leaf.cell(index)?)?;
                return Ok(Some(CellPosition {
                    page_no,
                    index,
                    row_id,
                }));
            }
            match btree::next_leaf(self.file, &leaf) {
                Some(next) => {
                    page_no = next;
                    index = 0;
                }
                None => return Ok(None),
            }
        }
        Err(StorageError::corrupt(page_no, "leaf sibling chain forms a cycle"))
    }

    /// First row whose rowid is `row_id` or greater.
    pub fn seek_at_or_after(&mut self, row_id: RowId) -> Result<Option<CellPosition>> {
        let mut page_no = self.find_leaf(row_id)?;
        for _ in 0..=self.file.page_count() {
            let leaf = self.read_leaf(page_no)?;
            for index in 0..leaf.cell_count() {
                let found = LeafCell::row_id_of(leaf.cell(index)?)?;
                if found >= row_id {
                    return Ok(Some(CellPosition {
                        page_no,
                        index,
                        row_id: found,
                    }));
                }
            }
            match btree::next_leaf(self.file, &leaf) {
                Some(next) => page_no = next,
                None => return Ok(None),
            }
        }
        Err(StorageError::corrupt(page_no, "leaf sibling chain forms a cycle"))
    }

    /// Delete a row by rowid. Returns false when no such row exists.
    pub fn remove_row(&mut self, row_id: RowId) -> Result<bool> {
        match self.locate(row_id)? {
            Some(position) => {
                self.remove_at(position.page_no, position.index)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Delete the cell at a position, compacting the leaf. Empty leaves stay
    /// in the sibling chain.
    pub fn remove_at(&mut self, page_no: PageNo, index: usize) -> Result<()> {
        let mut leaf = self.read_leaf(page_no)?;
        leaf.remove_cell(index)?;
        self.file.write_page(&leaf)?;
        trace!("Removed cell {} from leaf {}", index, page_no);
        Ok(())
    }

    /// Replace the cell at a position with `cell`, which must keep the same
    /// rowid. Returns false, leaving the page untouched, when the new cell
    /// does not fit on the page.
    pub fn rewrite_at(&mut self, page_no: PageNo, index: usize, cell: &LeafCell) -> Result<bool> {
        let mut leaf = self.read_leaf(page_no)?;
        let bytes = cell.to_bytes();
        if leaf.cell(index)?.len() == bytes.len() {
            leaf.overwrite_cell(index, &bytes)?;
        } else {
            leaf.remove_cell(index)?;
            if !leaf.can_fit(bytes.len()) {
                return Ok(false);
            }
            leaf.insert_cell_at(index, &bytes)?;
        }
        self.file.write_page(&leaf)?;
        Ok(true)
    }
}
