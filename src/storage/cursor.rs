use log::debug;

use crate::{
    storage::{
        bplus_tree::{CellPosition, TableBTree},
        paged_file::PagedFile,
        scan::{ScanIterator, TableScanner},
    },
    types::{
        RowId,
        error::{Result, StorageError},
        page::PageType,
        row::{LeafCell, Row},
        value::{DataType, Value},
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CursorState {
    Unpositioned,
    Positioned(CellPosition),
    /// No current row; the next step resumes at the first rowid above this one.
    After(RowId),
    Exhausted,
}

/// What `write_row` did with the current row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The row was rewritten on its own page and stays current.
    InPlace,
    /// The row no longer fit its page. It was re-appended under a new rowid
    /// and the old rowid removed; the cursor has no current row until the
    /// next step.
    Relocated { old_row_id: RowId, new_row_id: RowId },
}

macro_rules! typed_reader {
    ($(#[$doc:meta])* $name:ident, $data_type:ident, $variant:ident, $ty:ty) => {
        $(#[$doc])*
        pub fn $name(&mut self, index: usize) -> Result<Option<$ty>> {
            match self.read_column(index, DataType::$data_type)? {
                None => Ok(None),
                Some(Value::$variant(value)) => Ok(Some(value)),
                Some(other) => Err(StorageError::TypeMismatch {
                    expected: DataType::$data_type.to_string(),
                    actual: other.data_type().to_string(),
                }),
            }
        }
    };
}

/// Forward cursor over the rows of one table file in rowid order.
///
/// Positions are remembered as (page, cell index, rowid). Before every use
/// the position is checked against the page, and if a split moved the row
/// it is found again by rowid.
pub struct TableCursor<'a> {
    file: &'a mut PagedFile,
    max_cells: Option<usize>,
    state: CursorState,
}

impl<'a> TableCursor<'a> {
    pub fn new(file: &'a mut PagedFile, max_cells: Option<usize>) -> Self {
        Self {
            file,
            max_cells,
            state: CursorState::Unpositioned,
        }
    }

    fn tree(&mut self) -> TableBTree<'_> {
        TableBTree::new(&mut *self.file, self.max_cells)
    }

    /// Back to the state before the first `go_to_next_row`.
    pub fn reset(&mut self) {
        self.state = CursorState::Unpositioned;
    }

    pub fn is_exhausted(&self) -> bool {
        self.state == CursorState::Exhausted
    }

    fn current(&mut self) -> Result<CellPosition> {
        let CursorState::Positioned(position) = self.state else {
            return Err(StorageError::NoCurrentRow);
        };
        let page = self.tree().page(position.page_no)?;
        if page.page_type()? == PageType::LeafTable
            && position.index < page.cell_count()
            && LeafCell::row_id_of(page.cell(position.index)?)? == position.row_id
        {
            return Ok(position);
        }

        match self.tree().locate(position.row_id)? {
            Some(moved) => {
                debug!(
                    "Rowid {} moved from page {} to page {}",
                    position.row_id, position.page_no, moved.page_no
                );
                self.state = CursorState::Positioned(moved);
                Ok(moved)
            }
            None => {
                self.state = CursorState::After(position.row_id);
                Err(StorageError::NoCurrentRow)
            }
        }
    }

    fn settle(&mut self, found: Option<CellPosition>) -> bool {
        match found {
            Some(position) => {
                self.state = CursorState::Positioned(position);
                true
            }
            None => {
                self.state = CursorState::Exhausted;
                false
            }
        }
    }

    /// Step to the next row. Returns false, and leaves the cursor exhausted,
    /// once there are no more rows.
    pub fn go_to_next_row(&mut self) -> Result<bool> {
        let found = match self.state {
            CursorState::Exhausted => return Ok(false),
            CursorState::Unpositioned => {
                let leftmost = self.tree().find_leftmost_leaf()?;
                self.tree().next_position(leftmost, 0)?
            }
            CursorState::Positioned(_) => match self.current() {
                Ok(position) => self.tree().next_position(position.page_no, position.index + 1)?,
                Err(StorageError::NoCurrentRow) => return self.go_to_next_row(),
                Err(e) => return Err(e),
            },
            CursorState::After(row_id) => self.tree().seek_at_or_after(row_id.saturating_add(1))?,
        };
        Ok(self.settle(found))
    }

    /// Position on `row_id`. When it does not exist, returns false and the
    /// next `go_to_next_row` continues with the first larger rowid.
    pub fn go_to_row(&mut self, row_id: RowId) -> Result<bool> {
        match self.tree().locate(row_id)? {
            Some(position) => {
                self.state = CursorState::Positioned(position);
                Ok(true)
            }
            None => {
                self.state = CursorState::After(row_id);
                Ok(false)
            }
        }
    }

    pub fn row_id(&mut self) -> Result<RowId> {
        Ok(self.current()?.row_id)
    }

    fn current_cell(&mut self) -> Result<LeafCell> {
        let position = self.current()?;
        self.tree().read_cell(position.page_no, position.index)
    }

    /// Logical column count of the current row, counting the rowid column.
    pub fn column_count(&mut self) -> Result<usize> {
        Ok(self.current_cell()?.column_count())
    }

    /// Decode column `index` of the current row (0 is the rowid). NULL reads
    /// as `None`.
    pub fn read_column(&mut self, index: usize, data_type: DataType) -> Result<Option<Value>> {
        self.current_cell()?.read_column(index, data_type)
    }

    typed_reader!(read_tiny_int, TinyInt, TinyInt, i8);
    typed_reader!(read_small_int, SmallInt, SmallInt, i16);
    typed_reader!(read_int, Int, Int, i32);
    typed_reader!(read_big_int, BigInt, BigInt, i64);
    typed_reader!(read_float, Float, Float, f32);
    typed_reader!(read_double, Double, Double, f64);
    typed_reader!(
        /// Calendar year, e.g. 2024.
        read_year, Year, Year, i32
    );
    typed_reader!(read_time, Time, Time, chrono::NaiveTime);
    typed_reader!(read_date_time, DateTime, DateTime, chrono::DateTime<chrono::Utc>);
    typed_reader!(read_date, Date, Date, chrono::NaiveDate);
    typed_reader!(read_text, Text, Text, String);

    /// Decode the user columns of the current row against `types`.
    pub fn read_row(&mut self, types: &[DataType]) -> Result<Row> {
        self.current_cell()?.to_row(types)
    }

    /// Append a row to the table. The cursor keeps its position.
    pub fn append_row(&mut self, values: &[Value]) -> Result<RowId> {
        self.tree().append_row(values)
    }

    /// Delete the current row. Afterwards there is no current row and the
    /// next step continues with the following rowid.
    pub fn remove_row(&mut self) -> Result<()> {
        let position = self.current()?;
        self.tree().remove_at(position.page_no, position.index)?;
        self.state = CursorState::After(position.row_id);
        Ok(())
    }

    /// Update columns of the current row. Column 0 (the rowid) cannot be
    /// written. Every value is validated before anything changes.
    pub fn write_row(&mut self, updates: &[(usize, Value)]) -> Result<WriteOutcome> {
        let position = self.current()?;
        let mut cell = self.tree().read_cell(position.page_no, position.index)?;

        let mut columns = cell.columns.clone();
        for (index, value) in updates {
            if *index == 0 {
                return Err(StorageError::InvalidValue {
                    reason: "the rowid column cannot be written".to_string(),
                });
            }
            let slot = columns
                .get_mut(index - 1)
                .ok_or(StorageError::ColumnIndexOutOfRange {
                    index: *index,
                    count: cell.column_count(),
                })?;
            *slot = value.encode()?;
        }
        cell = LeafCell::from_columns(position.row_id, columns)?;

        if self.tree().rewrite_at(position.page_no, position.index, &cell)? {
            return Ok(WriteOutcome::InPlace);
        }

        let new_row_id = self.tree().append_columns(cell.columns)?;
        self.tree().remove_row(position.row_id)?;
        self.state = CursorState::After(position.row_id);
        debug!("Relocated rowid {} as {}", position.row_id, new_row_id);
        Ok(WriteOutcome::Relocated {
            old_row_id: position.row_id,
            new_row_id,
        })
    }

    /// Iterate every row from the start of the table, decoding user columns
    /// against `types`.
    pub fn rows(&mut self, types: &[DataType]) -> ScanIterator<TableScanner<'_, 'a>> {
        self.reset();
        ScanIterator::new(TableScanner::new(self, types.to_vec()))
    }
}
