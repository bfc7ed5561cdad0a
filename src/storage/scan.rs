use crate::{
    storage::cursor::TableCursor,
    types::{error::Result, row::Row, value::DataType},
};

pub trait Scanner {
    fn scan(&mut self) -> Result<Option<Row>>;
    fn scan_batch(&mut self, batch_size: usize) -> Result<Vec<Row>>;
    fn reset(&mut self);
}

/// Sequential scan of a table through its cursor, decoding every row
/// against a fixed column type list.
pub struct TableScanner<'c, 'a> {
    cursor: &'c mut TableCursor<'a>,
    types: Vec<DataType>,
}

impl<'c, 'a> TableScanner<'c, 'a> {
    pub fn new(cursor: &'c mut TableCursor<'a>, types: Vec<DataType>) -> Self {
        Self { cursor, types }
    }
}

impl Scanner for TableScanner<'_, '_> {
    fn scan(&mut self) -> Result<Option<Row>> {
        if !self.cursor.go_to_next_row()? {
            return Ok(None);
        }
        self.cursor.read_row(&self.types).map(Some)
    }

    fn scan_batch(&mut self, batch_size: usize) -> Result<Vec<Row>> {
        let mut rows = Vec::with_capacity(batch_size);
        while rows.len() < batch_size {
            match self.scan()? {
                Some(row) => rows.push(row),
                None => break,
            }
        }
        Ok(rows)
    }

    fn reset(&mut self) {
        self.cursor.reset();
    }
}

pub struct ScanIterator<S: Scanner> {
    scanner: S,
    failed: bool,
}

impl<S: Scanner> ScanIterator<S> {
    pub fn new(scanner: S) -> Self {
        Self {
            scanner,
            failed: false,
        }
    }

    pub fn into_scanner(self) -> S {
        self.scanner
    }
}

impl<S: Scanner> Iterator for ScanIterator<S> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.scanner.scan() {
            Ok(Some(row)) => Some(Ok(row)),
            Ok(None) => None,
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}
