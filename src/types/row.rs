use serde::{Deserialize, Serialize};

use crate::types::{
    RowId,
    error::{Result, StorageError},
    value::{DataType, Value},
};

/// A decoded table row: its rowid plus the user-visible column values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub row_id: RowId,
    pub values: Vec<Value>,
}

impl Row {
    pub fn new(row_id: RowId, values: Vec<Value>) -> Self {
        Self { row_id, values }
    }

    pub fn get_value(&self, column_index: usize) -> Option<&Value> {
        self.values.get(column_index)
    }
}

/*
 * Table leaf cell layout
 * ┌──────────────┬──────────────────────────┬──────────┬─────────────────────────┐
 * │ col_count(1) │ col_size_1..col_size_n   │ rowid(4) │ col_1 bytes..col_n bytes │
 * └──────────────┴──────────────────────────┴──────────┴─────────────────────────┘
 *
 * Logical column 0 is the rowid itself. Columns 1..=n are the schema
 * columns, and a size of 0 marks NULL.
 */

pub const LEAF_CELL_ROWID_SIZE: usize = 4;

/// Owned form of a table leaf cell, with column bytes still encoded.
#[derive(Debug, Clone, PartialEq)]
pub struct LeafCell {
    pub row_id: RowId,
    pub columns: Vec<Vec<u8>>,
}

impl LeafCell {
    pub fn from_values(row_id: RowId, values: &[Value]) -> Result<Self> {
        let columns = values
            .iter()
            .map(|value| value.encode())
            .collect::<Result<Vec<_>>>()?;
        Self::from_columns(row_id, columns)
    }

    pub fn from_columns(row_id: RowId, columns: Vec<Vec<u8>>) -> Result<Self> {
        if columns.len() > u8::MAX as usize {
            return Err(StorageError::ValueTooLarge {
                size: columns.len(),
                max: u8::MAX as usize,
            });
        }
        if let Some(column) = columns.iter().find(|c| c.len() > u8::MAX as usize) {
            return Err(StorageError::ValueTooLarge {
                size: column.len(),
                max: u8::MAX as usize,
            });
        }
        Ok(Self { row_id, columns })
    }

    /// Total encoded size: `1 + n + 4 + sum(column bytes)`.
    pub fn size(&self) -> usize {
        Self::header_size(self.columns.len()) + self.columns.iter().map(Vec::len).sum::<usize>()
    }

    pub fn header_size(column_count: usize) -> usize {
        1 + column_count + LEAF_CELL_ROWID_SIZE
    }

    /// Number of logical columns, counting the rowid as column 0.
    pub fn column_count(&self) -> usize {
        self.columns.len() + 1
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buffer = Vec::with_capacity(self.size());
        buffer.push(self.columns.len() as u8);
        for column in &self.columns {
            buffer.push(column.len() as u8);
        }
        buffer.extend_from_slice(&self.row_id.to_be_bytes());
        for column in &self.columns {
            buffer.extend_from_slice(column);
        }
        buffer
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let short = || StorageError::InvalidValue {
            reason: "truncated table leaf cell".to_string(),
        };
        let count = *bytes.first().ok_or_else(short)? as usize;
        let header = Self::header_size(count);
        if bytes.len() < header {
            return Err(short());
        }
        let sizes = &bytes[1..1 + count];
        let row_id = i32::from_be_bytes([
            bytes[1 + count],
            bytes[2 + count],
            bytes[3 + count],
            bytes[4 + count],
        ]);

        let mut columns = Vec::with_capacity(count);
        let mut cursor = header;
        for size in sizes {
            let end = cursor + *size as usize;
            let column = bytes.get(cursor..end).ok_or_else(short)?;
            columns.push(column.to_vec());
            cursor = end;
        }
        Ok(Self { row_id, columns })
    }

    /// Read only the rowid of an encoded cell.
    pub fn row_id_of(bytes: &[u8]) -> Result<RowId> {
        let count = *bytes.first().ok_or_else(|| StorageError::InvalidValue {
            reason: "empty table leaf cell".to_string(),
        })? as usize;
        bytes
            .get(1 + count..Self::header_size(count))
            .map(|b| i32::from_be_bytes([b[0], b[1], b[2], b[3]]))
            .ok_or_else(|| StorageError::InvalidValue {
                reason: "truncated table leaf cell".to_string(),
            })
    }

    /// Raw bytes of a logical column (0 is the rowid).
    pub fn column_bytes(&self, index: usize) -> Result<Vec<u8>> {
        match index {
            0 => Ok(self.row_id.to_be_bytes().to_vec()),
            i if i <= self.columns.len() => Ok(self.columns[i - 1].clone()),
            _ => Err(StorageError::ColumnIndexOutOfRange {
                index,
                count: self.column_count(),
            }),
        }
    }

    /// Decode a logical column; `None` when it is NULL.
    pub fn read_column(&self, index: usize, data_type: DataType) -> Result<Option<Value>> {
        let bytes = self.column_bytes(index)?;
        match Value::decode(data_type, &bytes)? {
            Value::Null => Ok(None),
            value => Ok(Some(value)),
        }
    }

    /// Decode all user columns (1..=n) against a schema.
    pub fn to_row(&self, types: &[DataType]) -> Result<Row> {
        if types.len() != self.columns.len() {
            return Err(StorageError::TypeMismatch {
                expected: format!("{} columns", types.len()),
                actual: format!("{} columns", self.columns.len()),
            });
        }
        let values = self
            .columns
            .iter()
            .zip(types)
            .map(|(bytes, data_type)| Value::decode(*data_type, bytes))
            .collect::<Result<Vec<_>>>()?;
        Ok(Row::new(self.row_id, values))
    }
}
