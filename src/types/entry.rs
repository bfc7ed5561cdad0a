use crate::types::{
    PageNo, RowId,
    error::{Result, StorageError},
};

fn read_u32(bytes: &[u8], offset: usize) -> Result<u32> {
    bytes
        .get(offset..offset + 4)
        .map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or_else(|| StorageError::InvalidValue {
            reason: format!("cell truncated at offset {}", offset),
        })
}

/// Routing entry of a table interior page: `[child:4][max rowid:4]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableInteriorCell {
    pub child: PageNo,
    pub max_row_id: RowId,
}

impl TableInteriorCell {
    pub const SIZE: usize = 8;

    pub fn new(child: PageNo, max_row_id: RowId) -> Self {
        Self { child, max_row_id }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(Self::SIZE);
        bytes.extend_from_slice(&self.child.to_be_bytes());
        bytes.extend_from_slice(&self.max_row_id.to_be_bytes());
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(Self {
            child: read_u32(bytes, 0)?,
            max_row_id: read_u32(bytes, 4)? as RowId,
        })
    }
}

/// Index leaf entry: `[rowid count:1][key length:1][key][rowid...]`.
/// One cell per distinct key; duplicates share the rowid list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexLeafCell {
    pub key: Vec<u8>,
    pub row_ids: Vec<RowId>,
}

impl IndexLeafCell {
    pub const MAX_ROW_IDS: usize = u8::MAX as usize;

    pub fn new(key: Vec<u8>, row_ids: Vec<RowId>) -> Self {
        Self { key, row_ids }
    }

    pub fn size(&self) -> usize {
        2 + self.key.len() + 4 * self.row_ids.len()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.size());
        bytes.push(self.row_ids.len() as u8);
        bytes.push(self.key.len() as u8);
        bytes.extend_from_slice(&self.key);
        for row_id in &self.row_ids {
            bytes.extend_from_slice(&row_id.to_be_bytes());
        }
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < 2 {
            return Err(StorageError::InvalidValue {
                reason: "index leaf cell shorter than its header".to_string(),
            });
        }
        let count = bytes[0] as usize;
        let key_len = bytes[1] as usize;
        let key = bytes
            .get(2..2 + key_len)
            .ok_or_else(|| StorageError::InvalidValue {
                reason: "index leaf key truncated".to_string(),
            })?
            .to_vec();
        let row_ids = (0..count)
            .map(|i| read_u32(bytes, 2 + key_len + 4 * i).map(|id| id as RowId))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { key, row_ids })
    }
}

/// Index interior entry: `[left child:4][rowid count:1][key length:1][key][rowid:4]`.
/// Carries the largest key of its left subtree and that key's first rowid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexInteriorCell {
    pub left_child: PageNo,
    pub key: Vec<u8>,
    pub row_id: RowId,
}

impl IndexInteriorCell {
    pub fn new(left_child: PageNo, key: Vec<u8>, row_id: RowId) -> Self {
        Self {
            left_child,
            key,
            row_id,
        }
    }

    pub fn size(&self) -> usize {
        4 + 2 + self.key.len() + 4
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.size());
        bytes.extend_from_slice(&self.left_child.to_be_bytes());
        bytes.push(1);
        bytes.push(self.key.len() as u8);
        bytes.extend_from_slice(&self.key);
        bytes.extend_from_slice(&self.row_id.to_be_bytes());
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let left_child = read_u32(bytes, 0)?;
        let header = bytes.get(4..6).ok_or_else(|| StorageError::InvalidValue {
            reason: "index interior cell shorter than its header".to_string(),
        })?;
        let (count, key_len) = (header[0] as usize, header[1] as usize);
        let key = bytes
            .get(6..6 + key_len)
            .ok_or_else(|| StorageError::InvalidValue {
                reason: "index interior key truncated".to_string(),
            })?
            .to_vec();
        let row_id = if count == 0 {
            crate::types::ROWID_NULL_VALUE
        } else {
            read_u32(bytes, 6 + key_len)? as RowId
        };
        Ok(Self {
            left_child,
            key,
            row_id,
        })
    }
}
