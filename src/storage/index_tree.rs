use std::cmp::Ordering;

use log::{debug, trace};

use crate::{
    storage::{
        btree::{self, Separator},
        paged_file::PagedFile,
    },
    types::{
        CELL_POINTER_SIZE, PageNo, ROWID_NULL_VALUE, RowId,
        entry::{IndexInteriorCell, IndexLeafCell},
        error::{Result, StorageError},
        page::{Page, PageType},
        value::{DataType, Value},
    },
};

/// One distinct key of an index with every rowid stored under it.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    pub key: Value,
    pub row_ids: Vec<RowId>,
}

/// Interior routing key of an index: the largest key of the left subtree
/// (still encoded) and the first rowid stored under it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSeparator {
    pub key: Vec<u8>,
    pub row_id: RowId,
}

impl Separator for IndexSeparator {
    fn encode_cell(&self, child: PageNo) -> Vec<u8> {
        IndexInteriorCell::new(child, self.key.clone(), self.row_id).to_bytes()
    }

    fn decode_cell(bytes: &[u8]) -> Result<(PageNo, Self)> {
        let cell = IndexInteriorCell::from_bytes(bytes)?;
        Ok((
            cell.left_child,
            IndexSeparator {
                key: cell.key,
                row_id: cell.row_id,
            },
        ))
    }
}

/// B+-tree of one index file. Every key lives in exactly one leaf cell;
/// interior pages only route. TEXT keys compare ASCII case-insensitively,
/// so keys differing only in case share a cell.
pub struct IndexBTree<'a> {
    file: &'a mut PagedFile,
    key_type: DataType,
    max_cells: Option<usize>,
}

impl<'a> IndexBTree<'a> {
    /// Opens the tree over `file`, taking the key type from its metadata page.
    pub fn new(file: &'a mut PagedFile, max_cells: Option<usize>) -> Result<Self> {
        let code = file.header().reserved;
        let key_type = u8::try_from(code)
            .map_err(|_| StorageError::InvalidValue {
                reason: format!("index key type code {} out of range", code),
            })
            .and_then(DataType::from_u8)?;
        Ok(Self {
            file,
            key_type,
            max_cells,
        })
    }

    pub fn key_type(&self) -> DataType {
        self.key_type
    }

    pub fn root_page(&self) -> PageNo {
        self.file.header().root_page
    }

    pub fn page(&mut self, page_no: PageNo) -> Result<Page> {
        self.file.read_page(page_no)
    }

    /// Largest leaf cell allowed, so that any overflowing leaf can be split
    /// into two halves that each fit a page.
    fn max_cell_size(&self) -> usize {
        Page::capacity(self.file.page_size()) / 2 - CELL_POINTER_SIZE
    }

    fn check_key(&self, key: &Value) -> Result<Vec<u8>> {
        if !key.is_null() && key.data_type() != self.key_type {
            return Err(StorageError::TypeMismatch {
                expected: self.key_type.to_string(),
                actual: key.data_type().to_string(),
            });
        }
        key.encode()
    }

    fn decode_key(&self, bytes: &[u8]) -> Result<Value> {
        Value::decode(self.key_type, bytes)
    }

    fn find_leaf(&mut self, key: &Value) -> Result<PageNo> {
        let key_type = self.key_type;
        btree::descend::<IndexSeparator>(self.file, PageType::LeafIndex, PageType::InteriorIndex, |node| {
            for (child, separator) in &node.entries {
                let bound = Value::decode(key_type, &separator.key)?;
                if key.index_cmp(&bound) != Ordering::Greater {
                    return Ok(*child);
                }
            }
            Ok(node.rightmost)
        })
    }

    fn find_leftmost_leaf(&mut self) -> Result<PageNo> {
        btree::descend::<IndexSeparator>(self.file, PageType::LeafIndex, PageType::InteriorIndex, |node| {
            Ok(node.entries.first().map_or(node.rightmost, |(child, _)| *child))
        })
    }

    pub fn leaf_pages(&mut self) -> Result<Vec<PageNo>> {
        let leftmost = self.find_leftmost_leaf()?;
        btree::leaf_chain(self.file, leftmost)
    }

    fn read_leaf(&mut self, page_no: PageNo) -> Result<(Page, Vec<IndexLeafCell>)> {
        let page = self.file.read_page(page_no)?;
        if page.page_type()? != PageType::LeafIndex {
            return Err(StorageError::corrupt(page_no, "expected an index leaf page"));
        }
        let cells = (0..page.cell_count())
            .map(|index| page.cell(index).and_then(IndexLeafCell::from_bytes))
            .collect::<Result<Vec<_>>>()?;
        Ok((page, cells))
    }

    /// Position of `key` among sorted leaf cells: `Ok` when present, `Err`
    /// with the insertion point otherwise.
    fn search(&self, cells: &[IndexLeafCell], key: &Value) -> Result<std::result::Result<usize, usize>> {
        for (index, cell) in cells.iter().enumerate() {
            match self.decode_key(&cell.key)?.index_cmp(key) {
                Ordering::Less => continue,
                Ordering::Equal => return Ok(Ok(index)),
                Ordering::Greater => return Ok(Err(index)),
            }
        }
        Ok(Err(cells.len()))
    }

    /// Add `row_id` under `key`. Returns false when the pair was already
    /// present.
    pub fn insert(&mut self, key: &Value, row_id: RowId) -> Result<bool> {
        let encoded = self.check_key(key)?;
        let leaf_no = self.find_leaf(key)?;
        let (page, mut cells) = self.read_leaf(leaf_no)?;

        let index = match self.search(&cells, key)? {
            Ok(index) => {
                let row_ids = &mut cells[index].row_ids;
                match row_ids.binary_search(&row_id) {
                    Ok(_) => return Ok(false),
                    Err(at) => {
                        if row_ids.len() >= IndexLeafCell::MAX_ROW_IDS {
                            return Err(StorageError::ValueTooLarge {
                                size: row_ids.len() + 1,
                                max: IndexLeafCell::MAX_ROW_IDS,
                            });
                        }
                        row_ids.insert(at, row_id);
                    }
                }
                index
            }
            Err(at) => {
                cells.insert(at, IndexLeafCell::new(encoded, vec![row_id]));
                at
            }
        };

        let limit = self.max_cell_size();
        if cells[index].size() > limit {
            return Err(StorageError::ValueTooLarge {
                size: cells[index].size(),
                max: limit,
            });
        }

        let encoded_cells: Vec<Vec<u8>> = cells.iter().map(IndexLeafCell::to_bytes).collect();
        if btree::cells_fit(&encoded_cells, self.file.page_size(), self.max_cells) {
            self.rewrite_leaf(page, &encoded_cells)?;
        } else {
            self.split_leaf(page, &cells, &encoded_cells)?;
        }
        trace!("Indexed key {} -> rowid {}", key, row_id);
        Ok(true)
    }

    fn rewrite_leaf(&mut self, mut page: Page, cells: &[Vec<u8>]) -> Result<()> {
        page.reset_cells();
        for cell in cells {
            page.insert_cell(cell)?;
        }
        self.file.write_page(&page)
    }

    /// Split an overfull sorted leaf at the most balanced point where both
    /// halves fit, and link the new right half after it.
    fn split_leaf(&mut self, mut leaf: Page, cells: &[IndexLeafCell], encoded: &[Vec<u8>]) -> Result<()> {
        let page_size = self.file.page_size();
        let total: usize = encoded.iter().map(|c| c.len() + CELL_POINTER_SIZE).sum();

        let mut best: Option<(usize, usize)> = None;
        let mut left_bytes = 0;
        for split in 1..encoded.len() {
            left_bytes += encoded[split - 1].len() + CELL_POINTER_SIZE;
            let left_ok = btree::fits_in_page(encoded[..split].iter().map(Vec::len), page_size, self.max_cells);
            let right_ok = btree::fits_in_page(encoded[split..].iter().map(Vec::len), page_size, self.max_cells);
            if left_ok && right_ok {
                let imbalance = left_bytes.abs_diff(total - left_bytes);
                if best.is_none_or(|(_, b)| imbalance < b) {
                    best = Some((split, imbalance));
                }
            }
        }
        let (split, _) = best.ok_or(StorageError::PageFull {
            page_no: leaf.page_no(),
        })?;

        let mut sibling = self.file.allocate_page(PageType::LeafIndex, leaf.parent())?;
        sibling.set_right_pointer(leaf.right_pointer());
        for cell in &encoded[split..] {
            sibling.insert_cell(cell)?;
        }
        leaf.set_right_pointer(Some(sibling.page_no()));
        let (left_no, right_no) = (leaf.page_no(), sibling.page_no());

        let last = &cells[split - 1];
        let separator = IndexSeparator {
            key: last.key.clone(),
            row_id: last.row_ids.first().copied().unwrap_or(ROWID_NULL_VALUE),
        };

        self.file.write_page(&sibling)?;
        self.rewrite_leaf(leaf, &encoded[..split])?;
        debug!(
            "Split index leaf {} -> {} ({} / {} keys)",
            left_no,
            right_no,
            split,
            encoded.len() - split
        );

        btree::propagate_split(
            self.file,
            PageType::InteriorIndex,
            self.max_cells,
            left_no,
            right_no,
            separator,
        )
    }

    /// Remove `row_id` from under `key`, dropping the key once its list is
    /// empty. Returns false when the pair was not present.
    pub fn remove(&mut self, key: &Value, row_id: RowId) -> Result<bool> {
        self.check_key(key)?;
        let leaf_no = self.find_leaf(key)?;
        let (page, mut cells) = self.read_leaf(leaf_no)?;
        let Ok(index) = self.search(&cells, key)? else {
            return Ok(false);
        };
        let Ok(at) = cells[index].row_ids.binary_search(&row_id) else {
            return Ok(false);
        };

        cells[index].row_ids.remove(at);
        if cells[index].row_ids.is_empty() {
            cells.remove(index);
        }
        let encoded: Vec<Vec<u8>> = cells.iter().map(IndexLeafCell::to_bytes).collect();
        self.rewrite_leaf(page, &encoded)?;
        trace!("Unindexed key {} -> rowid {}", key, row_id);
        Ok(true)
    }

    /// Rowids stored under `key`, ascending.
    pub fn lookup(&mut self, key: &Value) -> Result<Vec<RowId>> {
        self.check_key(key)?;
        let leaf_no = self.find_leaf(key)?;
        let (_, cells) = self.read_leaf(leaf_no)?;
        Ok(match self.search(&cells, key)? {
            Ok(index) => cells[index].row_ids.clone(),
            Err(_) => Vec::new(),
        })
    }

    /// Every entry in key order.
    pub fn scan(&mut self) -> Result<Vec<IndexEntry>> {
        let mut entries = Vec::new();
        for page_no in self.leaf_pages()? {
            let (_, cells) = self.read_leaf(page_no)?;
            for cell in cells {
                entries.push(IndexEntry {
                    key: self.decode_key(&cell.key)?,
                    row_ids: cell.row_ids,
                });
            }
        }
        Ok(entries)
    }
}
