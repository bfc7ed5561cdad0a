//! Page-structure operations shared by the table and index trees: interior
//! node (de)serialization, root-to-leaf descent, leaf chaining and upward
//! split propagation.

use log::debug;

use crate::{
    storage::paged_file::PagedFile,
    types::{
        CELL_POINTER_SIZE, PageNo,
        error::{Result, StorageError},
        page::{Page, PageType},
    },
};

/// Routing key stored next to a child pointer in an interior cell.
pub trait Separator: Clone {
    fn encode_cell(&self, child: PageNo) -> Vec<u8>;
    fn decode_cell(bytes: &[u8]) -> Result<(PageNo, Self)>;
}

/// Decoded interior page: `(child, separator)` entries in ascending key
/// order plus the rightmost child for keys above every separator.
#[derive(Debug, Clone, PartialEq)]
pub struct InteriorNode<K> {
    pub entries: Vec<(PageNo, K)>,
    pub rightmost: PageNo,
}

impl<K: Separator> InteriorNode<K> {
    pub fn read(page: &Page) -> Result<Self> {
        let entries = (0..page.cell_count())
            .map(|index| page.cell(index).and_then(K::decode_cell))
            .collect::<Result<Vec<_>>>()?;
        let rightmost = page.right_pointer().ok_or_else(|| {
            StorageError::corrupt(page.page_no(), "interior page without rightmost child")
        })?;
        Ok(Self { entries, rightmost })
    }

    pub fn children(&self) -> impl Iterator<Item = PageNo> + '_ {
        self.entries
            .iter()
            .map(|(child, _)| *child)
            .chain(std::iter::once(self.rightmost))
    }

    fn encoded(&self) -> Vec<Vec<u8>> {
        self.entries
            .iter()
            .map(|(child, key)| key.encode_cell(*child))
            .collect()
    }

    /// Replace the page's cells and rightmost pointer with this node.
    pub fn write_into(&self, page: &mut Page) -> Result<()> {
        page.reset_cells();
        for cell in self.encoded() {
            page.insert_cell(&cell)?;
        }
        page.set_right_pointer(Some(self.rightmost));
        Ok(())
    }

    /// Record that `left` split into `left` (keys up to `separator`) and
    /// `right` (the rest of what `left` covered).
    fn insert_split(&mut self, page_no: PageNo, left: PageNo, right: PageNo, separator: K) -> Result<()> {
        if let Some(i) = self.entries.iter().position(|(child, _)| *child == left) {
            let upper = std::mem::replace(&mut self.entries[i].1, separator);
            self.entries.insert(i + 1, (right, upper));
        } else if self.rightmost == left {
            self.entries.push((left, separator));
            self.rightmost = right;
        } else {
            return Err(StorageError::corrupt(
                page_no,
                format!("page {} claims this parent but is not one of its children", left),
            ));
        }
        Ok(())
    }

    /// Split an overfull node around one entry that moves up to the parent.
    /// Picks the most balanced split point that leaves both halves fitting.
    fn split(self, page_no: PageNo, page_size: usize, max_cells: Option<usize>) -> Result<(Self, K, Self)> {
        let sizes: Vec<usize> = self.encoded().iter().map(Vec::len).collect();
        let total: usize = sizes.iter().map(|s| s + CELL_POINTER_SIZE).sum();

        let mut best: Option<(usize, usize)> = None;
        let mut left_bytes = 0;
        for mid in 0..sizes.len() {
            let right_bytes = total - left_bytes - (sizes[mid] + CELL_POINTER_SIZE);
            let left_ok = fits_in_page(sizes[..mid].iter().copied(), page_size, max_cells);
            let right_ok = fits_in_page(sizes[mid + 1..].iter().copied(), page_size, max_cells);
            if left_ok && right_ok {
                let imbalance = left_bytes.abs_diff(right_bytes);
                if best.is_none_or(|(_, b)| imbalance < b) {
                    best = Some((mid, imbalance));
                }
            }
            left_bytes += sizes[mid] + CELL_POINTER_SIZE;
        }
        let (mid, _) = best.ok_or_else(|| {
            StorageError::corrupt(page_no, "no split point leaves both interior halves fitting")
        })?;

        let mut left_entries = self.entries;
        let mut right_entries = left_entries.split_off(mid);
        let (mid_child, mid_key) = right_entries.remove(0);
        let left = Self {
            entries: left_entries,
            rightmost: mid_child,
        };
        let right = Self {
            entries: right_entries,
            rightmost: self.rightmost,
        };
        Ok((left, mid_key, right))
    }
}

/// Whether cells of these lengths (plus their pointers) fit an empty page.
pub fn fits_in_page(
    cell_lens: impl Iterator<Item = usize>,
    page_size: usize,
    max_cells: Option<usize>,
) -> bool {
    let (count, bytes) = cell_lens.fold((0, 0), |(count, bytes), len| {
        (count + 1, bytes + len + CELL_POINTER_SIZE)
    });
    bytes <= Page::capacity(page_size) && max_cells.is_none_or(|max| count <= max)
}

/// `fits_in_page` over already encoded cells.
pub fn cells_fit(cells: &[Vec<u8>], page_size: usize, max_cells: Option<usize>) -> bool {
    fits_in_page(cells.iter().map(Vec::len), page_size, max_cells)
}

/// Whether one more cell of `cell_len` bytes fits this page.
pub fn has_room(page: &Page, cell_len: usize, max_cells: Option<usize>) -> bool {
    page.can_fit(cell_len) && max_cells.is_none_or(|max| page.cell_count() < max)
}

/// Walk from the root to a leaf, letting `choose` pick the child at each
/// interior page.
pub fn descend<K: Separator>(
    file: &mut PagedFile,
    leaf_type: PageType,
    interior_type: PageType,
    mut choose: impl FnMut(&InteriorNode<K>) -> Result<PageNo>,
) -> Result<PageNo> {
    let mut page_no = file.header().root_page;
    for _ in 0..=file.page_count() {
        let page = file.read_page(page_no)?;
        let page_type = page.page_type()?;
        if page_type == leaf_type {
            return Ok(page_no);
        }
        if page_type != interior_type {
            return Err(StorageError::corrupt(
                page_no,
                format!("unexpected {:?} page during traversal", page_type),
            ));
        }
        page_no = choose(&InteriorNode::read(&page)?)?;
    }
    Err(StorageError::corrupt(page_no, "interior pointers form a cycle"))
}

/// Right sibling of a leaf, if it names a page that exists.
pub fn next_leaf(file: &PagedFile, leaf: &Page) -> Option<PageNo> {
    leaf.right_pointer().filter(|page_no| file.contains_page(*page_no))
}

/// All leaves from the leftmost one along the sibling chain.
pub fn leaf_chain(file: &mut PagedFile, leftmost: PageNo) -> Result<Vec<PageNo>> {
    let mut leaves = vec![leftmost];
    let mut page = file.read_page(leftmost)?;
    while let Some(next) = next_leaf(file, &page) {
        if leaves.len() > file.page_count() as usize {
            return Err(StorageError::corrupt(next, "leaf sibling chain forms a cycle"));
        }
        leaves.push(next);
        page = file.read_page(next)?;
    }
    Ok(leaves)
}

fn set_parent(file: &mut PagedFile, page_no: PageNo, parent: PageNo) -> Result<()> {
    let mut page = file.read_page(page_no)?;
    if page.parent() != Some(parent) {
        page.set_parent(Some(parent));
        file.write_page(&page)?;
    }
    Ok(())
}

/// Hook a freshly split pair of siblings into the tree. `left` keeps the
/// keys up to `separator`; `right` is new. Splits interior pages upward as
/// needed and grows a new root when the old root splits.
pub fn propagate_split<K: Separator>(
    file: &mut PagedFile,
    interior_type: PageType,
    max_cells: Option<usize>,
    left: PageNo,
    right: PageNo,
    separator: K,
) -> Result<()> {
    let page_size = file.page_size();
    let (mut left, mut right, mut separator) = (left, right, separator);
    loop {
        let Some(parent_no) = file.read_page(left)?.parent() else {
            return grow_root(file, interior_type, left, right, separator);
        };

        let mut parent = file.read_page(parent_no)?;
        let mut node = InteriorNode::<K>::read(&parent)?;
        node.insert_split(parent_no, left, right, separator)?;

        if cells_fit(&node.encoded(), page_size, max_cells) {
            node.write_into(&mut parent)?;
            file.write_page(&parent)?;
            return set_parent(file, right, parent_no);
        }

        let (left_node, up, right_node) = node.split(parent_no, page_size, max_cells)?;
        let mut sibling = file.allocate_page(interior_type, parent.parent())?;
        right_node.write_into(&mut sibling)?;
        file.write_page(&sibling)?;
        left_node.write_into(&mut parent)?;
        file.write_page(&parent)?;

        for child in left_node.children() {
            set_parent(file, child, parent_no)?;
        }
        for child in right_node.children() {
            set_parent(file, child, sibling.page_no())?;
        }
        debug!(
            "Split interior page {} -> {} ({} / {} entries)",
            parent_no,
            sibling.page_no(),
            left_node.entries.len(),
            right_node.entries.len()
        );

        left = parent_no;
        right = sibling.page_no();
        separator = up;
    }
}

fn grow_root<K: Separator>(
    file: &mut PagedFile,
    interior_type: PageType,
    left: PageNo,
    right: PageNo,
    separator: K,
) -> Result<()> {
    let mut root = file.allocate_page(interior_type, None)?;
    let node = InteriorNode {
        entries: vec![(left, separator)],
        rightmost: right,
    };
    node.write_into(&mut root)?;
    file.write_page(&root)?;
    set_parent(file, left, root.page_no())?;
    set_parent(file, right, root.page_no())?;

    let mut header = *file.header();
    header.root_page = root.page_no();
    file.write_header(header)?;
    debug!("Grew new root page {} over {} and {}", root.page_no(), left, right);
    Ok(())
}
