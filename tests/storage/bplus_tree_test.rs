use chrono::NaiveDate;
use pagestore::{
    StorageConfig,
    storage::{btree, table_file::TableFile},
    types::{
        CELL_POINTER_SIZE, MAX_ROWID, RowId,
        error::StorageError,
        page::{Page, PageType},
        row::LeafCell,
        value::Value,
    },
    utils::mock::TempDataDir,
};

fn create_test_row(key: i32, name: &str) -> Vec<Value> {
    vec![Value::Int(key), Value::from(name)]
}

fn create_wide_row(key: i32) -> Vec<Value> {
    vec![
        Value::Int(key),
        Value::Text(format!("{:0>30}", key)),
        Value::Double(key as f64 / 4.0),
        Value::Date(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()),
    ]
}

/// Rowids of every cell, following the leaf sibling chain.
fn chain_row_ids(table: &mut TableFile) -> Vec<RowId> {
    let mut tree = table.tree();
    let mut row_ids = Vec::new();
    for page_no in tree.leaf_pages().unwrap() {
        let page = tree.page(page_no).unwrap();
        assert_eq!(page.page_type().unwrap(), PageType::LeafTable);
        for cell in page.cells().unwrap() {
            row_ids.push(LeafCell::row_id_of(&cell).unwrap());
        }
    }
    row_ids
}

#[test]
fn test_rowids_start_at_zero_and_increase() {
    let temp = TempDataDir::new().unwrap();
    let mut table = temp.context.create_table_file("people").unwrap();
    assert_eq!(table.max_row_id(), -1);

    for expected in 0..5 {
        let row_id = table.append_row(&create_test_row(expected, "name")).unwrap();
        assert_eq!(row_id, expected);
    }
    assert_eq!(table.max_row_id(), 4);
    assert_eq!(table.row_count().unwrap(), 5);
}

#[test]
fn test_single_leaf_until_full() {
    let temp = TempDataDir::new().unwrap();
    let mut table = temp.context.create_table_file("people").unwrap();

    for i in 0..10 {
        table.append_row(&create_test_row(i, "short")).unwrap();
    }
    let mut tree = table.tree();
    assert_eq!(tree.root_page(), 2);
    assert_eq!(tree.leaf_pages().unwrap(), vec![2]);
    assert_eq!(tree.page(2).unwrap().cell_count(), 10);
}

#[test]
fn test_split_keeps_every_row_in_order() {
    let temp = TempDataDir::new().unwrap();
    let mut table = temp.context.create_table_file("wide").unwrap();

    for i in 0..500 {
        table.append_row(&create_wide_row(i)).unwrap();
    }

    let leaves = table.tree().leaf_pages().unwrap();
    assert!(leaves.len() >= 4, "expected at least 3 splits, got {} leaves", leaves.len());
    assert_eq!(chain_row_ids(&mut table), (0..500).collect::<Vec<_>>());
    assert_eq!(table.row_count().unwrap(), 500);

    let mut tree = table.tree();
    let root = tree.page(tree.root_page()).unwrap();
    assert_eq!(root.page_type().unwrap(), PageType::InteriorTable);
}

#[test]
fn test_leaf_split_relinks_siblings() {
    let temp = TempDataDir::new().unwrap();
    let mut table = temp.context.create_table_file("t").unwrap();

    // Fill the root leaf exactly, then one more row forces the split
    let mut appended = 0;
    loop {
        let before = table.tree().leaf_pages().unwrap().len();
        table.append_row(&create_test_row(appended, "padding")).unwrap();
        appended += 1;
        if table.tree().leaf_pages().unwrap().len() > before {
            break;
        }
    }

    let mut tree = table.tree();
    let leaves = tree.leaf_pages().unwrap();
    assert_eq!(leaves.len(), 2);
    let left = tree.page(leaves[0]).unwrap();
    let right = tree.page(leaves[1]).unwrap();
    assert_eq!(left.right_pointer(), Some(right.page_no()));
    assert_eq!(right.right_pointer(), None);
    assert_eq!(left.cell_count() + right.cell_count(), appended as usize);

    // The new root routes both leaves, and both point back at it
    let root_no = tree.root_page();
    assert_eq!(left.parent(), Some(root_no));
    assert_eq!(right.parent(), Some(root_no));
    let root = tree.page(root_no).unwrap();
    assert_eq!(root.cell_count(), 1);
    assert_eq!(root.right_pointer(), Some(right.page_no()));

    // The newest row lands in the right leaf
    let last = LeafCell::from_bytes(right.cell(right.cell_count() - 1).unwrap()).unwrap();
    assert_eq!(last.row_id, appended - 1);
}

#[test]
fn test_interior_splits_with_small_fan_out() {
    let temp = TempDataDir::with_config(StorageConfig::default().with_max_cells_per_page(4)).unwrap();
    let mut table = temp.context.create_table_file("narrow").unwrap();

    for i in 0..200 {
        table.append_row(&create_test_row(i, "n")).unwrap();
    }
    assert_eq!(chain_row_ids(&mut table), (0..200).collect::<Vec<_>>());

    let mut tree = table.tree();
    for page_no in tree.leaf_pages().unwrap() {
        assert!(tree.page(page_no).unwrap().cell_count() <= 4);
    }

    // Depth: follow leftmost children down to a leaf
    let mut depth = 1;
    let mut page = tree.page(tree.root_page()).unwrap();
    while page.page_type().unwrap() == PageType::InteriorTable {
        assert!(page.cell_count() <= 4);
        let child = pagestore::types::entry::TableInteriorCell::from_bytes(page.cell(0).unwrap())
            .unwrap()
            .child;
        assert_eq!(tree.page(child).unwrap().parent(), Some(page.page_no()));
        page = tree.page(child).unwrap();
        depth += 1;
    }
    assert!(depth >= 4, "tree depth {}", depth);

    for row_id in [0, 1, 57, 128, 199] {
        let position = tree.locate(row_id).unwrap().unwrap();
        assert_eq!(position.row_id, row_id);
        let cell = tree.read_cell(position.page_no, position.index).unwrap();
        assert_eq!(cell.columns[0], row_id.to_be_bytes().to_vec());
    }
    assert_eq!(tree.locate(200).unwrap(), None);
}

#[test]
fn test_remove_row_compacts_leaf() {
    let temp = TempDataDir::new().unwrap();
    let mut table = temp.context.create_table_file("t").unwrap();
    for i in 0..10 {
        table.append_row(&create_test_row(i, &"v".repeat(i as usize + 1))).unwrap();
    }
    let before = table.tree().page(2).unwrap().cells().unwrap();

    assert!(table.remove_row(4).unwrap());
    assert!(!table.remove_row(4).unwrap());

    let after = table.tree().page(2).unwrap().cells().unwrap();
    let mut expected = before.clone();
    expected.remove(4);
    assert_eq!(after, expected);
    assert_eq!(table.row_count().unwrap(), 9);
    assert_eq!(table.tree().locate(4).unwrap(), None);

    // Rowids are never reused
    assert_eq!(table.append_row(&create_test_row(10, "new")).unwrap(), 10);
}

#[test]
fn test_emptied_leaf_stays_in_chain() {
    let temp = TempDataDir::new().unwrap();
    let mut table = temp.context.create_table_file("t").unwrap();
    for i in 0..100 {
        table.append_row(&create_test_row(i, "some name")).unwrap();
    }
    let leaves = table.tree().leaf_pages().unwrap();
    let first_leaf_ids: Vec<RowId> = table
        .tree()
        .page(leaves[0])
        .unwrap()
        .cells()
        .unwrap()
        .iter()
        .map(|cell| LeafCell::row_id_of(cell).unwrap())
        .collect();

    for row_id in &first_leaf_ids {
        assert!(table.remove_row(*row_id).unwrap());
    }

    assert_eq!(table.tree().leaf_pages().unwrap(), leaves);
    assert_eq!(table.tree().page(leaves[0]).unwrap().cell_count(), 0);
    let expected: Vec<RowId> = (0..100).filter(|id| !first_leaf_ids.contains(id)).collect();
    assert_eq!(chain_row_ids(&mut table), expected);
}

#[test]
fn test_seek_at_or_after() {
    let temp = TempDataDir::with_config(StorageConfig::default().with_max_cells_per_page(3)).unwrap();
    let mut table = temp.context.create_table_file("t").unwrap();
    for i in 0..20 {
        table.append_row(&create_test_row(i, "x")).unwrap();
    }
    for row_id in [5, 6, 7] {
        table.remove_row(row_id).unwrap();
    }

    let mut tree = table.tree();
    assert_eq!(tree.seek_at_or_after(5).unwrap().unwrap().row_id, 8);
    assert_eq!(tree.seek_at_or_after(0).unwrap().unwrap().row_id, 0);
    assert_eq!(tree.seek_at_or_after(19).unwrap().unwrap().row_id, 19);
    assert_eq!(tree.seek_at_or_after(20).unwrap(), None);
}

#[test]
fn test_oversized_row_does_not_consume_rowid() {
    let temp = TempDataDir::new().unwrap();
    let mut table = temp.context.create_table_file("t").unwrap();
    table.append_row(&create_test_row(0, "first")).unwrap();

    let long = Value::Text("b".repeat(127));
    let too_wide = vec![long.clone(), long.clone(), long.clone(), long];
    assert!(matches!(
        table.append_row(&too_wide),
        Err(StorageError::ValueTooLarge { .. })
    ));
    assert!(matches!(
        table.append_row(&[Value::Int(1), Value::Text("b".repeat(500))]),
        Err(StorageError::ValueTooLarge { size: 500, max: 127 })
    ));
    assert!(matches!(
        table.append_row(&[Value::Year(3000)]),
        Err(StorageError::ValueOutOfRange { .. })
    ));

    assert_eq!(table.max_row_id(), 0);
    assert_eq!(table.append_row(&create_test_row(1, "second")).unwrap(), 1);
}

#[test]
fn test_newest_row_can_be_taken_back_after_split() {
    let temp = TempDataDir::with_config(StorageConfig::default().with_max_cells_per_page(2)).unwrap();
    let mut table = temp.context.create_table_file("t").unwrap();
    for key in 0..7 {
        table.append_row(&create_test_row(key, "row")).unwrap();
    }
    assert!(table.page_count() > 3);

    let newest = table.max_row_id();
    assert_eq!(newest, 6);
    assert!(table.tree().locate(newest).unwrap().is_some());
    assert!(table.remove_row(newest).unwrap());
    assert_eq!(chain_row_ids(&mut table), (0..6).collect::<Vec<_>>());

    // The header still remembers the removed rowid, so it is never reused.
    assert_eq!(table.append_row(&create_test_row(7, "row")).unwrap(), 7);
    assert_eq!(chain_row_ids(&mut table), vec![0, 1, 2, 3, 4, 5, 7]);
}

#[test]
fn test_cells_fit_counts_pointers_and_cell_cap() {
    let capacity = Page::capacity(512);
    let exact = vec![vec![0u8; capacity - CELL_POINTER_SIZE]];
    assert!(btree::cells_fit(&exact, 512, None));

    let over = vec![vec![0u8; capacity - CELL_POINTER_SIZE + 1]];
    assert!(!btree::cells_fit(&over, 512, None));

    let small = vec![vec![0u8; 8]; 3];
    assert!(btree::cells_fit(&small, 512, Some(3)));
    assert!(!btree::cells_fit(&small, 512, Some(2)));
    assert!(btree::cells_fit(&[], 512, Some(2)));
}

#[test]
fn test_rows_survive_reopen() {
    let temp = TempDataDir::new().unwrap();
    {
        let mut table = temp.context.create_table_file("t").unwrap();
        for i in 0..200 {
            table.append_row(&create_test_row(i, "persisted")).unwrap();
        }
        table.close().unwrap();
    }

    let mut table = temp.context.open_table_file("t").unwrap();
    assert_eq!(table.max_row_id(), 199);
    assert_eq!(table.row_count().unwrap(), 200);
    assert_eq!(chain_row_ids(&mut table), (0..200).collect::<Vec<_>>());
    assert_eq!(table.append_row(&create_test_row(200, "more")).unwrap(), 200);
}

#[test]
fn test_rowid_exhaustion() {
    let temp = TempDataDir::new().unwrap();
    let path = {
        let table = temp.context.create_table_file("t").unwrap();
        table.path().to_path_buf()
    };

    // Patch the max rowid stored in the metadata page
    let mut bytes = std::fs::read(&path).unwrap();
    bytes[1..5].copy_from_slice(&(MAX_ROWID - 1).to_be_bytes());
    std::fs::write(&path, bytes).unwrap();

    let mut table = temp.context.open_table_file("t").unwrap();
    assert_eq!(table.append_row(&create_test_row(0, "last")).unwrap(), MAX_ROWID);
    assert!(matches!(
        table.append_row(&create_test_row(1, "none left")),
        Err(StorageError::RowIdExhausted)
    ));
    assert_eq!(table.max_row_id(), MAX_ROWID);
}
