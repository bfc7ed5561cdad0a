use pagestore::types::{
    CELL_POINTER_SIZE, PAGE_HEADER_SIZE,
    error::StorageError,
    page::{CELL_COUNT_OFFSET, Page, PageType, RIGHT_POINTER_OFFSET, page_offset},
    row::LeafCell,
    value::Value,
};

const PAGE_SIZE: usize = 512;

fn sample_cell(row_id: i32, name: &str) -> Vec<u8> {
    LeafCell::from_values(row_id, &[Value::Int(row_id * 10), Value::from(name)])
        .unwrap()
        .to_bytes()
}

#[test]
fn test_page_offset() {
    assert_eq!(page_offset(1, PAGE_SIZE).unwrap(), 0);
    assert_eq!(page_offset(2, PAGE_SIZE).unwrap(), 512);
    assert_eq!(page_offset(3, 1024).unwrap(), 2048);
    assert!(matches!(
        page_offset(0, PAGE_SIZE),
        Err(StorageError::CorruptPage { page_no: 0, .. })
    ));
}

#[test]
fn test_page_type_codes() {
    for page_type in [
        PageType::InteriorIndex,
        PageType::InteriorTable,
        PageType::LeafIndex,
        PageType::LeafTable,
        PageType::Metadata,
    ] {
        assert_eq!(PageType::from_u8(page_type.as_u8()), Some(page_type));
    }
    assert_eq!(PageType::LeafTable.as_u8(), 0x0D);
    assert_eq!(PageType::from_u8(0x01), None);
    assert!(PageType::LeafIndex.is_leaf());
    assert!(PageType::InteriorTable.is_interior());
    assert!(!PageType::Metadata.is_leaf());
}

#[test]
fn test_empty_page_header() {
    let page = Page::new(2, PAGE_SIZE, PageType::LeafTable);

    assert_eq!(page.page_no(), 2);
    assert_eq!(page.page_type().unwrap(), PageType::LeafTable);
    assert_eq!(page.cell_count(), 0);
    assert_eq!(page.content_start(), PAGE_SIZE);
    assert_eq!(page.right_pointer(), None);
    assert_eq!(page.parent(), None);
    assert_eq!(page.free_space(), PAGE_SIZE - PAGE_HEADER_SIZE);

    let bytes = page.as_bytes();
    assert_eq!(bytes.len(), PAGE_SIZE);
    assert_eq!(bytes[0], 0x0D);
    assert_eq!(&bytes[1..3], &[0, 0]);
    assert_eq!(&bytes[3..5], &[0x02, 0x00]);
    assert_eq!(&bytes[6..10], &[0xFF; 4]);
    assert_eq!(&bytes[10..14], &[0xFF; 4]);
}

#[test]
fn test_zero_pointer_means_no_page() {
    let mut page = Page::new(2, PAGE_SIZE, PageType::LeafTable);
    page.set_right_pointer(Some(7));
    assert_eq!(page.right_pointer(), Some(7));
    page.write_u32_at(RIGHT_POINTER_OFFSET, 0);
    assert_eq!(page.right_pointer(), None);
    page.set_parent(Some(3));
    assert_eq!(page.parent(), Some(3));
}

#[test]
fn test_cell_insertion_and_retrieval() {
    let mut page = Page::new(2, PAGE_SIZE, PageType::LeafTable);
    let first = sample_cell(0, "alice");
    let second = sample_cell(1, "bob");

    assert_eq!(page.insert_cell(&first).unwrap(), 0);
    assert_eq!(page.insert_cell(&second).unwrap(), 1);

    assert_eq!(page.cell_count(), 2);
    assert_eq!(page.cell(0).unwrap(), first.as_slice());
    assert_eq!(page.cell(1).unwrap(), second.as_slice());

    // Content grows downward from the end of the page
    assert_eq!(page.cell_offset(0).unwrap(), PAGE_SIZE - first.len());
    assert_eq!(page.content_start(), PAGE_SIZE - first.len() - second.len());
    assert_eq!(
        page.free_space(),
        PAGE_SIZE - PAGE_HEADER_SIZE - 2 * CELL_POINTER_SIZE - first.len() - second.len()
    );
    assert!(page.cell(2).is_err());
}

#[test]
fn test_insert_at_position_shifts_pointers() {
    let mut page = Page::new(2, PAGE_SIZE, PageType::LeafTable);
    let a = sample_cell(0, "a");
    let b = sample_cell(1, "b");
    let c = sample_cell(2, "c");
    page.insert_cell(&a).unwrap();
    page.insert_cell(&c).unwrap();
    page.insert_cell_at(1, &b).unwrap();

    assert_eq!(page.cells().unwrap(), vec![a, b, c]);
    assert!(page.insert_cell_at(5, &sample_cell(3, "d")).is_err());
}

#[test]
fn test_remove_cell_compacts_and_preserves_others() {
    let mut page = Page::new(2, PAGE_SIZE, PageType::LeafTable);
    let cells: Vec<Vec<u8>> = (0..5).map(|i| sample_cell(i, &"x".repeat(i as usize + 1))).collect();
    for cell in &cells {
        page.insert_cell(cell).unwrap();
    }
    let free_before = page.free_space();

    page.remove_cell(2).unwrap();

    assert_eq!(page.cell_count(), 4);
    let remaining = page.cells().unwrap();
    assert_eq!(remaining, vec![cells[0].clone(), cells[1].clone(), cells[3].clone(), cells[4].clone()]);
    assert_eq!(page.free_space(), free_before + cells[2].len() + CELL_POINTER_SIZE);

    let used: usize = remaining.iter().map(Vec::len).sum();
    assert_eq!(page.content_start(), PAGE_SIZE - used);

    // The page still parses after the shuffle
    let reparsed = Page::from_bytes(2, page.as_bytes().to_vec()).unwrap();
    assert_eq!(reparsed.cells().unwrap(), remaining);
}

#[test]
fn test_remove_every_cell_restores_empty_page() {
    let mut page = Page::new(2, PAGE_SIZE, PageType::LeafTable);
    for i in 0..3 {
        page.insert_cell(&sample_cell(i, "row")).unwrap();
    }
    while page.cell_count() > 0 {
        page.remove_cell(0).unwrap();
    }
    assert_eq!(page.content_start(), PAGE_SIZE);
    assert_eq!(page.free_space(), PAGE_SIZE - PAGE_HEADER_SIZE);
}

#[test]
fn test_overwrite_cell_requires_same_length() {
    let mut page = Page::new(2, PAGE_SIZE, PageType::LeafTable);
    page.insert_cell(&sample_cell(0, "abc")).unwrap();

    let replacement = sample_cell(0, "xyz");
    page.overwrite_cell(0, &replacement).unwrap();
    assert_eq!(page.cell(0).unwrap(), replacement.as_slice());

    assert!(matches!(
        page.overwrite_cell(0, &sample_cell(0, "longer")),
        Err(StorageError::CorruptPage { .. })
    ));
}

#[test]
fn test_page_full() {
    let mut page = Page::new(2, PAGE_SIZE, PageType::LeafTable);
    let cell = sample_cell(0, &"z".repeat(100));
    let mut inserted = 0;
    while page.can_fit(cell.len()) {
        page.insert_cell(&cell).unwrap();
        inserted += 1;
    }
    assert_eq!(inserted, (PAGE_SIZE - PAGE_HEADER_SIZE) / (cell.len() + CELL_POINTER_SIZE));
    assert!(matches!(
        page.insert_cell(&cell),
        Err(StorageError::PageFull { page_no: 2 })
    ));
}

#[test]
fn test_from_bytes_round_trip() {
    let mut page = Page::new(4, PAGE_SIZE, PageType::LeafTable);
    page.set_parent(Some(3));
    page.set_right_pointer(Some(5));
    page.insert_cell(&sample_cell(10, "ten")).unwrap();

    let reparsed = Page::from_bytes(4, page.as_bytes().to_vec()).unwrap();
    assert_eq!(reparsed, page);
    assert_eq!(reparsed.parent(), Some(3));
    assert_eq!(reparsed.right_pointer(), Some(5));
}

#[test]
fn test_from_bytes_rejects_corruption() {
    let page = Page::new(2, PAGE_SIZE, PageType::LeafTable);

    let mut bad_type = page.as_bytes().to_vec();
    bad_type[0] = 0x42;
    assert!(matches!(
        Page::from_bytes(2, bad_type),
        Err(StorageError::CorruptPage { page_no: 2, .. })
    ));

    let mut overlapping = page.clone();
    overlapping.write_u16_at(CELL_COUNT_OFFSET, 300);
    assert!(matches!(
        Page::from_bytes(2, overlapping.as_bytes().to_vec()),
        Err(StorageError::CorruptPage { .. })
    ));
}

#[test]
fn test_interior_and_index_cell_lengths() {
    use pagestore::types::entry::{IndexInteriorCell, IndexLeafCell, TableInteriorCell};

    let mut interior = Page::new(3, PAGE_SIZE, PageType::InteriorTable);
    interior.insert_cell(&TableInteriorCell::new(2, 41).to_bytes()).unwrap();
    assert_eq!(interior.cell(0).unwrap().len(), TableInteriorCell::SIZE);

    let mut leaf = Page::new(2, PAGE_SIZE, PageType::LeafIndex);
    let cell = IndexLeafCell::new(b"abc".to_vec(), vec![1, 2, 3]);
    leaf.insert_cell(&cell.to_bytes()).unwrap();
    assert_eq!(leaf.cell(0).unwrap().len(), cell.size());

    let mut index_interior = Page::new(4, PAGE_SIZE, PageType::InteriorIndex);
    let separator = IndexInteriorCell::new(2, b"abc".to_vec(), 1);
    index_interior.insert_cell(&separator.to_bytes()).unwrap();
    assert_eq!(index_interior.cell(0).unwrap().len(), separator.size());
}
