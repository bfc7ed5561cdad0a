use pagestore::{
    StorageConfig, StorageContext,
    types::{DEFAULT_PAGE_SIZE, error::StorageError, value::DataType},
    utils::mock::TempDataDir,
};

#[test]
fn test_default_config() {
    let config = StorageConfig::default();
    assert_eq!(config.data_dir, std::path::PathBuf::from("data"));
    assert_eq!(config.table_extension, "tbl");
    assert_eq!(config.index_extension, "ndx");
    assert_eq!(config.page_size, DEFAULT_PAGE_SIZE);
    assert_eq!(config.max_cells_per_page, None);
    assert!(config.validate().is_ok());
}

#[test]
fn test_invalid_configs_are_rejected() {
    for config in [
        StorageConfig::default().with_page_size(1000),
        StorageConfig::default().with_page_size(256),
        StorageConfig::default().with_page_size(65536),
        StorageConfig::default().with_max_cells_per_page(1),
        StorageConfig::default().with_extensions("tbl", "tbl"),
        StorageConfig::default().with_extensions("", "ndx"),
        StorageConfig::default().with_extensions("t.bl", "ndx"),
    ] {
        assert!(matches!(
            config.validate(),
            Err(StorageError::InvalidConfig { .. })
        ));
    }

    let temp = tempfile::TempDir::new().unwrap();
    let config = StorageConfig::new(temp.path()).with_page_size(777);
    assert!(matches!(
        StorageContext::new(config),
        Err(StorageError::InvalidConfig { .. })
    ));
}

#[test]
fn test_context_creates_data_dir() {
    let temp = tempfile::TempDir::new().unwrap();
    let data_dir = temp.path().join("nested").join("data");
    let context = StorageContext::new(StorageConfig::new(&data_dir)).unwrap();
    assert!(data_dir.is_dir());
    assert_eq!(context.data_dir(), data_dir.as_path());
}

#[test]
fn test_file_naming() {
    let temp = TempDataDir::with_prefix("naming").unwrap();
    let context = &temp.context;

    assert_eq!(context.table_path("people").unwrap(), temp.path().join("people.tbl"));
    assert_eq!(
        context.index_path("people", "name").unwrap(),
        temp.path().join("people.name.ndx")
    );

    for name in ["", "a.b", "a/b", "a\\b"] {
        assert!(matches!(
            context.table_path(name),
            Err(StorageError::InvalidName { .. })
        ));
    }
    assert!(matches!(
        context.index_path("people", "first.name"),
        Err(StorageError::InvalidName { .. })
    ));
}

#[test]
fn test_custom_extensions() {
    let temp = TempDataDir::with_config(StorageConfig::default().with_extensions("dat", "idx")).unwrap();
    let table = temp.context.create_table_file("t").unwrap();
    assert_eq!(table.path(), temp.path().join("t.dat").as_path());
    let index = temp.context.create_index_file("t", "c", DataType::Int).unwrap();
    assert_eq!(index.path(), temp.path().join("t.c.idx").as_path());
}

#[test]
fn test_table_file_lifecycle() {
    let temp = TempDataDir::new().unwrap();
    let context = &temp.context;

    assert!(!context.table_file_exists("orders").unwrap());
    assert!(matches!(
        context.open_table_file("orders"),
        Err(StorageError::NotFound { .. })
    ));

    let table = context.create_table_file("orders").unwrap();
    assert_eq!(table.name(), "orders");
    assert_eq!(table.page_count(), 2);
    table.close().unwrap();
    assert!(context.table_file_exists("orders").unwrap());
    assert_eq!(
        std::fs::metadata(context.table_path("orders").unwrap()).unwrap().len(),
        2 * DEFAULT_PAGE_SIZE as u64
    );

    assert!(matches!(
        context.create_table_file("orders"),
        Err(StorageError::AlreadyExists { .. })
    ));

    let mut reopened = context.open_table_file("orders").unwrap();
    assert_eq!(reopened.row_count().unwrap(), 0);
    drop(reopened);

    context.delete_table_file("orders").unwrap();
    assert!(!context.table_file_exists("orders").unwrap());
    assert!(matches!(
        context.delete_table_file("orders"),
        Err(StorageError::NotFound { .. })
    ));
}

#[test]
fn test_list_table_files() {
    let temp = TempDataDir::new().unwrap();
    let context = &temp.context;
    for name in ["zebra", "apple", "mango"] {
        context.create_table_file(name).unwrap();
    }
    context.create_index_file("apple", "color", DataType::Text).unwrap();
    std::fs::write(temp.path().join("notes.txt"), b"not a table").unwrap();

    assert_eq!(context.list_table_files().unwrap(), vec!["apple", "mango", "zebra"]);
}

#[test]
fn test_index_file_lifecycle() {
    let temp = TempDataDir::new().unwrap();
    let context = &temp.context;

    assert!(matches!(
        context.create_index_file("t", "c", DataType::Null),
        Err(StorageError::InvalidValue { .. })
    ));
    assert!(matches!(
        context.open_index_file("t", "c"),
        Err(StorageError::NotFound { .. })
    ));

    let index = context.create_index_file("t", "c", DataType::Double).unwrap();
    assert_eq!(index.key_type(), DataType::Double);
    assert_eq!(index.page_count(), 2);
    drop(index);
    assert!(context.index_file_exists("t", "c").unwrap());
    assert!(matches!(
        context.create_index_file("t", "c", DataType::Double),
        Err(StorageError::AlreadyExists { .. })
    ));

    // The key type is read back from the metadata page
    let bytes = std::fs::read(context.index_path("t", "c").unwrap()).unwrap();
    assert_eq!(&bytes[1..5], &[0, 0, 0, DataType::Double.as_u8()]);
    assert_eq!(context.open_index_file("t", "c").unwrap().key_type(), DataType::Double);

    context.delete_index_file("t", "c").unwrap();
    assert!(!context.index_file_exists("t", "c").unwrap());
    assert!(matches!(
        context.delete_index_file("t", "c"),
        Err(StorageError::NotFound { .. })
    ));
}

#[test]
fn test_page_size_is_part_of_the_file() {
    let temp = TempDataDir::with_page_size(1024).unwrap();
    let mut table = temp.context.create_table_file("t").unwrap();
    for i in 0..50 {
        table.append_row(&[pagestore::Value::Int(i)]).unwrap();
    }
    drop(table);

    let other = StorageContext::new(StorageConfig::new(temp.path())).unwrap();
    assert!(other.open_table_file("t").is_err());
    let mut same = temp.context.open_table_file("t").unwrap();
    assert_eq!(same.row_count().unwrap(), 50);
}
