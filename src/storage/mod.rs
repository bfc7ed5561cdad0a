pub mod bplus_tree;
pub mod btree;
pub mod config;
pub mod cursor;
pub mod header;
pub mod index_file;
pub mod index_tree;
pub mod paged_file;
pub mod scan;
pub mod storage_context;
pub mod table_file;
