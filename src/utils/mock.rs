use std::path::Path;

use tempfile::{Builder, TempDir};

use crate::{
    storage::{config::StorageConfig, storage_context::StorageContext},
    types::error::Result,
};

const DEFAULT_PREFIX: &str = "pagestore_test";

/// A throwaway data directory with a storage context rooted in it. The
/// directory and every file in it are removed on drop.
pub struct TempDataDir {
    dir: TempDir,
    pub context: StorageContext,
}

impl TempDataDir {
    pub fn new() -> Result<Self> {
        Self::with_prefix(DEFAULT_PREFIX)
    }

    pub fn with_prefix(prefix: &str) -> Result<Self> {
        Self::build(prefix, StorageConfig::default())
    }

    pub fn with_page_size(page_size: usize) -> Result<Self> {
        Self::with_config(StorageConfig::default().with_page_size(page_size))
    }

    /// Use `config` for everything but the data directory.
    pub fn with_config(config: StorageConfig) -> Result<Self> {
        Self::build(DEFAULT_PREFIX, config)
    }

    fn build(prefix: &str, mut config: StorageConfig) -> Result<Self> {
        let dir = Builder::new().prefix(prefix).tempdir()?;
        config.data_dir = dir.path().to_path_buf();
        let context = StorageContext::new(config)?;
        Ok(Self { dir, context })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}
