use std::{
    collections::HashMap,
    fs::{self, File, OpenOptions},
    io::{ErrorKind, Read, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
};

use log::{debug, trace, warn};

use crate::{
    storage::header::FileHeader,
    types::{
        METADATA_PAGE_NO, PageNo,
        error::{Result, StorageError},
        page::{Page, PageType, page_offset},
    },
};

/// A file of fixed-size pages with page 1 as the metadata page.
///
/// Owns the only handle to the file. Writes go straight through to disk;
/// the cache only saves re-reading pages.
pub struct PagedFile {
    path: PathBuf,
    file: File,
    page_size: usize,
    page_count: PageNo,
    header: FileHeader,
    page_cache: HashMap<PageNo, Page>,
    cache_capacity: usize,
}

impl PagedFile {
    /// Create a new file holding the metadata page and one empty root page.
    pub fn create<P: AsRef<Path>>(
        path: P,
        page_size: usize,
        root_type: PageType,
        header: FileHeader,
        cache_capacity: usize,
    ) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|e| match e.kind() {
                ErrorKind::AlreadyExists => StorageError::AlreadyExists {
                    path: path.to_path_buf(),
                },
                _ => StorageError::Io(e),
            })?;

        let mut paged_file = Self {
            path: path.to_path_buf(),
            file,
            page_size,
            page_count: 0,
            header,
            page_cache: HashMap::new(),
            cache_capacity,
        };
        if let Err(e) = paged_file.initialize(root_type) {
            drop(paged_file);
            if let Err(remove_err) = fs::remove_file(path) {
                warn!("Failed to remove partial file {}: {}", path.display(), remove_err);
            }
            return Err(e);
        }
        debug!("Created {} ({} byte pages)", path.display(), page_size);
        Ok(paged_file)
    }

    /// Write the metadata page and the empty root of a new file.
    fn initialize(&mut self, root_type: PageType) -> Result<()> {
        let metadata = self.header.to_page();
        self.write_page(&metadata)?;
        let root = self.allocate_page(root_type, None)?;
        if root.page_no() != self.header.root_page {
            return Err(StorageError::corrupt(
                root.page_no(),
                format!(
                    "root allocated at page {}, header expects {}",
                    root.page_no(),
                    self.header.root_page
                ),
            ));
        }
        self.file.flush()?;
        Ok(())
    }

    pub fn open<P: AsRef<Path>>(path: P, page_size: usize, cache_capacity: usize) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => StorageError::NotFound {
                    path: path.to_path_buf(),
                },
                _ => StorageError::Io(e),
            })?;

        let file_size = file.metadata()?.len();
        if file_size % page_size as u64 != 0 || file_size < 2 * page_size as u64 {
            return Err(StorageError::corrupt(
                METADATA_PAGE_NO,
                format!(
                    "file size {} is not a whole number (>= 2) of {}-byte pages",
                    file_size, page_size
                ),
            ));
        }
        let page_count = (file_size / page_size as u64) as PageNo;

        let mut paged_file = Self {
            path: path.to_path_buf(),
            file,
            page_size,
            page_count,
            header: FileHeader::new_table(METADATA_PAGE_NO + 1, page_size),
            page_cache: HashMap::new(),
            cache_capacity,
        };
        let metadata = paged_file.read_page(METADATA_PAGE_NO)?;
        paged_file.header = FileHeader::from_page(&metadata)?;
        if paged_file.header.root_page > page_count {
            return Err(StorageError::corrupt(
                METADATA_PAGE_NO,
                format!("root page {} beyond {} pages", paged_file.header.root_page, page_count),
            ));
        }
        debug!("Opened {} ({} pages)", path.display(), page_count);
        Ok(paged_file)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn page_count(&self) -> PageNo {
        self.page_count
    }

    pub fn contains_page(&self, page_no: PageNo) -> bool {
        page_no >= 1 && page_no <= self.page_count
    }

    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    /// Persist a new metadata page, then adopt it in memory.
    pub fn write_header(&mut self, header: FileHeader) -> Result<()> {
        self.write_page(&header.to_page())?;
        self.header = header;
        Ok(())
    }

    pub fn read_page(&mut self, page_no: PageNo) -> Result<Page> {
        if let Some(page) = self.page_cache.get(&page_no) {
            return Ok(page.clone());
        }
        if !self.contains_page(page_no) {
            return Err(StorageError::corrupt(
                page_no,
                format!("page beyond end of file ({} pages)", self.page_count),
            ));
        }
        let mut buffer = vec![0u8; self.page_size];
        self.file
            .seek(SeekFrom::Start(page_offset(page_no, self.page_size)?))?;
        self.file.read_exact(&mut buffer)?;
        let page = Page::from_bytes(page_no, buffer)?;
        self.cache(page.clone());
        Ok(page)
    }

    pub fn write_page(&mut self, page: &Page) -> Result<()> {
        let page_no = page.page_no();
        if page.page_size() != self.page_size {
            return Err(StorageError::corrupt(
                page_no,
                format!("{}-byte page written to {}-byte file", page.page_size(), self.page_size),
            ));
        }
        if page_no == 0 || page_no > self.page_count + 1 {
            return Err(StorageError::corrupt(page_no, "write would leave a hole in the file"));
        }
        self.file
            .seek(SeekFrom::Start(page_offset(page_no, self.page_size)?))?;
        self.file.write_all(page.as_bytes())?;
        self.file.flush()?;
        if page_no > self.page_count {
            self.page_count = page_no;
        }
        trace!("Wrote page {} of {}", page_no, self.path.display());
        self.cache(page.clone());
        Ok(())
    }

    /// Append an empty page of the given type at the end of the file.
    pub fn allocate_page(&mut self, page_type: PageType, parent: Option<PageNo>) -> Result<Page> {
        let page_no = self.page_count + 1;
        let mut page = Page::new(page_no, self.page_size, page_type);
        page.set_parent(parent);
        self.write_page(&page)?;
        debug!(
            "Allocated {:?} page {} in {}",
            page_type,
            page_no,
            self.path.display()
        );
        Ok(page)
    }

    pub fn sync(&mut self) -> Result<()> {
        self.file.sync_all()?;
        Ok(())
    }

    fn cache(&mut self, page: Page) {
        if self.cache_capacity == 0 {
            return;
        }
        if self.page_cache.len() >= self.cache_capacity && !self.page_cache.contains_key(&page.page_no()) {
            self.page_cache.clear();
        }
        self.page_cache.insert(page.page_no(), page);
    }
}
