use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use ahash::AHashMap;

use super::error::{HeapError, HeapResult};
use super::metadata::HeapFileMetadata;
use super::{HEAP_CAPACITY_BYTES, PAGE_SIZE_BYTES};
use crate::table::{Page, unix_now};

/// Handle to an open heap file. Handles are never reused within a
/// manager's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileHandle(usize);

impl FileHandle {
    pub fn as_usize(&self) -> usize {
        self.0
    }
}

/// Address of one page slot: an open file plus a 1-based page number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageId {
    pub file: FileHandle,
    pub page_no: u64,
}

struct HeapFileEntry {
    file: File,
    name: String,
    meta_path: PathBuf,
    metadata: HeapFileMetadata,
}

/// Manages heap files in a storage directory: fixed-size page slots in a
/// data file plus a JSON metadata sidecar per file.
///
/// Page numbering is 1-based; a page lives at byte offset
/// `page_no * page_size` and slot 0 is never written.
pub struct HeapFileManager {
    storage_dir: PathBuf,
    heap_capacity: u64,
    page_size: usize,
    /// Map from file handles to open files
    open_files: AHashMap<FileHandle, HeapFileEntry>,
    /// Map from file names to handles (for checking if already open)
    name_to_handle: AHashMap<String, FileHandle>,
    /// Next available file handle
    next_handle: usize,
}

impl HeapFileManager {
    /// Create a new heap file manager with default capacity and page size
    pub fn new<P: AsRef<Path>>(storage_dir: P) -> Self {
        Self::with_capacity(storage_dir, HEAP_CAPACITY_BYTES, PAGE_SIZE_BYTES)
    }

    /// Create a new heap file manager with specified capacity and page size
    pub fn with_capacity<P: AsRef<Path>>(
        storage_dir: P,
        heap_capacity: u64,
        page_size: usize,
    ) -> Self {
        Self {
            storage_dir: storage_dir.as_ref().to_path_buf(),
            heap_capacity,
            page_size,
            open_files: AHashMap::new(),
            name_to_handle: AHashMap::new(),
            next_handle: 0,
        }
    }

    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    fn data_path(&self, name: &str) -> PathBuf {
        self.storage_dir.join(format!("{name}.heap"))
    }

    fn meta_path(&self, name: &str) -> PathBuf {
        self.storage_dir.join(format!("{name}.meta"))
    }

    fn entry(&self, handle: FileHandle) -> HeapResult<&HeapFileEntry> {
        self.open_files
            .get(&handle)
            .ok_or(HeapError::InvalidHandle(handle.0))
    }

    fn entry_mut(&mut self, handle: FileHandle) -> HeapResult<&mut HeapFileEntry> {
        self.open_files
            .get_mut(&handle)
            .ok_or(HeapError::InvalidHandle(handle.0))
    }

    fn register(&mut self, name: &str, entry: HeapFileEntry) -> FileHandle {
        let handle = FileHandle(self.next_handle);
        self.next_handle += 1;
        self.open_files.insert(handle, entry);
        self.name_to_handle.insert(name.to_string(), handle);
        handle
    }

    /// Create a heap file. Idempotent: if the file is already open the
    /// existing handle is returned; if it exists on disk it is re-opened
    /// and its metadata loaded.
    pub fn create(&mut self, name: &str) -> HeapResult<(FileHandle, HeapFileMetadata)> {
        if name.trim().is_empty() {
            return Err(HeapError::EmptyFileName);
        }

        if let Some(&handle) = self.name_to_handle.get(name) {
            let metadata = self.entry(handle)?.metadata.clone();
            return Ok((handle, metadata));
        }

        if self.exists(name) {
            return self.open(name);
        }

        fs::create_dir_all(&self.storage_dir)?;

        let data_path = self.data_path(name);
        let meta_path = self.meta_path(name);
        let metadata = HeapFileMetadata::new(data_path.clone(), self.heap_capacity);
        write_metadata(&meta_path, &metadata)?;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&data_path)?;

        let handle = self.register(
            name,
            HeapFileEntry {
                file,
                name: name.to_string(),
                meta_path,
                metadata: metadata.clone(),
            },
        );

        Ok((handle, metadata))
    }

    /// Open an existing heap file; fails with a not-found error if either
    /// the data file or the metadata sidecar is missing
    pub fn open(&mut self, name: &str) -> HeapResult<(FileHandle, HeapFileMetadata)> {
        if name.trim().is_empty() {
            return Err(HeapError::EmptyFileName);
        }

        if let Some(&handle) = self.name_to_handle.get(name) {
            let metadata = self.entry(handle)?.metadata.clone();
            return Ok((handle, metadata));
        }

        if !self.exists(name) {
            return Err(HeapError::FileNotFound(name.to_string()));
        }

        let meta_path = self.meta_path(name);
        let metadata: HeapFileMetadata = serde_json::from_str(&fs::read_to_string(&meta_path)?)?;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(self.data_path(name))?;

        let handle = self.register(
            name,
            HeapFileEntry {
                file,
                name: name.to_string(),
                meta_path,
                metadata: metadata.clone(),
            },
        );

        Ok((handle, metadata))
    }

    /// Close a heap file, persisting its metadata. Closing a file that is
    /// not open succeeds silently.
    pub fn close(&mut self, name: &str) -> HeapResult<()> {
        if let Some(handle) = self.name_to_handle.remove(name) {
            if let Some(entry) = self.open_files.remove(&handle) {
                write_metadata(&entry.meta_path, &entry.metadata)?;
            }
        }
        Ok(())
    }

    /// Delete a heap file and its metadata sidecar. Safe to call on a
    /// non-existent file (idempotent cleanup).
    pub fn delete(&mut self, name: &str) -> HeapResult<()> {
        if let Some(handle) = self.name_to_handle.remove(name) {
            self.open_files.remove(&handle);
        }

        for path in [self.data_path(name), self.meta_path(name)] {
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(HeapError::Io(e)),
            }
        }
        Ok(())
    }

    /// Check if a heap file exists on disk
    pub fn exists(&self, name: &str) -> bool {
        self.data_path(name).exists() && self.meta_path(name).exists()
    }

    /// Handle of an open file, if any
    pub fn handle_of(&self, name: &str) -> Option<FileHandle> {
        self.name_to_handle.get(name).copied()
    }

    /// Allocate the next page slot, bumping `last_page_id` and `page_count`.
    /// Allocation is metadata-only; the slot is written by `write_page`.
    pub fn allocate_page(&mut self, handle: FileHandle) -> HeapResult<PageId> {
        let page_size = self.page_size as u64;
        let heap_capacity = self.heap_capacity;
        let entry = self.entry_mut(handle)?;

        let page_no = entry.metadata.last_page_id + 1;
        // 1-based numbering: slot 0 exists but is never used
        if (page_no + 1) * page_size > heap_capacity {
            return Err(HeapError::HeapFull {
                file: entry.name.clone(),
                capacity: heap_capacity,
            });
        }

        entry.metadata.last_page_id = page_no;
        entry.metadata.page_count += 1;
        entry.metadata.last_modified_at = unix_now();
        write_metadata(&entry.meta_path, &entry.metadata)?;

        Ok(PageId {
            file: handle,
            page_no,
        })
    }

    /// Read one page from its slot. Fails for page number 0, for pages
    /// past `last_page_id`, and for slots that were allocated but never
    /// written (all-zero slot).
    pub fn read_page(&mut self, page_id: PageId) -> HeapResult<Page> {
        let page_size = self.page_size;
        let entry = self.entry_mut(page_id.file)?;

        if page_id.page_no == 0 {
            return Err(HeapError::InvalidPageId);
        }
        if page_id.page_no > entry.metadata.last_page_id {
            return Err(HeapError::PageNotFound {
                file: entry.name.clone(),
                page_no: page_id.page_no,
                last_page_id: entry.metadata.last_page_id,
            });
        }

        let mut buffer = vec![0u8; page_size];
        let offset = page_id.page_no * page_size as u64;
        entry.file.seek(SeekFrom::Start(offset))?;
        let mut read = 0;
        while read < page_size {
            let n = entry.file.read(&mut buffer[read..])?;
            if n == 0 {
                break;
            }
            read += n;
        }
        // A short read means the slot was past EOF; the rest stays zeroed

        let end = buffer
            .iter()
            .rposition(|&b| b != 0)
            .ok_or_else(|| HeapError::EmptyPage {
                file: entry.name.clone(),
                page_no: page_id.page_no,
            })?;

        let mut page: Page = serde_json::from_slice(&buffer[..=end])?;
        page.touch_accessed();
        Ok(page)
    }

    /// Write one page into its slot, zero-padding to the page size.
    /// The page must have been allocated first, and its serialized form
    /// must fit in one slot.
    pub fn write_page(&mut self, page_id: PageId, page: &Page) -> HeapResult<()> {
        let page_size = self.page_size;
        let entry = self.entry_mut(page_id.file)?;

        if page_id.page_no == 0 {
            return Err(HeapError::InvalidPageId);
        }
        if page_id.page_no > entry.metadata.last_page_id {
            return Err(HeapError::PageNotFound {
                file: entry.name.clone(),
                page_no: page_id.page_no,
                last_page_id: entry.metadata.last_page_id,
            });
        }

        let bytes = serde_json::to_vec(page)?;
        if bytes.len() > page_size {
            return Err(HeapError::PageOversize {
                size: bytes.len(),
                max: page_size,
            });
        }

        let mut slot = vec![0u8; page_size];
        slot[..bytes.len()].copy_from_slice(&bytes);

        let offset = page_id.page_no * page_size as u64;
        let required = offset + page_size as u64;
        if entry.file.metadata()?.len() < required {
            entry.file.set_len(required)?;
        }

        entry.file.seek(SeekFrom::Start(offset))?;
        entry.file.write_all(&slot)?;

        entry.metadata.last_modified_at = unix_now();
        write_metadata(&entry.meta_path, &entry.metadata)?;

        Ok(())
    }

    /// Sync all open data files to disk
    pub fn sync_all(&mut self) -> HeapResult<()> {
        for entry in self.open_files.values_mut() {
            entry.file.sync_data()?;
        }
        Ok(())
    }

    /// Metadata of an open file
    pub fn metadata(&self, handle: FileHandle) -> HeapResult<&HeapFileMetadata> {
        Ok(&self.entry(handle)?.metadata)
    }

    /// Name of an open file
    pub fn file_name(&self, handle: FileHandle) -> HeapResult<&str> {
        Ok(&self.entry(handle)?.name)
    }

    /// Number of allocated pages in an open file
    pub fn page_count(&self, handle: FileHandle) -> HeapResult<u64> {
        Ok(self.entry(handle)?.metadata.page_count)
    }

    /// Number of currently open files
    pub fn open_file_count(&self) -> usize {
        self.open_files.len()
    }
}

fn write_metadata(path: &Path, metadata: &HeapFileMetadata) -> HeapResult<()> {
    fs::write(path, serde_json::to_string_pretty(metadata)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Tuple;
    use tempfile::TempDir;

    fn setup_manager() -> (TempDir, HeapFileManager) {
        let temp_dir = tempfile::tempdir().unwrap();
        let manager = HeapFileManager::new(temp_dir.path());
        (temp_dir, manager)
    }

    fn sample_page(page_no: u64) -> Page {
        let mut page = Page::new(page_no);
        page.push(Tuple::from_strs(&["1", "Brazil", "BR"])).unwrap();
        page.push(Tuple::from_strs(&["2", "Chile", "CL"])).unwrap();
        page
    }

    #[test]
    fn test_create_writes_data_and_sidecar() {
        let (temp_dir, mut manager) = setup_manager();
        manager.create("pais").unwrap();

        assert!(temp_dir.path().join("pais.heap").exists());
        assert!(temp_dir.path().join("pais.meta").exists());
        assert!(manager.exists("pais"));
    }

    #[test]
    fn test_create_is_idempotent_when_open() {
        let (_temp_dir, mut manager) = setup_manager();
        let (handle1, _) = manager.create("pais").unwrap();
        let (handle2, _) = manager.create("pais").unwrap();

        assert_eq!(handle1, handle2);
        assert_eq!(manager.open_file_count(), 1);
    }

    #[test]
    fn test_create_reopens_existing_file() {
        let (_temp_dir, mut manager) = setup_manager();
        let (handle, _) = manager.create("pais").unwrap();
        manager.allocate_page(handle).unwrap();
        manager.close("pais").unwrap();

        let (_, metadata) = manager.create("pais").unwrap();
        assert_eq!(metadata.last_page_id, 1);
        assert_eq!(metadata.page_count, 1);
    }

    #[test]
    fn test_open_nonexistent_file() {
        let (_temp_dir, mut manager) = setup_manager();
        let result = manager.open("missing");
        assert!(matches!(result, Err(HeapError::FileNotFound(_))));
    }

    #[test]
    fn test_close_not_open_is_silent() {
        let (_temp_dir, mut manager) = setup_manager();
        assert!(manager.close("never-opened").is_ok());
    }

    #[test]
    fn test_delete_is_idempotent() {
        let (_temp_dir, mut manager) = setup_manager();
        manager.create("pais").unwrap();
        manager.delete("pais").unwrap();
        assert!(!manager.exists("pais"));
        // Second delete of a missing file is still a success
        manager.delete("pais").unwrap();
    }

    #[test]
    fn test_empty_file_name() {
        let (_temp_dir, mut manager) = setup_manager();
        assert!(matches!(manager.create("  "), Err(HeapError::EmptyFileName)));
        assert!(matches!(manager.open(""), Err(HeapError::EmptyFileName)));
    }

    #[test]
    fn test_write_read_round_trip() {
        let (_temp_dir, mut manager) = setup_manager();
        let (handle, _) = manager.create("pais").unwrap();

        let page_id = manager.allocate_page(handle).unwrap();
        let page = sample_page(page_id.page_no);
        manager.write_page(page_id, &page).unwrap();

        let loaded = manager.read_page(page_id).unwrap();
        assert_eq!(loaded.tuples(), page.tuples());
        assert_eq!(loaded.page_no(), 1);
    }

    #[test]
    fn test_write_unallocated_page_fails() {
        let (_temp_dir, mut manager) = setup_manager();
        let (handle, _) = manager.create("pais").unwrap();

        let page_id = PageId { file: handle, page_no: 1 };
        let result = manager.write_page(page_id, &sample_page(1));
        assert!(matches!(result, Err(HeapError::PageNotFound { .. })));
    }

    #[test]
    fn test_page_zero_is_invalid() {
        let (_temp_dir, mut manager) = setup_manager();
        let (handle, _) = manager.create("pais").unwrap();
        manager.allocate_page(handle).unwrap();

        let page_id = PageId { file: handle, page_no: 0 };
        assert!(matches!(
            manager.read_page(page_id),
            Err(HeapError::InvalidPageId)
        ));
        assert!(matches!(
            manager.write_page(page_id, &sample_page(0)),
            Err(HeapError::InvalidPageId)
        ));
    }

    #[test]
    fn test_read_allocated_but_unwritten_page() {
        let (_temp_dir, mut manager) = setup_manager();
        let (handle, _) = manager.create("pais").unwrap();
        let page_id = manager.allocate_page(handle).unwrap();

        let result = manager.read_page(page_id);
        assert!(matches!(result, Err(HeapError::EmptyPage { .. })));
    }

    #[test]
    fn test_oversize_page_rejected() {
        let (_temp_dir, mut manager) = setup_manager();
        let (handle, _) = manager.create("pais").unwrap();
        let page_id = manager.allocate_page(handle).unwrap();

        let mut page = Page::new(1);
        page.push(Tuple::new(vec!["x".repeat(PAGE_SIZE_BYTES)])).unwrap();

        let result = manager.write_page(page_id, &page);
        assert!(matches!(result, Err(HeapError::PageOversize { .. })));
    }

    #[test]
    fn test_heap_capacity_enforced() {
        let temp_dir = tempfile::tempdir().unwrap();
        // Room for slot 0 plus exactly two pages
        let mut manager =
            HeapFileManager::with_capacity(temp_dir.path(), 3 * PAGE_SIZE_BYTES as u64, PAGE_SIZE_BYTES);
        let (handle, _) = manager.create("tiny").unwrap();

        manager.allocate_page(handle).unwrap();
        manager.allocate_page(handle).unwrap();
        let result = manager.allocate_page(handle);
        assert!(matches!(result, Err(HeapError::HeapFull { .. })));
    }

    #[test]
    fn test_metadata_persists_across_reopen() {
        let (_temp_dir, mut manager) = setup_manager();
        let (handle, _) = manager.create("pais").unwrap();

        let page_id = manager.allocate_page(handle).unwrap();
        manager.write_page(page_id, &sample_page(1)).unwrap();
        manager.close("pais").unwrap();

        let (handle, metadata) = manager.open("pais").unwrap();
        assert_eq!(metadata.last_page_id, 1);
        assert_eq!(manager.page_count(handle).unwrap(), 1);

        let loaded = manager
            .read_page(PageId { file: handle, page_no: 1 })
            .unwrap();
        assert_eq!(loaded.tuple_count(), 2);
    }

    #[test]
    fn test_handles_not_reused() {
        let (_temp_dir, mut manager) = setup_manager();
        let (handle1, _) = manager.create("a").unwrap();
        manager.delete("a").unwrap();
        let (handle2, _) = manager.create("b").unwrap();
        assert_ne!(handle1, handle2);
    }
}
