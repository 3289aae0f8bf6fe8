use std::path::{Path, PathBuf};

use super::error::{TableError, TableResult};
use super::page::Page;
use super::tuple::Tuple;
use super::PAGE_CAPACITY;
use crate::buffer::BufferPool;
use crate::heap::{FileHandle, PageId};

/// Handle to a heap-file-backed table (sorted runs, join output).
/// The heap file stores pages; column names live in memory only.
#[derive(Debug, Clone)]
pub struct HeapTable {
    name: String,
    columns: Vec<String>,
    file: FileHandle,
    page_count: u64,
}

impl HeapTable {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn file(&self) -> FileHandle {
        self.file
    }

    pub fn page_count(&self) -> u64 {
        self.page_count
    }

    /// Cursor over the table's pages, front to back
    pub fn cursor(&self) -> PageCursor {
        PageCursor {
            file: self.file,
            next_page: 1,
            last_page: self.page_count,
        }
    }

    /// Write the table as delimited text: a header row of column names
    /// followed by one row per tuple. Returns the written path.
    pub fn export_csv(&self, pool: &mut BufferPool, dir: &Path) -> TableResult<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(format!("{}.csv", self.name));
        let mut writer = csv::Writer::from_path(&path)?;

        writer.write_record(&self.columns)?;
        let mut cursor = self.cursor();
        while let Some(page) = cursor.next_page(pool)? {
            for tuple in page.tuples() {
                writer.write_record(tuple.columns())?;
            }
        }
        writer.flush()?;

        Ok(path)
    }

    /// Delete the backing heap file (idempotent)
    pub fn delete(&self, pool: &mut BufferPool) -> TableResult<()> {
        pool.delete_file(&self.name)?;
        Ok(())
    }
}

/// Scans a heap table one page at a time through the buffer pool.
/// Each page is pinned, cloned out, and unpinned immediately, so the
/// cursor holds at most one frame pinned at a time.
pub struct PageCursor {
    file: FileHandle,
    next_page: u64,
    last_page: u64,
}

impl PageCursor {
    /// Load the next page, or `None` past the end
    pub fn next_page(&mut self, pool: &mut BufferPool) -> TableResult<Option<Page>> {
        if self.next_page > self.last_page {
            return Ok(None);
        }

        let page_id = PageId {
            file: self.file,
            page_no: self.next_page,
        };
        let page = pool.pin_page(page_id)?;
        pool.unpin_page(page_id)?;
        self.next_page += 1;

        Ok(Some(page))
    }
}

/// Appends tuples to a fresh heap file, flushing one full page at a time.
/// Freshly allocated pages are written straight through the file manager;
/// they are never already cached.
pub struct HeapTableWriter {
    name: String,
    columns: Vec<String>,
    file: FileHandle,
    buffer: Vec<Tuple>,
    pages_written: u64,
}

impl HeapTableWriter {
    /// Create a writer over a fresh heap file, replacing any stale file
    /// of the same name
    pub fn create(pool: &mut BufferPool, name: &str, columns: Vec<String>) -> TableResult<Self> {
        if name.trim().is_empty() {
            return Err(TableError::EmptyTableName);
        }

        pool.delete_file(name)?;
        let (file, _) = pool.file_manager_mut().create(name)?;

        Ok(Self {
            name: name.to_string(),
            columns,
            file,
            buffer: Vec::with_capacity(PAGE_CAPACITY),
            pages_written: 0,
        })
    }

    /// Buffer one tuple, flushing a full page when the buffer reaches
    /// page capacity
    pub fn append(&mut self, pool: &mut BufferPool, tuple: Tuple) -> TableResult<()> {
        self.buffer.push(tuple);
        if self.buffer.len() >= PAGE_CAPACITY {
            self.flush_buffer(pool)?;
        }
        Ok(())
    }

    /// Pages flushed so far (excludes the partially filled buffer)
    pub fn pages_written(&self) -> u64 {
        self.pages_written
    }

    /// Flush any buffered remainder and return the finished table
    pub fn finish(mut self, pool: &mut BufferPool) -> TableResult<HeapTable> {
        if !self.buffer.is_empty() {
            self.flush_buffer(pool)?;
        }

        Ok(HeapTable {
            name: self.name,
            columns: self.columns,
            file: self.file,
            page_count: self.pages_written,
        })
    }

    fn flush_buffer(&mut self, pool: &mut BufferPool) -> TableResult<()> {
        let manager = pool.file_manager_mut();
        let page_id = manager.allocate_page(self.file)?;
        let page = Page::with_tuples(page_id.page_no, std::mem::take(&mut self.buffer))?;
        manager.write_page(page_id, &page)?;
        self.pages_written += 1;
        self.buffer = Vec::with_capacity(PAGE_CAPACITY);
        Ok(())
    }
}
