mod error;

pub use error::{BufferError, BufferResult};

use lru::LruCache;

use crate::heap::{HeapFileManager, PageId};
use crate::table::Page;

/// Default number of frames in the buffer pool
pub const BUFFER_POOL_FRAMES: usize = 4;

/// One cached page plus its pin count and dirty flag
struct Frame {
    page: Page,
    pin_count: u32,
    dirty: bool,
}

/// A bounded page cache with pure LRU eviction over unpinned frames.
///
/// Recency is updated only by `pin_page`. The capacity is fixed at
/// construction: when every frame is pinned, pinning another page fails
/// rather than blocking or growing.
pub struct BufferPool {
    /// Underlying heap file store
    file_manager: HeapFileManager,
    /// Frames in recency order; capacity is enforced here, not by the
    /// cache itself, so it never auto-evicts a pinned frame
    frames: LruCache<PageId, Frame>,
    capacity: usize,
}

impl BufferPool {
    /// Create a buffer pool with the default frame count
    pub fn new(file_manager: HeapFileManager) -> Self {
        Self::with_capacity(file_manager, BUFFER_POOL_FRAMES)
    }

    /// Create a buffer pool with the specified frame count
    pub fn with_capacity(file_manager: HeapFileManager, capacity: usize) -> Self {
        Self {
            file_manager,
            frames: LruCache::unbounded(),
            capacity,
        }
    }

    /// Get a reference to the file manager
    pub fn file_manager(&self) -> &HeapFileManager {
        &self.file_manager
    }

    /// Get a mutable reference to the file manager
    pub fn file_manager_mut(&mut self) -> &mut HeapFileManager {
        &mut self.file_manager
    }

    /// Pin a page, loading it from the heap store on a miss. The caller
    /// must `unpin_page` when done; a pinned frame is never evicted.
    pub fn pin_page(&mut self, page_id: PageId) -> BufferResult<Page> {
        if let Some(frame) = self.frames.get_mut(&page_id) {
            frame.pin_count += 1;
            return Ok(frame.page.clone());
        }

        if self.frames.len() >= self.capacity {
            self.evict_lru_unpinned()?;
        }

        let page = self.file_manager.read_page(page_id)?;
        self.frames.put(
            page_id,
            Frame {
                page: page.clone(),
                pin_count: 1,
                dirty: false,
            },
        );
        Ok(page)
    }

    /// Release one pin on a cached page
    pub fn unpin_page(&mut self, page_id: PageId) -> BufferResult<()> {
        let frame = self
            .frames
            .peek_mut(&page_id)
            .ok_or(BufferError::PageNotCached { page_id })?;

        debug_assert!(frame.pin_count > 0, "unpin of an unpinned page");
        frame.pin_count = frame.pin_count.saturating_sub(1);
        Ok(())
    }

    /// Mark a cached page as modified. Does not touch recency.
    pub fn mark_dirty(&mut self, page_id: PageId) -> BufferResult<()> {
        let frame = self
            .frames
            .peek_mut(&page_id)
            .ok_or(BufferError::PageNotCached { page_id })?;
        frame.dirty = true;
        Ok(())
    }

    /// Write a cached page back to the heap store if it is dirty.
    /// A no-op for uncached pages.
    pub fn flush_page(&mut self, page_id: PageId) -> BufferResult<()> {
        if let Some(frame) = self.frames.peek_mut(&page_id)
            && frame.dirty
        {
            self.file_manager.write_page(page_id, &frame.page)?;
            frame.dirty = false;
        }
        Ok(())
    }

    /// Write every cached frame regardless of dirty state, then sync all
    /// open files. Idempotent; this is how result pages are guaranteed to
    /// reach disk.
    pub fn flush_all(&mut self) -> BufferResult<()> {
        for (page_id, frame) in self.frames.iter_mut() {
            self.file_manager.write_page(*page_id, &frame.page)?;
            frame.dirty = false;
        }
        self.file_manager.sync_all()?;
        Ok(())
    }

    /// Explicitly drop a page from the pool, flushing it first if dirty.
    /// Refuses pinned frames.
    pub fn evict_page(&mut self, page_id: PageId) -> BufferResult<()> {
        match self.frames.peek(&page_id) {
            None => Ok(()),
            Some(frame) if frame.pin_count > 0 => Err(BufferError::PagePinned { page_id }),
            Some(_) => {
                self.flush_page(page_id)?;
                self.frames.pop(&page_id);
                Ok(())
            }
        }
    }

    /// Delete a heap file, discarding any frames cached for it first so a
    /// stale frame can never be flushed to a dead handle
    pub fn delete_file(&mut self, name: &str) -> BufferResult<()> {
        if let Some(handle) = self.file_manager.handle_of(name) {
            let stale: Vec<PageId> = self
                .frames
                .iter()
                .map(|(id, _)| *id)
                .filter(|id| id.file == handle)
                .collect();
            for page_id in stale {
                if self.pin_count(page_id).unwrap_or(0) > 0 {
                    return Err(BufferError::PagePinned { page_id });
                }
                self.frames.pop(&page_id);
            }
        }
        self.file_manager.delete(name)?;
        Ok(())
    }

    /// Number of cached pages
    pub fn cached_pages(&self) -> usize {
        self.frames.len()
    }

    /// Check if a page is in the pool
    pub fn is_cached(&self, page_id: PageId) -> bool {
        self.frames.contains(&page_id)
    }

    /// Number of dirty frames
    pub fn dirty_pages(&self) -> usize {
        self.frames.iter().filter(|(_, f)| f.dirty).count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Pin count of a cached page, if present
    pub fn pin_count(&self, page_id: PageId) -> Option<u32> {
        self.frames.peek(&page_id).map(|f| f.pin_count)
    }

    /// Evict the least recently used unpinned frame, flushing it first if
    /// dirty. Fails when every frame is pinned.
    fn evict_lru_unpinned(&mut self) -> BufferResult<()> {
        let victim = self
            .frames
            .iter()
            .rev()
            .find(|(_, frame)| frame.pin_count == 0)
            .map(|(id, _)| *id)
            .ok_or(BufferError::PoolExhausted {
                capacity: self.capacity,
            })?;

        // Flush failure aborts the eviction and surfaces to the pinner
        self.flush_page(victim)?;
        let frame = self.frames.pop(&victim);
        debug_assert!(
            frame.map(|f| f.pin_count == 0).unwrap_or(false),
            "pinned frame selected for eviction"
        );
        Ok(())
    }
}
