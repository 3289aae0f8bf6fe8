use super::error::SortResult;
use super::SortStats;
use crate::buffer::BufferPool;
use crate::table::{HeapTable, PageCursor, Tuple};

/// Cursor over one sorted run, buffering a single page at a time.
/// Every page load is counted against the sort's I/O counter.
pub(crate) struct RunCursor {
    cursor: PageCursor,
    tuples: Vec<Tuple>,
    pos: usize,
}

impl RunCursor {
    pub(crate) fn new(run: &HeapTable) -> Self {
        Self {
            cursor: run.cursor(),
            tuples: Vec::new(),
            pos: 0,
        }
    }

    /// Current head tuple, or `None` when the run is exhausted
    pub(crate) fn head(&self) -> Option<&Tuple> {
        self.tuples.get(self.pos)
    }

    /// Load pages until a tuple is buffered or the run ends
    pub(crate) fn fill(&mut self, pool: &mut BufferPool, stats: &mut SortStats) -> SortResult<()> {
        while self.pos >= self.tuples.len() {
            match self.cursor.next_page(pool)? {
                Some(page) => {
                    stats.io_operations += 1;
                    self.tuples = page.into_tuples();
                    self.pos = 0;
                    if !self.tuples.is_empty() {
                        break;
                    }
                }
                None => break,
            }
        }
        Ok(())
    }

    /// Step past the head, loading the next page on buffer exhaustion
    pub(crate) fn advance(&mut self, pool: &mut BufferPool, stats: &mut SortStats) -> SortResult<()> {
        self.pos += 1;
        self.fill(pool, stats)
    }
}
