use thiserror::Error;

use crate::heap::{HeapError, PageId};

#[derive(Debug, Error)]
pub enum BufferError {
    #[error("Heap error: {0}")]
    Heap(#[from] HeapError),

    #[error("Buffer pool exhausted: all {capacity} frames are pinned")]
    PoolExhausted { capacity: usize },

    #[error("Page {page_id:?} is not cached")]
    PageNotCached { page_id: PageId },

    #[error("Page {page_id:?} is pinned")]
    PagePinned { page_id: PageId },
}

pub type BufferResult<T> = Result<T, BufferError>;
