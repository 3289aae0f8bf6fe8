pub mod buffer;
pub mod heap;
pub mod ingest;
pub mod join;
pub mod sort;
pub mod table;

pub use buffer::{BUFFER_POOL_FRAMES, BufferError, BufferPool, BufferResult};
pub use heap::{
    FileHandle, HEAP_CAPACITY_BYTES, HeapError, HeapFileManager, HeapFileMetadata, HeapResult,
    PAGE_SIZE_BYTES, PageId,
};
pub use ingest::{IngestError, IngestResult, load_table};
pub use join::{JoinError, JoinReport, JoinResult, SortMergeJoin};
pub use sort::{
    ExternalSorter, MAX_INPUT_RUNS, SORT_MEMORY_PAGES, SortError, SortResult, SortStats,
};
pub use table::{
    HeapTable, HeapTableWriter, PAGE_CAPACITY, Page, PageCursor, Table, TableError, TableResult,
    Tuple,
};
