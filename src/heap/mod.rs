mod error;
mod manager;
mod metadata;

pub use error::{HeapError, HeapResult};
pub use manager::{FileHandle, HeapFileManager, PageId};
pub use metadata::HeapFileMetadata;

/// Page slot size in bytes (4KB)
pub const PAGE_SIZE_BYTES: usize = 4096;

/// Default heap file capacity in bytes (~100MB)
pub const HEAP_CAPACITY_BYTES: u64 = 100_000_000;
