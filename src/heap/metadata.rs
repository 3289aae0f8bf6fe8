use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Sidecar record describing one heap file.
/// Persisted as pretty-printed JSON next to the data file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeapFileMetadata {
    pub file_path: PathBuf,
    /// Highest allocated page number; only ever increases (pages are never
    /// renumbered or compacted). 0 means the file holds no pages.
    pub last_page_id: u64,
    pub page_count: u64,
    pub heap_capacity: u64,
    pub created_at: u64,
    pub last_modified_at: u64,
}

impl HeapFileMetadata {
    pub fn new(file_path: PathBuf, heap_capacity: u64) -> Self {
        let now = crate::table::unix_now();
        Self {
            file_path,
            last_page_id: 0,
            page_count: 0,
            heap_capacity,
            created_at: now,
            last_modified_at: now,
        }
    }
}
