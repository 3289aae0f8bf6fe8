use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HeapError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Heap file not found: {0}")]
    FileNotFound(String),

    #[error("Invalid file handle: {0}")]
    InvalidHandle(usize),

    #[error("File name cannot be empty")]
    EmptyFileName,

    #[error("Invalid page id: page numbers start at 1")]
    InvalidPageId,

    #[error("Page {page_no} not found in file {file}: last allocated page is {last_page_id}")]
    PageNotFound {
        file: String,
        page_no: u64,
        last_page_id: u64,
    },

    #[error("Page {page_no} in file {file} was allocated but never written")]
    EmptyPage { file: String, page_no: u64 },

    #[error("Serialized page is {size} bytes, page size is {max}")]
    PageOversize { size: usize, max: usize },

    #[error("Heap file {file} is full: capacity {capacity} bytes")]
    HeapFull { file: String, capacity: u64 },
}

pub type HeapResult<T> = Result<T, HeapError>;
