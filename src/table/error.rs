use crate::buffer::BufferError;
use crate::heap::HeapError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TableError {
    #[error("Buffer error: {0}")]
    Buffer(#[from] BufferError),

    #[error("Heap error: {0}")]
    Heap(#[from] HeapError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Page {0} is full")]
    PageFull(u64),

    #[error("Row has {actual} columns, table {table} expects {expected}")]
    ColumnCountMismatch {
        table: String,
        expected: usize,
        actual: usize,
    },

    #[error("Table name cannot be empty")]
    EmptyTableName,
}

pub type TableResult<T> = Result<T, TableError>;
