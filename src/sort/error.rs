use thiserror::Error;

use crate::buffer::BufferError;
use crate::table::TableError;

#[derive(Debug, Error)]
pub enum SortError {
    #[error("Table error: {0}")]
    Table(#[from] TableError),

    #[error("Buffer error: {0}")]
    Buffer(#[from] BufferError),

    #[error("Column {column} not found in table {table}")]
    ColumnNotFound { column: String, table: String },
}

pub type SortResult<T> = Result<T, SortError>;
