use thiserror::Error;

use crate::buffer::BufferError;
use crate::sort::SortError;
use crate::table::TableError;

#[derive(Debug, Error)]
pub enum JoinError {
    #[error("Sort error: {0}")]
    Sort(#[from] SortError),

    #[error("Table error: {0}")]
    Table(#[from] TableError),

    #[error("Buffer error: {0}")]
    Buffer(#[from] BufferError),

    #[error("Join column cannot be empty")]
    EmptyJoinColumn,

    #[error("Join column {column} not found in table {table}")]
    ColumnNotFound { column: String, table: String },

    #[error("execute() must be called before exporting the result")]
    NotExecuted,

    #[error("Export path cannot be empty")]
    EmptyExportPath,
}

pub type JoinResult<T> = Result<T, JoinError>;
