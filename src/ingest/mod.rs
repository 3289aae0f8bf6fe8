use std::io;
use std::path::Path;

use thiserror::Error;

use crate::table::{Table, TableError};

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Table error: {0}")]
    Table(#[from] TableError),
}

pub type IngestResult<T> = Result<T, IngestError>;

/// Load a delimited-text file as an in-memory table: the header row
/// becomes the column list and each record becomes one tuple. The engine
/// stays generic over column lists; it never parses values.
pub fn load_table(name: &str, path: &Path) -> IngestResult<Table> {
    let mut reader = csv::Reader::from_path(path)?;
    let columns: Vec<String> = reader.headers()?.iter().map(String::from).collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(String::from).collect());
    }

    Ok(Table::from_rows(name, columns, rows)?)
}
