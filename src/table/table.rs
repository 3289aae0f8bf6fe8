use super::error::{TableError, TableResult};
use super::page::Page;
use super::tuple::Tuple;

/// A fully in-memory table: a named ordered sequence of pages plus column names.
/// Used for bootstrap inputs; heap-backed tables are `HeapTable`.
#[derive(Debug, Clone)]
pub struct Table {
    name: String,
    columns: Vec<String>,
    pages: Vec<Page>,
}

impl Table {
    /// Build a table by packing rows into pages of `PAGE_CAPACITY`.
    /// Every row must match the column count. Page numbers are 1-based.
    pub fn from_rows(
        name: &str,
        columns: Vec<String>,
        rows: Vec<Vec<String>>,
    ) -> TableResult<Self> {
        if name.trim().is_empty() {
            return Err(TableError::EmptyTableName);
        }

        let mut pages = Vec::new();
        let mut current = Page::new(1);

        for row in rows {
            if row.len() != columns.len() {
                return Err(TableError::ColumnCountMismatch {
                    table: name.to_string(),
                    expected: columns.len(),
                    actual: row.len(),
                });
            }

            if current.is_full() {
                let next_no = current.page_no() + 1;
                pages.push(std::mem::replace(&mut current, Page::new(next_no)));
            }
            current.push(Tuple::new(row))?;
        }

        if !current.is_empty() {
            pages.push(current);
        }

        Ok(Self {
            name: name.to_string(),
            columns,
            pages,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Position of a column by name
    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn page_count(&self) -> u64 {
        self.pages.len() as u64
    }

    pub fn tuple_count(&self) -> usize {
        self.pages.iter().map(|p| p.tuple_count()).sum()
    }
}
