mod error;


pub use error::{JoinError, JoinResult};

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use crate::buffer::BufferPool;
use crate::sort::ExternalSorter;
use crate::table::{HeapTable, HeapTableWriter, PageCursor, Table, Tuple};

/// What one join execution produced and cost
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinReport {
    pub pages_created: u64,
    pub records_created: u64,
    /// Total page reads and writes across both sorts and the merge scan
    pub io_operations: u64,
    pub result_table: String,
}

/// Equi-join of two tables by sorting both on the join key and running a
/// single bounded-memory synchronized scan.
///
/// The result is materialized as a heap-backed table named
/// `{left}_{right}_joined`; the caller owns its lifetime and disposes it
/// with `cleanup`.
pub struct SortMergeJoin {
    left: Table,
    right: Table,
    left_column: String,
    right_column: String,
    sorter: ExternalSorter,
    result: Option<HeapTable>,
}

impl SortMergeJoin {
    /// Construct the operator. Blank join column names fail immediately.
    pub fn new(
        left: Table,
        right: Table,
        left_column: &str,
        right_column: &str,
    ) -> JoinResult<Self> {
        if left_column.trim().is_empty() || right_column.trim().is_empty() {
            return Err(JoinError::EmptyJoinColumn);
        }

        Ok(Self {
            left,
            right,
            left_column: left_column.to_string(),
            right_column: right_column.to_string(),
            sorter: ExternalSorter::default(),
            result: None,
        })
    }

    /// Replace the default sorter configuration
    pub fn with_sorter(mut self, sorter: ExternalSorter) -> Self {
        self.sorter = sorter;
        self
    }

    /// Run the join: sort both inputs, merge-scan them, and materialize
    /// the joined records as a new heap table
    pub fn execute(&mut self, pool: &mut BufferPool) -> JoinResult<JoinReport> {
        // Both join columns must resolve before any I/O happens
        self.check_column(&self.left, &self.left_column)?;
        self.check_column(&self.right, &self.right_column)?;

        // The larger table always plays the outer side; the equi-join is
        // commutative so only the I/O accounting changes
        if self.left.page_count() < self.right.page_count() {
            std::mem::swap(&mut self.left, &mut self.right);
            std::mem::swap(&mut self.left_column, &mut self.right_column);
        }

        let left_key = self.index_of(&self.left, &self.left_column)?;
        let right_key = self.index_of(&self.right, &self.right_column)?;

        let (sorted_left, left_stats) = self.sorter.sort(pool, &self.left, &self.left_column)?;
        let (sorted_right, right_stats) =
            self.sorter.sort(pool, &self.right, &self.right_column)?;

        let mut columns = self.left.columns().to_vec();
        columns.extend_from_slice(self.right.columns());
        let out_name = format!("{}_{}_joined", self.left.name(), self.right.name());
        let mut writer = HeapTableWriter::create(pool, &out_name, columns)?;

        let mut scan_io = 0u64;
        let mut records = 0u64;
        self.merge_scan(
            pool,
            &sorted_left,
            &sorted_right,
            left_key,
            right_key,
            &mut writer,
            &mut scan_io,
            &mut records,
        )?;

        let result = writer.finish(pool)?;
        scan_io += result.page_count();

        sorted_left.delete(pool)?;
        sorted_right.delete(pool)?;
        pool.flush_all()?;

        let report = JoinReport {
            pages_created: result.page_count(),
            records_created: records,
            io_operations: left_stats.io_operations + right_stats.io_operations + scan_io,
            result_table: result.name().to_string(),
        };
        self.result = Some(result);
        Ok(report)
    }

    /// The merge-join scan: one buffered page per side, loaded lazily,
    /// with duplicate groups handled through a bounded snapshot of the
    /// right-side group (snapshots span page boundaries, so a match group
    /// larger than one page is still joined completely).
    fn merge_scan(
        &self,
        pool: &mut BufferPool,
        sorted_left: &HeapTable,
        sorted_right: &HeapTable,
        left_key: usize,
        right_key: usize,
        writer: &mut HeapTableWriter,
        scan_io: &mut u64,
        records: &mut u64,
    ) -> JoinResult<()> {
        let mut left = SideCursor::new(sorted_left);
        left.fill(pool, scan_io)?;
        let mut right = SideCursor::new(sorted_right);
        right.fill(pool, scan_io)?;

        loop {
            let (Some(l), Some(r)) = (left.head(), right.head()) else {
                break;
            };
            let ordering = l.key(left_key).cmp(r.key(right_key));
            let key = l.key(left_key).to_string();

            match ordering {
                Ordering::Less => left.advance(pool, scan_io)?,
                Ordering::Greater => right.advance(pool, scan_io)?,
                Ordering::Equal => {
                    // Snapshot the whole right-side match group; the right
                    // cursor ends up past it
                    let mut group = Vec::new();
                    while let Some(r) = right.head() {
                        if r.key(right_key) != key {
                            break;
                        }
                        group.push(r.clone());
                        right.advance(pool, scan_io)?;
                    }

                    // Emit the cross product of the group with every left
                    // tuple sharing the key
                    while let Some(l) = left.head() {
                        if l.key(left_key) != key {
                            break;
                        }
                        for r in &group {
                            writer.append(pool, Tuple::concat(l, r))?;
                            *records += 1;
                        }
                        left.advance(pool, scan_io)?;
                    }
                }
            }
        }

        Ok(())
    }

    /// Write the result table as delimited text under `dir`
    pub fn export_csv(&self, pool: &mut BufferPool, dir: &Path) -> JoinResult<PathBuf> {
        if dir.as_os_str().is_empty() {
            return Err(JoinError::EmptyExportPath);
        }
        let result = self.result.as_ref().ok_or(JoinError::NotExecuted)?;
        Ok(result.export_csv(pool, dir)?)
    }

    /// The materialized result table, once `execute` has run
    pub fn result_table(&self) -> Option<&HeapTable> {
        self.result.as_ref()
    }

    /// Delete the result table's backing file (idempotent)
    pub fn cleanup(&mut self, pool: &mut BufferPool) -> JoinResult<()> {
        if let Some(result) = self.result.take() {
            result.delete(pool)?;
        }
        Ok(())
    }

    fn check_column(&self, table: &Table, column: &str) -> JoinResult<()> {
        self.index_of(table, column).map(|_| ())
    }

    fn index_of(&self, table: &Table, column: &str) -> JoinResult<usize> {
        table
            .column_index(column)
            .ok_or_else(|| JoinError::ColumnNotFound {
                column: column.to_string(),
                table: table.name().to_string(),
            })
    }
}

/// One side of the merge scan: a single buffered page, advanced lazily
struct SideCursor {
    cursor: PageCursor,
    tuples: Vec<Tuple>,
    pos: usize,
}

impl SideCursor {
    fn new(table: &HeapTable) -> Self {
        Self {
            cursor: table.cursor(),
            tuples: Vec::new(),
            pos: 0,
        }
    }

    fn head(&self) -> Option<&Tuple> {
        self.tuples.get(self.pos)
    }

    fn fill(&mut self, pool: &mut BufferPool, io: &mut u64) -> JoinResult<()> {
        while self.pos >= self.tuples.len() {
            match self.cursor.next_page(pool)? {
                Some(page) => {
                    *io += 1;
                    self.tuples = page.into_tuples();
                    self.pos = 0;
                    if !self.tuples.is_empty() {
                        break;
                    }
                }
                None => break,
            }
        }
        Ok(())
    }

    fn advance(&mut self, pool: &mut BufferPool, io: &mut u64) -> JoinResult<()> {
        self.pos += 1;
        self.fill(pool, io)
    }
}
