mod error;
mod run;

pub use error::{SortError, SortResult};

use run::RunCursor;

use crate::buffer::BufferPool;
use crate::table::{HeapTable, HeapTableWriter, Table, Tuple, PAGE_CAPACITY};

/// Default in-memory page budget for run generation
pub const SORT_MEMORY_PAGES: usize = 4;

/// Default number of runs merged at once (one buffer page is reserved
/// for merge output)
pub const MAX_INPUT_RUNS: usize = 3;

/// Observable cost counters for one sort. Every page read and every page
/// write in both phases counts one I/O operation; every run file and
/// every written page bumps the respective creation counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SortStats {
    pub io_operations: u64,
    pub runs_created: u64,
    pub pages_created: u64,
}

/// External merge sort bounded by a fixed page budget: generate sorted
/// runs of at most `memory_pages` pages, then k-way merge them
/// `max_input_runs` at a time.
pub struct ExternalSorter {
    memory_pages: usize,
    max_input_runs: usize,
}

impl Default for ExternalSorter {
    fn default() -> Self {
        Self::new(SORT_MEMORY_PAGES, MAX_INPUT_RUNS)
    }
}

impl ExternalSorter {
    pub fn new(memory_pages: usize, max_input_runs: usize) -> Self {
        debug_assert!(memory_pages > 0);
        debug_assert!(max_input_runs > 0);
        Self {
            memory_pages,
            max_input_runs,
        }
    }

    /// Sort `table` by the named column into a heap-backed table called
    /// `{table}_sorted_{column}`. Keys compare byte-wise; the sort is
    /// stable. Returns the sorted table and its cost counters.
    pub fn sort(
        &self,
        pool: &mut BufferPool,
        table: &Table,
        column: &str,
    ) -> SortResult<(HeapTable, SortStats)> {
        let key = table
            .column_index(column)
            .ok_or_else(|| SortError::ColumnNotFound {
                column: column.to_string(),
                table: table.name().to_string(),
            })?;

        let mut stats = SortStats::default();
        let runs = self.generate_runs(pool, table, key, &mut stats)?;

        let out_name = format!("{}_sorted_{}", table.name(), column);
        let sorted = self.merge_runs(
            pool,
            runs,
            key,
            table.columns(),
            &out_name,
            0,
            &mut stats,
        )?;

        Ok((sorted, stats))
    }

    /// Phase 1: accumulate tuples up to the memory bound, stable-sort by
    /// the key, and write each batch as its own run file
    fn generate_runs(
        &self,
        pool: &mut BufferPool,
        table: &Table,
        key: usize,
        stats: &mut SortStats,
    ) -> SortResult<Vec<HeapTable>> {
        let bound = self.memory_pages * PAGE_CAPACITY;
        let mut runs = Vec::new();
        let mut buffer: Vec<Tuple> = Vec::with_capacity(bound);

        for page in table.pages() {
            stats.io_operations += 1;
            buffer.extend_from_slice(page.tuples());

            if buffer.len() >= bound {
                runs.push(self.write_run(pool, table, &mut buffer, key, runs.len(), stats)?);
            }
        }

        if !buffer.is_empty() {
            runs.push(self.write_run(pool, table, &mut buffer, key, runs.len(), stats)?);
        }

        Ok(runs)
    }

    fn write_run(
        &self,
        pool: &mut BufferPool,
        table: &Table,
        buffer: &mut Vec<Tuple>,
        key: usize,
        run_no: usize,
        stats: &mut SortStats,
    ) -> SortResult<HeapTable> {
        // sort_by is stable: ties keep input relative order
        buffer.sort_by(|a, b| a.key(key).cmp(b.key(key)));

        let name = format!("{}_run_{}", table.name(), run_no);
        let mut writer = HeapTableWriter::create(pool, &name, table.columns().to_vec())?;
        for tuple in buffer.drain(..) {
            writer.append(pool, tuple)?;
        }
        let run = writer.finish(pool)?;

        stats.io_operations += run.page_count();
        stats.pages_created += run.page_count();
        stats.runs_created += 1;

        Ok(run)
    }

    /// Phase 2: the single recursive merge entry point. A single run (or
    /// none, for empty input) is a trivial merge; when more than
    /// `max_input_runs` runs remain, groups are merged into intermediate
    /// runs and the recursion repeats. Consumed runs are deleted as soon
    /// as their merge completes.
    fn merge_runs(
        &self,
        pool: &mut BufferPool,
        runs: Vec<HeapTable>,
        key: usize,
        columns: &[String],
        final_name: &str,
        level: usize,
        stats: &mut SortStats,
    ) -> SortResult<HeapTable> {
        if runs.len() <= self.max_input_runs {
            let merged = self.k_way_merge(pool, &runs, key, columns, final_name, stats)?;
            for run in runs {
                run.delete(pool)?;
            }
            return Ok(merged);
        }

        let mut intermediates = Vec::new();
        for (i, group) in runs.chunks(self.max_input_runs).enumerate() {
            let name = format!("{final_name}_pass{level}_{i}");
            let merged = self.k_way_merge(pool, group, key, columns, &name, stats)?;
            stats.runs_created += 1;
            intermediates.push(merged);
        }
        for run in runs {
            run.delete(pool)?;
        }

        self.merge_runs(pool, intermediates, key, columns, final_name, level + 1, stats)
    }

    /// Merge sorted runs by repeatedly taking the run whose head has the
    /// smallest key. Ties go to the earlier run, keeping the merge stable.
    fn k_way_merge(
        &self,
        pool: &mut BufferPool,
        runs: &[HeapTable],
        key: usize,
        columns: &[String],
        out_name: &str,
        stats: &mut SortStats,
    ) -> SortResult<HeapTable> {
        let mut writer = HeapTableWriter::create(pool, out_name, columns.to_vec())?;

        let mut cursors = Vec::with_capacity(runs.len());
        for run in runs {
            let mut cursor = RunCursor::new(run);
            cursor.fill(pool, stats)?;
            cursors.push(cursor);
        }

        loop {
            let mut selected: Option<usize> = None;
            for (i, cursor) in cursors.iter().enumerate() {
                let Some(head) = cursor.head() else { continue };
                match selected {
                    // Replace only on strictly smaller keys so ties stay
                    // with the earlier run
                    Some(j) if head.key(key) >= cursors[j].head().unwrap().key(key) => {}
                    _ => selected = Some(i),
                }
            }

            let Some(i) = selected else { break };
            let tuple = cursors[i].head().unwrap().clone();
            writer.append(pool, tuple)?;
            cursors[i].advance(pool, stats)?;
        }

        let merged = writer.finish(pool)?;
        stats.io_operations += merged.page_count();
        stats.pages_created += merged.page_count();

        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heap::HeapFileManager;
    use tempfile::TempDir;

    fn setup_pool() -> (TempDir, BufferPool) {
        let temp_dir = tempfile::tempdir().unwrap();
        let manager = HeapFileManager::new(temp_dir.path());
        (temp_dir, BufferPool::new(manager))
    }

    fn number_table(name: &str, keys: &[u32]) -> Table {
        let rows = keys
            .iter()
            .enumerate()
            .map(|(i, k)| vec![format!("{k:04}"), i.to_string()])
            .collect();
        Table::from_rows(name, vec!["key".to_string(), "seq".to_string()], rows).unwrap()
    }

    fn collect_rows(pool: &mut BufferPool, table: &HeapTable) -> Vec<Vec<String>> {
        let mut rows = Vec::new();
        let mut cursor = table.cursor();
        while let Some(page) = cursor.next_page(pool).unwrap() {
            for tuple in page.tuples() {
                rows.push(tuple.columns().to_vec());
            }
        }
        rows
    }

    fn assert_sorted_permutation(input: &Table, output_rows: &[Vec<String>]) {
        // Non-decreasing in the key
        for pair in output_rows.windows(2) {
            assert!(pair[0][0] <= pair[1][0], "output not sorted: {pair:?}");
        }
        // Same multiset of rows
        let mut expected: Vec<Vec<String>> = input
            .pages()
            .iter()
            .flat_map(|p| p.tuples().iter().map(|t| t.columns().to_vec()))
            .collect();
        let mut actual = output_rows.to_vec();
        expected.sort();
        actual.sort();
        assert_eq!(expected, actual);
    }

    // Deterministic shuffle of 0..count
    fn scrambled(count: u32) -> Vec<u32> {
        (0..count).map(|i| (i * 73 + 11) % count).collect()
    }

    #[test]
    fn test_sort_single_run() {
        let (_temp_dir, mut pool) = setup_pool();
        let table = number_table("small", &[5, 3, 9, 1, 7]);

        let sorter = ExternalSorter::default();
        let (sorted, stats) = sorter.sort(&mut pool, &table, "key").unwrap();

        assert_eq!(sorted.name(), "small_sorted_key");
        let rows = collect_rows(&mut pool, &sorted);
        assert_sorted_permutation(&table, &rows);
        assert_eq!(stats.runs_created, 1);
    }

    #[test]
    fn test_sort_multiple_runs() {
        let (_temp_dir, mut pool) = setup_pool();
        let table = number_table("mid", &scrambled(90));

        // memory bound of 30 tuples forces three runs
        let sorter = ExternalSorter::new(3, MAX_INPUT_RUNS);
        let (sorted, stats) = sorter.sort(&mut pool, &table, "key").unwrap();

        let rows = collect_rows(&mut pool, &sorted);
        assert_eq!(rows.len(), 90);
        assert_sorted_permutation(&table, &rows);
        assert_eq!(stats.runs_created, 3);
    }

    #[test]
    fn test_sort_multi_pass_merge() {
        let (_temp_dir, mut pool) = setup_pool();
        let table = number_table("big", &scrambled(100));

        // One page per run: ten runs, more than the merge can hold at once
        let sorter = ExternalSorter::new(1, 3);
        let (sorted, stats) = sorter.sort(&mut pool, &table, "key").unwrap();

        let rows = collect_rows(&mut pool, &sorted);
        assert_eq!(rows.len(), 100);
        assert_sorted_permutation(&table, &rows);
        // Ten initial runs plus intermediate pass runs
        assert!(stats.runs_created > 10);

        // Every temporary file is deleted afterwards
        assert!(!pool.file_manager().exists("big_run_0"));
        assert!(!pool.file_manager().exists("big_sorted_key_pass0_0"));
        assert!(pool.file_manager().exists("big_sorted_key"));
    }

    #[test]
    fn test_sort_stability() {
        let (_temp_dir, mut pool) = setup_pool();
        // All keys equal: output must keep input order in the seq column
        let table = number_table("ties", &[7; 45]);

        let sorter = ExternalSorter::new(1, 3);
        let (sorted, _) = sorter.sort(&mut pool, &table, "key").unwrap();

        let rows = collect_rows(&mut pool, &sorted);
        let seqs: Vec<usize> = rows.iter().map(|r| r[1].parse().unwrap()).collect();
        assert_eq!(seqs, (0..45).collect::<Vec<_>>());
    }

    #[test]
    fn test_sort_empty_table() {
        let (_temp_dir, mut pool) = setup_pool();
        let table = number_table("empty", &[]);

        let sorter = ExternalSorter::default();
        let (sorted, stats) = sorter.sort(&mut pool, &table, "key").unwrap();

        assert_eq!(sorted.page_count(), 0);
        assert_eq!(stats.io_operations, 0);
        assert_eq!(stats.runs_created, 0);
        assert_eq!(stats.pages_created, 0);
    }

    #[test]
    fn test_sort_missing_column() {
        let (_temp_dir, mut pool) = setup_pool();
        let table = number_table("t", &[1, 2]);

        let sorter = ExternalSorter::default();
        let result = sorter.sort(&mut pool, &table, "missing");
        assert!(matches!(result, Err(SortError::ColumnNotFound { .. })));
    }

    #[test]
    fn test_sort_io_accounting() {
        let (_temp_dir, mut pool) = setup_pool();
        // 20 tuples = 2 pages, single run with the default budget
        let table = number_table("acct", &scrambled(20));

        let sorter = ExternalSorter::default();
        let (_, stats) = sorter.sort(&mut pool, &table, "key").unwrap();

        // Phase 1 reads 2 input pages and writes a 2-page run; the trivial
        // merge reads those 2 pages back and writes 2 output pages
        assert_eq!(stats.io_operations, 8);
        assert_eq!(stats.pages_created, 4);
        assert_eq!(stats.runs_created, 1);
    }

    #[test]
    fn test_ordinal_comparison_not_numeric() {
        let (_temp_dir, mut pool) = setup_pool();
        let rows = vec![
            vec!["10".to_string()],
            vec!["2".to_string()],
            vec!["1".to_string()],
        ];
        let table = Table::from_rows("ord", vec!["key".to_string()], rows).unwrap();

        let sorter = ExternalSorter::default();
        let (sorted, _) = sorter.sort(&mut pool, &table, "key").unwrap();

        let keys: Vec<String> = collect_rows(&mut pool, &sorted)
            .into_iter()
            .map(|mut r| r.remove(0))
            .collect();
        assert_eq!(keys, ["1", "10", "2"]);
    }
}
