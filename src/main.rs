use std::error::Error;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use prettytable::Row;

use riffledb::{
    BufferPool, ExternalSorter, HeapFileManager, MAX_INPUT_RUNS, SortMergeJoin, load_table,
};

/// Join two CSV files with a disk-based sort-merge join
#[derive(Parser)]
#[command(name = "riffledb", version)]
struct Args {
    /// Left input CSV file
    #[arg(long)]
    left: PathBuf,

    /// Right input CSV file
    #[arg(long)]
    right: PathBuf,

    /// Join column in the left file
    #[arg(long)]
    left_column: String,

    /// Join column in the right file
    #[arg(long)]
    right_column: String,

    /// Directory for heap files
    #[arg(long, default_value = "./heaps")]
    data_dir: PathBuf,

    /// Directory for the exported result CSV
    #[arg(long, default_value = "./output")]
    output_dir: PathBuf,

    /// Buffer pool frame count
    #[arg(long, default_value_t = riffledb::BUFFER_POOL_FRAMES)]
    frames: usize,

    /// External-sort in-memory page budget
    #[arg(long, default_value_t = riffledb::SORT_MEMORY_PAGES)]
    memory_pages: usize,

    /// Print the first N result rows
    #[arg(long, default_value_t = 0)]
    preview: usize,
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), Box<dyn Error>> {
    let left = load_table(&table_name(&args.left), &args.left)?;
    let right = load_table(&table_name(&args.right), &args.right)?;

    let manager = HeapFileManager::new(&args.data_dir);
    let mut pool = BufferPool::with_capacity(manager, args.frames);

    let mut join = SortMergeJoin::new(left, right, &args.left_column, &args.right_column)?
        .with_sorter(ExternalSorter::new(args.memory_pages, MAX_INPUT_RUNS));
    let report = join.execute(&mut pool)?;

    println!("Result table:    {}", report.result_table);
    println!("Records created: {}", report.records_created);
    println!("Pages created:   {}", report.pages_created);
    println!("I/O operations:  {}", report.io_operations);

    if args.preview > 0 {
        preview(&mut pool, &join, args.preview)?;
    }

    let path = join.export_csv(&mut pool, &args.output_dir)?;
    println!("Result written to {}", path.display());

    join.cleanup(&mut pool)?;
    Ok(())
}

fn table_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn preview(pool: &mut BufferPool, join: &SortMergeJoin, limit: usize) -> Result<(), Box<dyn Error>> {
    let Some(result) = join.result_table() else {
        return Ok(());
    };

    let mut display = prettytable::Table::new();
    display.set_titles(Row::from(result.columns()));

    let mut cursor = result.cursor();
    let mut shown = 0;
    'pages: while let Some(page) = cursor.next_page(pool)? {
        for tuple in page.tuples() {
            display.add_row(Row::from(tuple.columns()));
            shown += 1;
            if shown >= limit {
                break 'pages;
            }
        }
    }

    display.printstd();
    Ok(())
}
