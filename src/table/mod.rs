mod error;
mod heap_table;
mod page;
mod table;
mod tuple;

pub use error::{TableError, TableResult};
pub use heap_table::{HeapTable, HeapTableWriter, PageCursor};
pub use page::Page;
pub use table::Table;
pub use tuple::Tuple;

pub(crate) use page::unix_now;

/// Number of tuples a page can hold
pub const PAGE_CAPACITY: usize = 10;
