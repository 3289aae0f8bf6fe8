use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use super::error::{TableError, TableResult};
use super::tuple::Tuple;
use super::PAGE_CAPACITY;

/// Current time as unix seconds
pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// A fixed-capacity ordered block of tuples, the unit of disk I/O
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    page_no: u64,
    tuples: Vec<Tuple>,
    created_at: u64,
    last_accessed: u64,
    last_modified: u64,
}

impl Page {
    /// Create a new empty page
    pub fn new(page_no: u64) -> Self {
        let now = unix_now();
        Self {
            page_no,
            tuples: Vec::with_capacity(PAGE_CAPACITY),
            created_at: now,
            last_accessed: now,
            last_modified: now,
        }
    }

    /// Create a page pre-filled with tuples (at most `PAGE_CAPACITY`)
    pub fn with_tuples(page_no: u64, tuples: Vec<Tuple>) -> TableResult<Self> {
        if tuples.len() > PAGE_CAPACITY {
            return Err(TableError::PageFull(page_no));
        }
        let now = unix_now();
        Ok(Self {
            page_no,
            tuples,
            created_at: now,
            last_accessed: now,
            last_modified: now,
        })
    }

    /// Append a tuple; fails if the page is at capacity
    pub fn push(&mut self, tuple: Tuple) -> TableResult<()> {
        if self.is_full() {
            return Err(TableError::PageFull(self.page_no));
        }
        self.tuples.push(tuple);
        self.last_modified = unix_now();
        Ok(())
    }

    pub fn page_no(&self) -> u64 {
        self.page_no
    }

    pub fn tuples(&self) -> &[Tuple] {
        &self.tuples
    }

    pub fn into_tuples(self) -> Vec<Tuple> {
        self.tuples
    }

    pub fn tuple_count(&self) -> usize {
        self.tuples.len()
    }

    pub fn is_full(&self) -> bool {
        self.tuples.len() >= PAGE_CAPACITY
    }

    pub fn is_empty(&self) -> bool {
        self.tuples.is_empty()
    }

    pub fn created_at(&self) -> u64 {
        self.created_at
    }

    pub fn last_accessed(&self) -> u64 {
        self.last_accessed
    }

    pub fn last_modified(&self) -> u64 {
        self.last_modified
    }

    /// Record a read access (set by the heap store when a page is loaded)
    pub(crate) fn touch_accessed(&mut self) {
        self.last_accessed = unix_now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_until_full() {
        let mut page = Page::new(1);
        for i in 0..PAGE_CAPACITY {
            page.push(Tuple::from_strs(&[&i.to_string()])).unwrap();
        }
        assert!(page.is_full());
        assert_eq!(page.tuple_count(), PAGE_CAPACITY);

        let result = page.push(Tuple::from_strs(&["overflow"]));
        assert!(matches!(result, Err(TableError::PageFull(1))));
    }

    #[test]
    fn test_with_tuples_over_capacity() {
        let tuples: Vec<Tuple> = (0..PAGE_CAPACITY + 1)
            .map(|i| Tuple::from_strs(&[&i.to_string()]))
            .collect();
        assert!(matches!(
            Page::with_tuples(3, tuples),
            Err(TableError::PageFull(3))
        ));
    }

    #[test]
    fn test_serde_round_trip() {
        let mut page = Page::new(2);
        page.push(Tuple::from_strs(&["1", "Brazil", "BR"])).unwrap();
        page.push(Tuple::from_strs(&["2", "Chile", "CL"])).unwrap();

        let encoded = serde_json::to_vec(&page).unwrap();
        let decoded: Page = serde_json::from_slice(&encoded).unwrap();
        assert_eq!(decoded, page);
    }
}
