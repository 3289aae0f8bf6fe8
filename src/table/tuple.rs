use serde::{Deserialize, Serialize};

/// An ordered sequence of text-encoded column values
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tuple {
    columns: Vec<String>,
}

impl Tuple {
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns }
    }

    /// Build a tuple from string slices
    pub fn from_strs(columns: &[&str]) -> Self {
        Self {
            columns: columns.iter().map(|c| c.to_string()).collect(),
        }
    }

    /// Value of the column at `index`, used as a sort/join key.
    /// Keys compare byte-wise (ordinal string comparison).
    pub fn key(&self, index: usize) -> &str {
        &self.columns[index]
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Concatenate two tuples into a joined record (left columns then right columns)
    pub fn concat(left: &Tuple, right: &Tuple) -> Tuple {
        let mut columns = Vec::with_capacity(left.columns.len() + right.columns.len());
        columns.extend_from_slice(&left.columns);
        columns.extend_from_slice(&right.columns);
        Tuple { columns }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_access() {
        let tuple = Tuple::from_strs(&["1", "Brazil", "BR"]);
        assert_eq!(tuple.key(0), "1");
        assert_eq!(tuple.key(2), "BR");
        assert_eq!(tuple.column_count(), 3);
    }

    #[test]
    fn test_concat() {
        let left = Tuple::from_strs(&["1", "Brazil"]);
        let right = Tuple::from_strs(&["10", "Malbec"]);
        let joined = Tuple::concat(&left, &right);
        assert_eq!(joined.columns(), &["1", "Brazil", "10", "Malbec"]);
    }

    #[test]
    fn test_ordinal_key_ordering() {
        // Byte-wise comparison: "10" sorts before "2"
        let a = Tuple::from_strs(&["10"]);
        let b = Tuple::from_strs(&["2"]);
        assert!(a.key(0) < b.key(0));
    }
}
