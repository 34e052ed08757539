use std::collections::HashMap;
use std::sync::Arc;

use super::row::{DbRow, column_index};
use crate::types::RowValues;

/// Every row of one executed statement, materialized.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    /// The rows returned by the query
    pub results: Vec<DbRow>,
    /// Rows affected (DML) or returned (SELECT), as reported by the server
    pub rows_affected: u64,
    column_names: Option<Arc<Vec<String>>>,
    column_index: Option<Arc<HashMap<String, usize>>>,
}

impl ResultSet {
    /// Create a new result set with a known capacity
    #[must_use]
    pub fn with_capacity(capacity: usize) -> ResultSet {
        ResultSet {
            results: Vec::with_capacity(capacity),
            rows_affected: 0,
            column_names: None,
            column_index: None,
        }
    }

    /// Set the column names shared by all rows
    pub fn set_column_names(&mut self, column_names: Arc<Vec<String>>) {
        self.column_index = Some(column_index(&column_names));
        self.column_names = Some(column_names);
    }

    #[must_use]
    pub fn get_column_names(&self) -> Option<&Arc<Vec<String>>> {
        self.column_names.as_ref()
    }

    /// Add a row; ignored until column names are set.
    pub fn add_row_values(&mut self, row_values: Vec<RowValues>) {
        if let (Some(names), Some(index)) = (&self.column_names, &self.column_index) {
            self.results
                .push(DbRow::with_index(names.clone(), row_values, index.clone()));
        }
    }

    /// First value of every row.
    #[must_use]
    pub fn first_column(&self) -> Vec<RowValues> {
        self.results
            .iter()
            .filter_map(|row| row.get_by_index(0).cloned())
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_share_column_lookup() {
        let mut rs = ResultSet::with_capacity(2);
        rs.add_row_values(vec![RowValues::Int(0)]);
        assert!(rs.is_empty(), "rows need column names first");

        rs.set_column_names(Arc::new(vec!["n".into()]));
        rs.add_row_values(vec![RowValues::Int(1)]);
        rs.add_row_values(vec![RowValues::Int(2)]);
        assert_eq!(rs.len(), 2);
        assert_eq!(rs.results[1].get("n"), Some(&RowValues::Int(2)));
        assert_eq!(rs.first_column(), vec![RowValues::Int(1), RowValues::Int(2)]);
    }
}
