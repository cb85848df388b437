use std::ops::Index;
use std::sync::Arc;

use super::Column;

/// A single result row, keyed by the projected columns
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    columns: Arc<[Column]>,
    values: Vec<String>,
}

impl Row {
    pub(crate) fn new(columns: Arc<[Column]>, values: Vec<String>) -> Self {
        Self { columns, values }
    }

    /// Value of `column`, or `None` if it was not projected
    pub fn get(&self, column: Column) -> Option<&str> {
        self.columns
            .iter()
            .position(|c| *c == column)
            .and_then(|i| self.values.get(i))
            .map(String::as_str)
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Projected values in column order
    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn iter(&self) -> impl Iterator<Item = (Column, &str)> {
        self.columns
            .iter()
            .copied()
            .zip(self.values.iter().map(String::as_str))
    }
}

impl Index<Column> for Row {
    type Output = str;

    fn index(&self, column: Column) -> &str {
        match self.get(column) {
            Some(value) => value,
            None => panic!("column {column} was not projected by this query"),
        }
    }
}
