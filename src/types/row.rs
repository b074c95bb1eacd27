use std::collections::VecDeque;

use crate::error::{Result, SessionError};

/// Driver-agnostic materialized result from a database query.
/// All values are converted to text by the driver.
#[derive(Debug, Clone)]
pub struct RowSet {
    /// Column names in result order
    pub columns: Vec<String>,
    /// Rows, where each row is a vector of text values in column order
    pub rows: Vec<Vec<String>>,
}

impl RowSet {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { columns, rows }
    }

    pub fn empty() -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }
}

/// Forward-only cursor over a materialized result set.
///
/// Every advance consumes one row; exhaustion is permanent. Column keys are
/// resolved against the row being read, so fetching from an exhausted cursor
/// never inspects them, and an unknown key still consumes the row it was
/// asked to read.
#[derive(Debug)]
pub struct ResultCursor {
    columns: Vec<String>,
    rows: VecDeque<Vec<String>>,
}

impl ResultCursor {
    pub fn new(set: RowSet) -> Self {
        Self {
            columns: set.columns,
            rows: set.rows.into(),
        }
    }

    /// Returns the column names of the underlying result.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Returns the number of rows not yet consumed.
    pub fn remaining(&self) -> usize {
        self.rows.len()
    }

    /// Advances by one row and extracts the named column as text.
    /// Returns `None` once the cursor is exhausted.
    pub fn next_value(&mut self, key: &str) -> Result<Option<String>> {
        Ok(self.next_row(&[key])?.and_then(|mut values| values.pop()))
    }

    /// Advances to exhaustion, collecting the named column from every
    /// remaining row in order. Called again afterwards, yields an empty
    /// vector.
    pub fn drain_values(&mut self, key: &str) -> Result<Vec<String>> {
        let mut values = Vec::new();
        while let Some(value) = self.next_value(key)? {
            values.push(value);
        }
        Ok(values)
    }

    /// Advances by one row and extracts the named columns in `keys` order.
    /// Returns `None` once the cursor is exhausted.
    pub fn next_row(&mut self, keys: &[&str]) -> Result<Option<Vec<String>>> {
        let row = match self.rows.pop_front() {
            Some(row) => row,
            None => return Ok(None),
        };

        let mut values = Vec::with_capacity(keys.len());
        for key in keys {
            let index = self.column_index(key)?;
            let value = row
                .get(index)
                .cloned()
                .ok_or_else(|| SessionError::ColumnNotFound((*key).to_string()))?;
            values.push(value);
        }
        Ok(Some(values))
    }

    /// Advances to exhaustion, producing one tuple per remaining row with
    /// the named columns in `keys` order, preserving row order.
    pub fn drain_rows(&mut self, keys: &[&str]) -> Result<Vec<Vec<String>>> {
        let mut rows = Vec::new();
        while let Some(row) = self.next_row(keys)? {
            rows.push(row);
        }
        Ok(rows)
    }

    fn column_index(&self, key: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|column| column == key)
            .ok_or_else(|| SessionError::ColumnNotFound(key.to_string()))
    }
}
