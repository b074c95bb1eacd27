use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::{Result, SessionError, SqlFailure};
use crate::traits::{Connection, Driver, PreparedStatement, Statement};
use crate::types::{RowSet, SqlValue};

/// A recorded statement execution for verification.
///
/// Plain queries record an empty parameter list; prepared executions record
/// the bound values in position order.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedQuery {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

#[derive(Debug, Default)]
struct DriverState {
    outcomes: VecDeque<std::result::Result<RowSet, SqlFailure>>,
    default_response: Option<RowSet>,
    connect_error: Option<SqlFailure>,
    schema_error: Option<SqlFailure>,
    recorded_queries: Vec<RecordedQuery>,
    selected_schemas: Vec<String>,
    open_connections: usize,
}

impl DriverState {
    fn execute(&mut self, sql: &str, params: Vec<SqlValue>) -> Result<RowSet> {
        // Record the execution, whatever its scripted outcome.
        self.recorded_queries.push(RecordedQuery {
            sql: sql.to_string(),
            params,
        });

        match self.outcomes.pop_front() {
            Some(Ok(response)) => Ok(response),
            Some(Err(failure)) => Err(SessionError::Query(failure)),
            None => Ok(self
                .default_response
                .clone()
                .unwrap_or_else(RowSet::empty)),
        }
    }
}

/// An in-memory database driver for testing.
///
/// Allows scripting connection, schema and query outcomes, verifying the
/// statements a session executed, and counting the connection handles still
/// open.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use sqlsess::drivers::{InMemoryTestDriver, RowSetBuilder};
///
/// let driver = Arc::new(
///     InMemoryTestDriver::new().with_response(
///         RowSetBuilder::new()
///             .columns(&["id", "name"])
///             .row(&["1", "Alice"])
///             .build(),
///     ),
/// );
/// ```
pub struct InMemoryTestDriver {
    state: Arc<Mutex<DriverState>>,
}

impl InMemoryTestDriver {
    /// Create a new in-memory test driver with no scripted outcomes.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(DriverState::default())),
        }
    }

    /// Queue a result to be returned by the next executed statement.
    /// Outcomes are consumed in FIFO order.
    pub fn with_response(self, response: RowSet) -> Self {
        self.state.lock().unwrap().outcomes.push_back(Ok(response));
        self
    }

    /// Queue results for subsequent executed statements.
    pub fn with_responses(self, responses: impl IntoIterator<Item = RowSet>) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            for response in responses {
                state.outcomes.push_back(Ok(response));
            }
        }
        self
    }

    /// Queue a driver failure for the next executed statement.
    pub fn with_error(self, failure: SqlFailure) -> Self {
        self.state.lock().unwrap().outcomes.push_back(Err(failure));
        self
    }

    /// Set a result to use when no queued outcomes remain.
    pub fn with_default_response(self, response: RowSet) -> Self {
        self.state.lock().unwrap().default_response = Some(response);
        self
    }

    /// Make the next connection attempt fail with `failure`.
    pub fn with_connect_error(self, failure: SqlFailure) -> Self {
        self.state.lock().unwrap().connect_error = Some(failure);
        self
    }

    /// Make the next schema switch fail with `failure`.
    pub fn with_schema_error(self, failure: SqlFailure) -> Self {
        self.state.lock().unwrap().schema_error = Some(failure);
        self
    }

    /// Get all recorded statement executions.
    pub fn recorded_queries(&self) -> Vec<RecordedQuery> {
        self.state.lock().unwrap().recorded_queries.clone()
    }

    /// Get the last recorded statement execution, if any.
    pub fn last_query(&self) -> Option<RecordedQuery> {
        self.state.lock().unwrap().recorded_queries.last().cloned()
    }

    /// Get the schema names selected on connections of this driver, in order.
    pub fn selected_schemas(&self) -> Vec<String> {
        self.state.lock().unwrap().selected_schemas.clone()
    }

    /// Number of connection handles opened and not yet closed or dropped.
    pub fn open_connections(&self) -> usize {
        self.state.lock().unwrap().open_connections
    }

    /// Assert that the last executed statement matches the expected SQL and
    /// parameters.
    pub fn assert_last_query(&self, expected_sql: &str, expected_params: &[SqlValue]) {
        let last = self.last_query().expect("No queries were recorded");
        assert_eq!(
            last.sql, expected_sql,
            "SQL mismatch.\nExpected: {}\nActual: {}",
            expected_sql, last.sql
        );
        assert_eq!(
            last.params, expected_params,
            "Parameters mismatch.\nExpected: {:?}\nActual: {:?}",
            expected_params, last.params
        );
    }

    /// Assert that exactly n statements were executed.
    pub fn assert_query_count(&self, expected: usize) {
        let actual = self.state.lock().unwrap().recorded_queries.len();
        assert_eq!(
            actual, expected,
            "Query count mismatch. Expected: {}, Actual: {}",
            expected, actual
        );
    }
}

impl Default for InMemoryTestDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl Driver for InMemoryTestDriver {
    fn open_connection(
        &self,
        _host: &str,
        _user: &str,
        _password: &str,
    ) -> Result<Box<dyn Connection>> {
        let mut state = self.state.lock().unwrap();
        if let Some(failure) = state.connect_error.take() {
            return Err(SessionError::Connection(failure));
        }
        state.open_connections += 1;
        drop(state);

        Ok(Box::new(InMemoryConnection {
            state: Arc::clone(&self.state),
            alive: Arc::new(AtomicBool::new(true)),
        }))
    }
}

fn closed_failure() -> SessionError {
    SessionError::Query(SqlFailure::new(0, "HY000", "connection is closed"))
}

struct InMemoryConnection {
    state: Arc<Mutex<DriverState>>,
    alive: Arc<AtomicBool>,
}

impl InMemoryConnection {
    fn release(&mut self) {
        // First of close/drop wins; the connection count drops exactly once.
        if self.alive.swap(false, Ordering::SeqCst) {
            self.state.lock().unwrap().open_connections -= 1;
        }
    }
}

impl Connection for InMemoryConnection {
    fn set_schema(&mut self, name: &str) -> Result<()> {
        if !self.alive.load(Ordering::SeqCst) {
            return Err(closed_failure());
        }
        let mut state = self.state.lock().unwrap();
        if let Some(failure) = state.schema_error.take() {
            return Err(SessionError::Query(failure));
        }
        state.selected_schemas.push(name.to_string());
        Ok(())
    }

    fn create_statement(&mut self) -> Result<Box<dyn Statement>> {
        if !self.alive.load(Ordering::SeqCst) {
            return Err(closed_failure());
        }
        Ok(Box::new(InMemoryStatement {
            state: Arc::clone(&self.state),
            alive: Arc::clone(&self.alive),
        }))
    }

    fn prepare_statement(&mut self, sql: &str) -> Result<Box<dyn PreparedStatement>> {
        if !self.alive.load(Ordering::SeqCst) {
            return Err(closed_failure());
        }
        Ok(Box::new(InMemoryPrepared {
            state: Arc::clone(&self.state),
            alive: Arc::clone(&self.alive),
            sql: sql.to_string(),
            params: Vec::new(),
        }))
    }

    fn close(&mut self) -> Result<()> {
        self.release();
        Ok(())
    }
}

impl Drop for InMemoryConnection {
    fn drop(&mut self) {
        self.release();
    }
}

struct InMemoryStatement {
    state: Arc<Mutex<DriverState>>,
    alive: Arc<AtomicBool>,
}

impl Statement for InMemoryStatement {
    fn execute_query(&mut self, sql: &str) -> Result<RowSet> {
        if !self.alive.load(Ordering::SeqCst) {
            return Err(closed_failure());
        }
        self.state.lock().unwrap().execute(sql, Vec::new())
    }
}

struct InMemoryPrepared {
    state: Arc<Mutex<DriverState>>,
    alive: Arc<AtomicBool>,
    sql: String,
    params: Vec<Option<SqlValue>>,
}

impl PreparedStatement for InMemoryPrepared {
    fn bind(&mut self, position: u16, value: SqlValue) -> Result<()> {
        if position == 0 {
            return Err(SessionError::Query(SqlFailure::new(
                0,
                "HY000",
                "parameter positions are 1-indexed",
            )));
        }
        let index = position as usize - 1;
        if index >= self.params.len() {
            self.params.resize(index + 1, None);
        }
        self.params[index] = Some(value);
        Ok(())
    }

    fn execute_query(&mut self) -> Result<RowSet> {
        if !self.alive.load(Ordering::SeqCst) {
            return Err(closed_failure());
        }

        let mut values = Vec::with_capacity(self.params.len());
        for (index, slot) in self.params.iter().enumerate() {
            match slot {
                Some(value) => values.push(value.clone()),
                None => {
                    return Err(SessionError::Query(SqlFailure::new(
                        0,
                        "HY000",
                        format!("no value bound for parameter {}", index + 1),
                    )))
                }
            }
        }
        self.state.lock().unwrap().execute(&self.sql, values)
    }
}

/// Builder for creating result fixtures easily.
pub struct RowSetBuilder {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl RowSetBuilder {
    pub fn new() -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    /// Set the column names for the result.
    pub fn columns(mut self, cols: &[&str]) -> Self {
        self.columns = cols.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Add a row of text values.
    pub fn row(mut self, values: &[&str]) -> Self {
        self.rows
            .push(values.iter().map(|s| s.to_string()).collect());
        self
    }

    /// Build the RowSet.
    pub fn build(self) -> RowSet {
        RowSet::new(self.columns, self.rows)
    }
}

impl Default for RowSetBuilder {
    fn default() -> Self {
        Self::new()
    }
}
