use std::fmt;
use std::sync::Arc;

use crate::drivers::MysqlDriver;
use crate::error::{Result, SessionError};
use crate::traits::{Connection, Driver, PreparedStatement, Statement};
use crate::types::{ResultCursor, SqlValue};

/// Connection parameters for a database session: server host (optionally
/// `host:port`), database name, user and password. Immutable once built.
#[derive(Clone)]
pub struct ConnectionParams {
    host: String,
    db_name: String,
    user: String,
    password: String,
}

impl ConnectionParams {
    pub fn new(
        host: impl Into<String>,
        db_name: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            db_name: db_name.into(),
            user: user.into(),
            password: password.into(),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn db_name(&self) -> &str {
        &self.db_name
    }

    pub fn user(&self) -> &str {
        &self.user
    }
}

impl fmt::Debug for ConnectionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionParams")
            .field("host", &self.host)
            .field("db_name", &self.db_name)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// A stateful, single-threaded database session.
///
/// Owns the connection parameters and at most one live connection, plain
/// statement, prepared statement and result cursor, and drives the mandatory
/// connect / select database / execute / fetch sequence over the underlying
/// driver. Executing a statement replaces the prior cursor; dropping the
/// session releases every handle.
///
/// # Example
/// ```ignore
/// use sqlsess::{ConnectionParams, DbSession};
///
/// let params = ConnectionParams::new("db:3306", "shop", "app", "secret");
/// let mut session = DbSession::new(params);
///
/// session.connect()?;
/// session.select_database()?;
/// session.execute_query("SELECT id, name FROM users")?;
/// let rows = session.fetch_all_rows(&["id", "name"])?;
/// session.close()?;
/// ```
pub struct DbSession {
    params: ConnectionParams,
    driver: Arc<dyn Driver>,
    conn: Option<Box<dyn Connection>>,
    stmt: Option<Box<dyn Statement>>,
    prep: Option<Box<dyn PreparedStatement>>,
    cursor: Option<ResultCursor>,
}

impl DbSession {
    /// Create a session over the MySQL driver.
    pub fn new(params: ConnectionParams) -> Self {
        Self::with_driver(params, Arc::new(MysqlDriver::new()))
    }

    /// Create a session over a custom driver.
    /// Useful for testing or using alternative database drivers.
    pub fn with_driver(params: ConnectionParams, driver: Arc<dyn Driver>) -> Self {
        Self {
            params,
            driver,
            conn: None,
            stmt: None,
            prep: None,
            cursor: None,
        }
    }

    /// Connect to the database server using the stored parameters.
    /// Replaces (and thereby releases) any previous connection.
    pub fn connect(&mut self) -> Result<()> {
        let conn = self
            .driver
            .open_connection(&self.params.host, &self.params.user, &self.params.password)
            .map_err(report_failure)?;
        self.conn = Some(conn);
        Ok(())
    }

    /// Select the configured database as the active schema and set up the
    /// statement handle used for raw-query execution.
    pub fn select_database(&mut self) -> Result<()> {
        let conn = self
            .conn
            .as_mut()
            .ok_or_else(|| SessionError::precondition("select_database", "not connected"))?;
        conn.set_schema(&self.params.db_name)
            .map_err(report_failure)?;
        self.stmt = Some(conn.create_statement().map_err(report_failure)?);
        Ok(())
    }

    /// Close the connection. Statement and cursor handles are left for
    /// teardown; the session must not be reused afterwards except by
    /// reconnecting.
    pub fn close(&mut self) -> Result<()> {
        let conn = self
            .conn
            .as_mut()
            .ok_or_else(|| SessionError::precondition("close", "not connected"))?;
        conn.close().map_err(report_failure)
    }

    /// Execute `sql` as a read query against the active schema, replacing
    /// the session's result cursor.
    pub fn execute_query(&mut self, sql: &str) -> Result<()> {
        let stmt = self
            .stmt
            .as_mut()
            .ok_or_else(|| SessionError::precondition("execute_query", "statement not set"))?;
        let set = stmt.execute_query(sql).map_err(report_failure)?;
        self.cursor = Some(ResultCursor::new(set));
        Ok(())
    }

    /// Compile `query`, containing 1-indexed positional `?` placeholders,
    /// into a prepared statement, replacing any prior one.
    pub fn prepare(&mut self, query: &str) -> Result<()> {
        let conn = self
            .conn
            .as_mut()
            .ok_or_else(|| SessionError::precondition("prepare", "not connected"))?;
        self.prep = Some(conn.prepare_statement(query).map_err(report_failure)?);
        Ok(())
    }

    /// Bind an integer at the given placeholder position.
    pub fn bind_int(&mut self, position: u16, value: i32) -> Result<()> {
        self.bind_value("bind_int", position, SqlValue::Int32(value))
    }

    /// Bind a double at the given placeholder position.
    pub fn bind_double(&mut self, position: u16, value: f64) -> Result<()> {
        self.bind_value("bind_double", position, SqlValue::Double(value))
    }

    /// Bind a string at the given placeholder position.
    pub fn bind_string(&mut self, position: u16, value: &str) -> Result<()> {
        self.bind_value("bind_string", position, SqlValue::Text(value.to_string()))
    }

    /// Bind a date/time value, passed as a formatted string that the driver
    /// parses.
    pub fn bind_datetime(&mut self, position: u16, value: &str) -> Result<()> {
        self.bind_value("bind_datetime", position, SqlValue::DateTime(value.to_string()))
    }

    /// Bind SQL NULL at the given placeholder position, independent of the
    /// column's declared type.
    pub fn bind_null(&mut self, position: u16) -> Result<()> {
        self.bind_value("bind_null", position, SqlValue::Null)
    }

    /// Execute the prepared statement with the currently bound parameters,
    /// replacing the session's result cursor.
    pub fn execute_prepared(&mut self) -> Result<()> {
        let prep = self.prep.as_mut().ok_or_else(|| {
            SessionError::precondition("execute_prepared", "prepared statement not set")
        })?;
        let set = prep.execute_query().map_err(report_failure)?;
        self.cursor = Some(ResultCursor::new(set));
        Ok(())
    }

    /// Advance the cursor by one row and extract the column named `key` as
    /// text. Returns `None` once the result is exhausted.
    pub fn fetch_one(&mut self, key: &str) -> Result<Option<String>> {
        self.cursor_mut("fetch_one")?
            .next_value(key)
            .map_err(report_failure)
    }

    /// Advance the cursor to exhaustion, collecting the column named `key`
    /// from every remaining row in order. A call after exhaustion yields an
    /// empty vector.
    pub fn fetch_all(&mut self, key: &str) -> Result<Vec<String>> {
        self.cursor_mut("fetch_all")?
            .drain_values(key)
            .map_err(report_failure)
    }

    /// Advance the cursor by one row and extract the named columns in
    /// `keys` order. Returns `None` once the result is exhausted.
    pub fn fetch_one_row(&mut self, keys: &[&str]) -> Result<Option<Vec<String>>> {
        self.cursor_mut("fetch_one_row")?
            .next_row(keys)
            .map_err(report_failure)
    }

    /// Advance the cursor to exhaustion, producing one tuple per remaining
    /// row with the named columns in `keys` order.
    pub fn fetch_all_rows(&mut self, keys: &[&str]) -> Result<Vec<Vec<String>>> {
        self.cursor_mut("fetch_all_rows")?
            .drain_rows(keys)
            .map_err(report_failure)
    }

    fn bind_value(
        &mut self,
        operation: &'static str,
        position: u16,
        value: SqlValue,
    ) -> Result<()> {
        let prep = self
            .prep
            .as_mut()
            .ok_or_else(|| SessionError::precondition(operation, "prepared statement not set"))?;
        prep.bind(position, value).map_err(report_failure)
    }

    fn cursor_mut(&mut self, operation: &'static str) -> Result<&mut ResultCursor> {
        self.cursor
            .as_mut()
            .ok_or_else(|| SessionError::precondition(operation, "no result set"))
    }
}

/// Log a driver-reported failure once, at the point it surfaces, and hand it
/// back unchanged for the caller to act on.
fn report_failure(err: SessionError) -> SessionError {
    eprintln!("{}", err);
    err
}
