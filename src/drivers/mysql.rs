use std::sync::{Arc, Mutex, MutexGuard};

use mysql::prelude::Queryable;
use mysql::{Conn, OptsBuilder, Row, Value};

use crate::error::{Result, SessionError, SqlFailure};
use crate::traits::{Connection, Driver, PreparedStatement, Statement};
use crate::types::{RowSet, SqlValue};

const DEFAULT_PORT: u16 = 3306;

/// The native connection, shared between the connection handle and the
/// statement handles it produced. `None` once the connection was closed.
type SharedConn = Arc<Mutex<Option<Conn>>>;

/// MySQL driver implementation using the `mysql` crate.
pub struct MysqlDriver;

impl MysqlDriver {
    pub fn new() -> Self {
        Self
    }
}

impl Default for MysqlDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl Driver for MysqlDriver {
    fn open_connection(
        &self,
        host: &str,
        user: &str,
        password: &str,
    ) -> Result<Box<dyn Connection>> {
        let (hostname, port) = split_host_port(host)?;
        let opts = OptsBuilder::new()
            .ip_or_hostname(Some(hostname))
            .tcp_port(port)
            .user(Some(user))
            .pass(Some(password));

        let conn = Conn::new(opts).map_err(connect_failure)?;
        Ok(Box::new(MysqlConnection {
            conn: Arc::new(Mutex::new(Some(conn))),
        }))
    }
}

struct MysqlConnection {
    conn: SharedConn,
}

impl Connection for MysqlConnection {
    fn set_schema(&mut self, name: &str) -> Result<()> {
        let mut guard = lock_conn(&self.conn)?;
        let conn = guard.as_mut().ok_or_else(closed_failure)?;
        conn.query_drop(format!("USE `{}`", name.replace('`', "``")))
            .map_err(query_failure)
    }

    fn create_statement(&mut self) -> Result<Box<dyn Statement>> {
        if lock_conn(&self.conn)?.is_none() {
            return Err(closed_failure());
        }
        Ok(Box::new(MysqlStatement {
            conn: Arc::clone(&self.conn),
        }))
    }

    fn prepare_statement(&mut self, sql: &str) -> Result<Box<dyn PreparedStatement>> {
        let mut guard = lock_conn(&self.conn)?;
        let conn = guard.as_mut().ok_or_else(closed_failure)?;
        let stmt = conn.prep(sql).map_err(query_failure)?;
        drop(guard);

        Ok(Box::new(MysqlPrepared {
            conn: Arc::clone(&self.conn),
            stmt,
            params: Vec::new(),
        }))
    }

    fn close(&mut self) -> Result<()> {
        // Dropping the native connection disconnects; surviving statement
        // handles report the connection as closed when used.
        lock_conn(&self.conn)?.take();
        Ok(())
    }
}

struct MysqlStatement {
    conn: SharedConn,
}

impl Statement for MysqlStatement {
    fn execute_query(&mut self, sql: &str) -> Result<RowSet> {
        let mut guard = lock_conn(&self.conn)?;
        let conn = guard.as_mut().ok_or_else(closed_failure)?;
        let rows: Vec<Row> = conn.query(sql).map_err(query_failure)?;
        Ok(materialize(rows))
    }
}

struct MysqlPrepared {
    conn: SharedConn,
    stmt: mysql::Statement,
    params: Vec<Option<SqlValue>>,
}

impl PreparedStatement for MysqlPrepared {
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
        // A gap in the bound positions is reported the way the native client
        // reports it: as a missing parameter at execution time.
        let mut values = Vec::with_capacity(self.params.len());
        for (index, slot) in self.params.iter().enumerate() {
            match slot {
                Some(value) => values.push(to_native(value)),
                None => {
                    return Err(SessionError::Query(SqlFailure::new(
                        0,
                        "HY000",
                        format!("no value bound for parameter {}", index + 1),
                    )))
                }
            }
        }

        let mut guard = lock_conn(&self.conn)?;
        let conn = guard.as_mut().ok_or_else(closed_failure)?;
        let rows: Vec<Row> = conn.exec(&self.stmt, values).map_err(query_failure)?;
        Ok(materialize(rows))
    }
}

fn lock_conn(conn: &SharedConn) -> Result<MutexGuard<'_, Option<Conn>>> {
    conn.lock()
        .map_err(|_| SessionError::Query(SqlFailure::new(0, "HY000", "connection lock poisoned")))
}

fn closed_failure() -> SessionError {
    SessionError::Query(SqlFailure::new(0, "HY000", "connection is closed"))
}

fn connect_failure(err: mysql::Error) -> SessionError {
    SessionError::Connection(to_failure(err))
}

fn query_failure(err: mysql::Error) -> SessionError {
    SessionError::Query(to_failure(err))
}

/// Map a native error to the code/SQLSTATE/message triple. Server errors
/// carry all three; client-side failures get the general SQLSTATE.
fn to_failure(err: mysql::Error) -> SqlFailure {
    match err {
        mysql::Error::MySqlError(e) => SqlFailure::new(e.code, e.state, e.message),
        other => SqlFailure::new(0, "HY000", other.to_string()),
    }
}

fn split_host_port(host: &str) -> Result<(String, u16)> {
    match host.rsplit_once(':') {
        Some((name, port)) => {
            let port = port.parse::<u16>().map_err(|_| {
                SessionError::Connection(SqlFailure::new(
                    0,
                    "HY000",
                    format!("invalid port in host address: {}", host),
                ))
            })?;
            Ok((name.to_string(), port))
        }
        None => Ok((host.to_string(), DEFAULT_PORT)),
    }
}

/// Convert a SqlValue to the native parameter value.
fn to_native(value: &SqlValue) -> Value {
    match value {
        SqlValue::Null => Value::NULL,
        SqlValue::Int32(n) => Value::Int(i64::from(*n)),
        SqlValue::Double(n) => Value::Double(*n),
        SqlValue::Text(s) => Value::Bytes(s.clone().into_bytes()),
        // Formatted date/time strings travel as text; the server parses them.
        SqlValue::DateTime(s) => Value::Bytes(s.clone().into_bytes()),
    }
}

/// Convert the native rows into the driver-agnostic materialized result.
fn materialize(rows: Vec<Row>) -> RowSet {
    let columns: Vec<String> = match rows.first() {
        Some(row) => row
            .columns_ref()
            .iter()
            .map(|column| column.name_str().into_owned())
            .collect(),
        None => Vec::new(),
    };

    let result_rows: Vec<Vec<String>> = rows
        .into_iter()
        .map(|row| row.unwrap().iter().map(value_text).collect())
        .collect();

    RowSet::new(columns, result_rows)
}

/// Convert a native value to text.
fn value_text(value: &Value) -> String {
    match value {
        Value::NULL => "NULL".to_string(),
        Value::Bytes(bytes) => String::from_utf8_lossy(bytes).into_owned(),
        Value::Int(n) => n.to_string(),
        Value::UInt(n) => n.to_string(),
        Value::Float(n) => n.to_string(),
        Value::Double(n) => n.to_string(),
        temporal => temporal.as_sql(true).trim_matches('\'').to_string(),
    }
}
