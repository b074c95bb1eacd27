use crate::error::Result;
use crate::types::{RowSet, SqlValue};

/// Trait for database driver implementations.
/// Drivers are responsible for:
/// - Opening connections to the database
/// - Converting SqlValue parameters to native types
/// - Executing statements and materializing results into RowSet
///
/// Everything here is synchronous: each call blocks until the underlying
/// driver call completes.
pub trait Driver: Send + Sync {
    /// Open a connection to `host` (optionally `host:port`), authenticating
    /// with `user` and `password`.
    fn open_connection(
        &self,
        host: &str,
        user: &str,
        password: &str,
    ) -> Result<Box<dyn Connection>>;
}

/// A live connection handle produced by a [`Driver`].
pub trait Connection: Send {
    /// Switches the active schema scoping unqualified table references.
    fn set_schema(&mut self, name: &str) -> Result<()>;

    /// Creates a statement handle for raw-query execution on this connection.
    fn create_statement(&mut self) -> Result<Box<dyn Statement>>;

    /// Compiles `sql`, containing 1-indexed positional `?` placeholders,
    /// into a reusable prepared statement.
    fn prepare_statement(&mut self, sql: &str) -> Result<Box<dyn PreparedStatement>>;

    /// Closes the connection. Statement handles that outlive it report the
    /// connection as closed when used.
    fn close(&mut self) -> Result<()>;
}

/// A plain-statement handle bound to a connection.
pub trait Statement: Send {
    /// Executes `sql` as a read query and materializes the full result.
    fn execute_query(&mut self, sql: &str) -> Result<RowSet>;
}

/// A prepared-statement handle carrying its bound-parameter set.
pub trait PreparedStatement: Send {
    /// Binds `value` at the 1-indexed placeholder `position`, overwriting
    /// any value previously bound there.
    fn bind(&mut self, position: u16, value: SqlValue) -> Result<()>;

    /// Executes the statement with the currently bound parameters and
    /// materializes the full result.
    fn execute_query(&mut self) -> Result<RowSet>;
}
