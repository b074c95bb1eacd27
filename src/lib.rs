//! sqlsess - A synchronous, driver-agnostic database session facade
//!
//! Wraps an underlying MySQL driver behind a small stateful session:
//! connect, select a database, execute raw or prepared read queries, and
//! fetch rows by column name. The sequence is mandatory (connect, then select
//! the database, then execute, then fetch), and every driver failure is
//! logged once and propagated unchanged.
//!
//! # Example
//! ```ignore
//! use sqlsess::{ConnectionParams, DbSession};
//!
//! let params = ConnectionParams::new("db:3306", "shop", "app", "secret");
//! let mut session = DbSession::new(params);
//!
//! session.connect()?;
//! session.select_database()?;
//!
//! session.prepare("SELECT name FROM users WHERE id=?")?;
//! session.bind_int(1, 42)?;
//! session.execute_prepared()?;
//!
//! if let Some(name) = session.fetch_one("name")? {
//!     println!("user 42 is {}", name);
//! }
//! session.close()?;
//! ```

pub mod drivers;
pub mod error;
pub mod traits;
pub mod types;

mod session;

// Re-export main types for convenient access
pub use error::{Result, SessionError, SqlFailure};
pub use session::{ConnectionParams, DbSession};
pub use traits::{Connection, Driver, PreparedStatement, Statement};
pub use types::{ResultCursor, RowSet, SqlValue};
