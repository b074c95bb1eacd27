mod driver;

pub use driver::{Connection, Driver, PreparedStatement, Statement};
