mod in_memory_test;
mod mysql;

pub use self::in_memory_test::{InMemoryTestDriver, RecordedQuery, RowSetBuilder};
pub use self::mysql::MysqlDriver;
