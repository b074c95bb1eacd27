mod row;
mod sql_value;

pub use row::{ResultCursor, RowSet};
pub use sql_value::SqlValue;
