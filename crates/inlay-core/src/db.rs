use crate::{error::BoxError, value::SqlValue};

///
/// Changes
/// Outcome of one non-SELECT statement execution.
///

#[derive(Clone, Copy, Debug, Default)]
pub struct Changes {
    pub rows_affected: u64,
    /// Row id generated by an INSERT, when the backend produced one.
    pub last_insert_id: Option<i64>,
}

///
/// Row
///
/// One result row of a SELECT. Column values are addressable by ordinal
/// (projection order) and by name; duplicate-column reads go by name.
///

pub trait Row {
    fn column_count(&self) -> usize;

    /// Value at the given projection ordinal.
    fn value(&self, ordinal: usize) -> Option<&SqlValue>;

    /// Value of the named column.
    fn value_named(&self, column: &str) -> Option<&SqlValue>;
}

/// Rows of a SELECT, yielded one at a time so peak memory stays bounded to a
/// single raw row plus the record being decoded. Rows are materialized
/// values; only the iterator itself may borrow the connection.
pub type RowStream<'a> = Box<dyn Iterator<Item = Result<Box<dyn Row>, BoxError>> + 'a>;

///
/// Database
///
/// The execution collaborator. The engine builds statement text and parameter
/// lists; connection handling, preparation, and transactions live behind this
/// trait.
///

pub trait Database {
    /// Execute a parameter-free SQL batch (schema setup, raw scripting).
    fn batch(&self, sql: &str) -> Result<(), BoxError>;

    /// Prepare, bind, and execute one parameterized statement.
    fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<Changes, BoxError>;

    /// Prepare, bind, and stream the rows of a SELECT.
    fn rows<'a>(&'a self, sql: &str, params: &[SqlValue]) -> Result<RowStream<'a>, BoxError>;
}
