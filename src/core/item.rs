use std::{
    io::{self, Write},
    path::Path,
    time::Duration,
};

use crate::{core::table::Value, error::ExportError};

/// Type alias for the result of reading one row from a [`RowStream`].
///
/// - `Some(Ok(values))`: the next row
/// - `Some(Err(error))`: the row could not be fetched or decoded
/// - `None`: no more rows
pub type RowStreamResult = Option<Result<Vec<Value>, ExportError>>;

/// How the data source should interpret the command text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    /// Plain query text.
    Text,
    /// Name of a stored procedure, invoked by name.
    StoredProcedure,
}

/// A command ready to be executed on a [`Connection`].
///
/// `text` is what the data source will actually run, which may differ from
/// the configured query text (stored procedures are usually wrapped in a
/// call statement).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub text: String,
    pub kind: CommandKind,
    /// Maximum time to wait for the command. `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

/// Something that can open connections to a tabular data source.
///
/// Any relational database (or anything else able to answer a query with
/// rows) can be plugged into an export by implementing this trait and
/// [`Connection`].
pub trait DataSource {
    fn connect(&self, connection_info: &str) -> Result<Box<dyn Connection>, ExportError>;
}

/// An open connection to a data source.
pub trait Connection {
    /// Builds a command of the given kind. No rows are produced yet.
    fn prepare(
        &mut self,
        text: &str,
        kind: CommandKind,
        timeout: Option<Duration>,
    ) -> Result<Command, ExportError>;

    /// Runs the command and returns the rows it produced.
    fn execute(&mut self, command: &Command) -> Result<Box<dyn RowStream + '_>, ExportError>;

    /// Releases the connection. Called exactly once by the executor.
    fn close(&mut self) -> Result<(), ExportError> {
        Ok(())
    }
}

/// Rows returned by an executed command, read one at a time.
pub trait RowStream {
    /// Column names, in the order the data source returned them.
    fn columns(&self) -> &[String];

    fn next_row(&mut self) -> RowStreamResult;
}

/// Somewhere a serialized table can be written to.
pub trait Destination {
    fn open_for_write(&self, path: &Path) -> io::Result<Box<dyn Write>>;
}
