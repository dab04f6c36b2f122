use std::ops::{Deref, DerefMut};

use log::{debug, warn};

use crate::{
    core::{
        config::ExportConfiguration,
        item::{CommandKind, Connection, DataSource},
        table::TabularResult,
    },
    error::ExportError,
};

/// Keeps a connection open for the duration of a fetch and guarantees it
/// is closed on every exit path.
///
/// [`ConnectionGuard::close`] closes explicitly and reports the error, if
/// any. When the guard is dropped without having been closed (an error
/// was propagated with `?`) the connection is closed in `Drop` and a close
/// failure is only logged, since the original error is the one that
/// matters.
pub struct ConnectionGuard {
    connection: Box<dyn Connection>,
    closed: bool,
}

impl ConnectionGuard {
    pub fn new(connection: Box<dyn Connection>) -> Self {
        Self {
            connection,
            closed: false,
        }
    }

    pub fn close(mut self) -> Result<(), ExportError> {
        self.closed = true;
        self.connection.close()
    }
}

impl Deref for ConnectionGuard {
    type Target = dyn Connection;

    fn deref(&self) -> &Self::Target {
        self.connection.as_ref()
    }
}

impl DerefMut for ConnectionGuard {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.connection.as_mut()
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        if !self.closed {
            self.closed = true;
            if let Err(error) = self.connection.close() {
                warn!("Unable to close connection: {}", error);
            }
        }
    }
}

/// Runs the configured query against a [`DataSource`] and materializes the
/// rows into a [`TabularResult`].
///
/// A single attempt is made per call. Either a fully populated table is
/// returned or an [`ExportError::DataSource`] describing what went wrong;
/// a partially filled table is never handed out.
///
/// # Examples
///
/// ```
/// use query_csv_export::core::config::ExportConfigurationBuilder;
/// use query_csv_export::core::executor::QueryExecutor;
/// use query_csv_export::item::memory::MemoryDataSource;
///
/// let source = MemoryDataSource::new(&["id", "name"])
///     .row(vec![1.into(), "Jane".into()]);
///
/// let configuration = ExportConfigurationBuilder::new()
///     .destination_path("people.csv")
///     .connection_info("memory")
///     .query_text("SELECT id, name FROM person")
///     .build()
///     .unwrap();
///
/// let table = QueryExecutor::new(&source).fetch(&configuration).unwrap();
///
/// assert_eq!(table.row_count(), 1);
/// assert_eq!(source.closed_connections(), 1);
/// ```
pub struct QueryExecutor<'a> {
    source: &'a dyn DataSource,
}

impl<'a> QueryExecutor<'a> {
    pub fn new(source: &'a dyn DataSource) -> Self {
        Self { source }
    }

    pub fn fetch(&self, configuration: &ExportConfiguration) -> Result<TabularResult, ExportError> {
        let kind = if configuration.is_stored_procedure {
            CommandKind::StoredProcedure
        } else {
            CommandKind::Text
        };

        debug!("Opening connection");
        let mut connection = ConnectionGuard::new(self.source.connect(&configuration.connection_info)?);

        let command = connection.prepare(&configuration.query_text, kind, configuration.timeout())?;
        debug!("Executing {:?} command: {}", command.kind, command.text);

        let table = {
            let mut stream = connection.execute(&command)?;
            let mut table = TabularResult::new();

            for column in stream.columns() {
                let name = unique_column_name(&table, column);
                if &name != column {
                    debug!("Column {} renamed to {}", column, name);
                }
                table.add_column(name).map_err(to_data_source_error)?;
            }

            while let Some(row) = stream.next_row() {
                table.add_row(row?).map_err(to_data_source_error)?;
            }

            table
        };

        connection.close()?;
        debug!(
            "Fetched {} rows of {} columns",
            table.row_count(),
            table.column_count()
        );

        Ok(table)
    }
}

fn to_data_source_error(error: crate::error::TableError) -> ExportError {
    ExportError::DataSource(error.to_string())
}

/// Returns `name`, or `name` followed by the smallest integer suffix that
/// is not already a column of `table`.
fn unique_column_name(table: &TabularResult, name: &str) -> String {
    if !table.has_column(name) {
        return name.to_string();
    }

    let mut suffix = 1;
    loop {
        let candidate = format!("{}{}", name, suffix);
        if !table.has_column(&candidate) {
            return candidate;
        }
        suffix += 1;
    }
}
