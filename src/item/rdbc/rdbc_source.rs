use std::{future::Future, time::Duration};

use log::{debug, warn};
use sqlx::{
    Any, AnyConnection, Column, Connection as _, Decode, Executor, Row, Type, TypeInfo, ValueRef,
    any::{AnyRow, install_default_drivers},
};
use tokio::runtime::{Builder, Runtime};

use crate::{
    core::{
        item::{Command, CommandKind, Connection, DataSource, RowStream, RowStreamResult},
        table::Value,
    },
    error::ExportError,
    item::rdbc::procedure_call,
};

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

fn to_data_source_error(error: sqlx::Error) -> ExportError {
    ExportError::DataSource(error.to_string())
}

/// Runs `future`, failing with a data source error once `timeout` elapses.
async fn with_timeout<F, T>(timeout: Option<Duration>, what: &str, future: F) -> Result<T, ExportError>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    let result = match timeout {
        Some(duration) => tokio::time::timeout(duration, future).await.map_err(|_| {
            ExportError::DataSource(format!(
                "{} timed out after {} s",
                what,
                duration.as_secs_f64()
            ))
        })?,
        None => future.await,
    };
    result.map_err(to_data_source_error)
}

/// A private current-thread runtime driving the async SQLx calls.
///
/// Calls block the current thread. From inside a multi-threaded tokio
/// runtime the wait happens in `block_in_place`, so the export can also be
/// started from async code.
struct BlockingRuntime {
    runtime: Option<Runtime>,
}

impl BlockingRuntime {
    fn new() -> Result<Self, ExportError> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|error| ExportError::DataSource(format!("unable to start runtime: {}", error)))?;

        Ok(Self {
            runtime: Some(runtime),
        })
    }

    fn block_on<F: Future>(&self, future: F) -> Result<F::Output, ExportError> {
        let runtime = self
            .runtime
            .as_ref()
            .ok_or_else(|| ExportError::DataSource("runtime already shut down".to_string()))?;

        let output = match tokio::runtime::Handle::try_current() {
            Ok(_) => tokio::task::block_in_place(|| runtime.block_on(future)),
            Err(_) => runtime.block_on(future),
        };
        Ok(output)
    }
}

impl Drop for BlockingRuntime {
    fn drop(&mut self) {
        // A runtime cannot be dropped from async code, shutting it down in the background can.
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

/// Data source opening SQLx connections from a database URL.
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
/// use query_csv_export::core::config::ExportConfigurationBuilder;
/// use query_csv_export::core::job::ExportJobBuilder;
/// use query_csv_export::item::rdbc::RdbcDataSource;
///
/// let source = RdbcDataSource::new().connect_timeout(Duration::from_secs(5));
///
/// let configuration = ExportConfigurationBuilder::new()
///     .destination_path("people.csv")
///     .connection_info("sqlite://people.db")
///     .query_text("SELECT id, name FROM person ORDER BY id")
///     .build()
///     .unwrap();
///
/// let outcome = ExportJobBuilder::new()
///     .configuration(configuration)
///     .data_source(&source)
///     .build()
///     .unwrap()
///     .run();
///
/// assert!(outcome.is_success());
/// ```
#[derive(Debug, Clone)]
pub struct RdbcDataSource {
    connect_timeout: Duration,
}

impl Default for RdbcDataSource {
    fn default() -> Self {
        Self::new()
    }
}

impl RdbcDataSource {
    pub fn new() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Maximum time to wait for the connection to be established.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

impl DataSource for RdbcDataSource {
    fn connect(&self, connection_info: &str) -> Result<Box<dyn Connection>, ExportError> {
        install_default_drivers();

        let runtime = BlockingRuntime::new()?;
        let connection = runtime.block_on(with_timeout(
            Some(self.connect_timeout),
            "connection",
            AnyConnection::connect(connection_info),
        ))??;

        debug!("Connected to {} database", connection.backend_name());

        Ok(Box::new(RdbcConnection {
            connection: Some(connection),
            runtime,
            abandoned: false,
        }))
    }
}

struct RdbcConnection {
    // Declared before the runtime so it is dropped first.
    connection: Option<AnyConnection>,
    runtime: BlockingRuntime,
    // Set when a command failed or timed out. The server may still be busy
    // with it, so closing must not wait for an answer.
    abandoned: bool,
}

fn closed_connection() -> ExportError {
    ExportError::DataSource("connection is closed".to_string())
}

impl Connection for RdbcConnection {
    fn prepare(
        &mut self,
        text: &str,
        kind: CommandKind,
        timeout: Option<Duration>,
    ) -> Result<Command, ExportError> {
        let connection = self.connection.as_ref().ok_or_else(closed_connection)?;

        let text = match kind {
            CommandKind::Text => text.to_string(),
            CommandKind::StoredProcedure => procedure_call(connection.backend_name(), text)?,
        };

        Ok(Command {
            text,
            kind,
            timeout,
        })
    }

    fn execute(&mut self, command: &Command) -> Result<Box<dyn RowStream + '_>, ExportError> {
        let connection = self.connection.as_mut().ok_or_else(closed_connection)?;
        let text = command.text.as_str();

        let result = self.runtime.block_on(async {
            let rows: Vec<AnyRow> = with_timeout(
                command.timeout,
                "query",
                sqlx::query(text).fetch_all(&mut *connection),
            )
            .await?;

            let columns: Vec<String> = match rows.first() {
                Some(row) => row
                    .columns()
                    .iter()
                    .map(|column| column.name().to_string())
                    .collect(),
                None => match (&mut *connection).describe(text).await {
                    Ok(describe) => describe
                        .columns()
                        .iter()
                        .map(|column| column.name().to_string())
                        .collect(),
                    Err(error) => {
                        warn!("Unable to describe columns of an empty result: {}", error);
                        Vec::new()
                    }
                },
            };

            Ok::<_, ExportError>((columns, rows))
        });

        let (columns, rows) = match result.and_then(|fetched| fetched) {
            Ok(fetched) => fetched,
            Err(error) => {
                self.abandoned = true;
                return Err(error);
            }
        };

        debug!("Query returned {} rows", rows.len());

        Ok(Box::new(RdbcRowStream {
            columns,
            rows: rows.into_iter(),
        }))
    }

    fn close(&mut self) -> Result<(), ExportError> {
        match self.connection.take() {
            Some(connection) if self.abandoned => {
                debug!("Dropping connection without waiting for the pending command");
                let _guard = self.runtime.runtime.as_ref().map(Runtime::enter);
                drop(connection);
                Ok(())
            }
            Some(connection) => self
                .runtime
                .block_on(connection.close())?
                .map_err(to_data_source_error),
            None => Ok(()),
        }
    }
}

impl Drop for RdbcConnection {
    fn drop(&mut self) {
        if let (Some(connection), Some(runtime)) = (self.connection.take(), &self.runtime.runtime) {
            let _guard = runtime.enter();
            drop(connection);
        }
    }
}

struct RdbcRowStream {
    columns: Vec<String>,
    rows: std::vec::IntoIter<AnyRow>,
}

impl RowStream for RdbcRowStream {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    fn next_row(&mut self) -> RowStreamResult {
        self.rows.next().map(|row| decode_row(&row))
    }
}

fn decode_row(row: &AnyRow) -> Result<Vec<Value>, ExportError> {
    (0..row.len()).map(|index| decode_value(row, index)).collect()
}

fn get<'r, T>(row: &'r AnyRow, index: usize) -> Result<T, ExportError>
where
    T: Decode<'r, Any> + Type<Any>,
{
    row.try_get(index).map_err(to_data_source_error)
}

fn decode_value(row: &AnyRow, index: usize) -> Result<Value, ExportError> {
    let raw = row.try_get_raw(index).map_err(to_data_source_error)?;
    if raw.is_null() {
        return Ok(Value::Null);
    }
    let type_name = raw.type_info().name().to_string();

    let value = match type_name.as_str() {
        "BOOLEAN" => Value::Boolean(get(row, index)?),
        "SMALLINT" => Value::Integer(get::<i16>(row, index)?.into()),
        "INTEGER" => Value::Integer(get::<i32>(row, index)?.into()),
        "BIGINT" => Value::Integer(get(row, index)?),
        "REAL" => Value::Float(get::<f32>(row, index)?.into()),
        "DOUBLE" => Value::Float(get(row, index)?),
        "TEXT" => Value::Text(get(row, index)?),
        "BLOB" => Value::Bytes(get(row, index)?),
        other => {
            return Err(ExportError::DataSource(format!(
                "column '{}' has unsupported type {}",
                row.columns()[index].name(),
                other
            )));
        }
    };

    Ok(value)
}
