use std::{
    cell::{Cell, RefCell},
    rc::Rc,
    sync::mpsc::{self, Receiver, RecvTimeoutError, Sender},
    time::Duration,
};

use log::debug;

use crate::{
    core::{
        item::{Command, CommandKind, Connection, DataSource, RowStream, RowStreamResult},
        table::Value,
    },
    error::ExportError,
};

/// A data source answering every command with a fixed set of rows.
///
/// Useful to exercise exports without a database and to observe how the
/// executor uses its connections: the source counts opened and closed
/// connections and remembers the last prepared command. Failures can be
/// injected on connect or execute, and [`MemoryDataSource::unresponsive`]
/// simulates a server that never answers, in which case the command
/// timeout is the only thing that ends the wait.
///
/// # Examples
///
/// ```
/// use query_csv_export::core::item::{CommandKind, DataSource};
/// use query_csv_export::item::memory::MemoryDataSource;
///
/// let source = MemoryDataSource::new(&["id"]).row(vec![1.into()]);
///
/// let mut connection = source.connect("memory").unwrap();
/// let command = connection.prepare("SELECT id", CommandKind::Text, None).unwrap();
/// let mut rows = connection.execute(&command).unwrap();
///
/// assert_eq!(rows.columns(), &["id".to_string()]);
/// assert!(rows.next_row().is_some());
/// assert!(rows.next_row().is_none());
/// ```
#[derive(Default)]
pub struct MemoryDataSource {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
    connect_error: Option<String>,
    execute_error: Option<String>,
    unresponsive: bool,
    opened: Rc<Cell<usize>>,
    closed: Rc<Cell<usize>>,
    last_command: Rc<RefCell<Option<Command>>>,
}

impl MemoryDataSource {
    pub fn new(columns: &[&str]) -> Self {
        Self {
            columns: columns.iter().map(|column| column.to_string()).collect(),
            ..Self::default()
        }
    }

    /// Adds a row returned by every execution. Rows are not checked
    /// against the columns so malformed results can be simulated.
    pub fn row(mut self, values: Vec<Value>) -> Self {
        self.rows.push(values);
        self
    }

    pub fn fail_on_connect(mut self, message: impl Into<String>) -> Self {
        self.connect_error = Some(message.into());
        self
    }

    pub fn fail_on_execute(mut self, message: impl Into<String>) -> Self {
        self.execute_error = Some(message.into());
        self
    }

    /// Executions never get an answer; they fail once the command timeout elapses.
    pub fn unresponsive(mut self) -> Self {
        self.unresponsive = true;
        self
    }

    pub fn opened_connections(&self) -> usize {
        self.opened.get()
    }

    pub fn closed_connections(&self) -> usize {
        self.closed.get()
    }

    pub fn last_command(&self) -> Option<Command> {
        self.last_command.borrow().clone()
    }
}

impl DataSource for MemoryDataSource {
    fn connect(&self, connection_info: &str) -> Result<Box<dyn Connection>, ExportError> {
        if let Some(message) = &self.connect_error {
            return Err(ExportError::DataSource(message.clone()));
        }

        debug!("Connected to in-memory source {}", connection_info);
        self.opened.set(self.opened.get() + 1);

        Ok(Box::new(MemoryConnection {
            columns: self.columns.clone(),
            rows: self.rows.clone(),
            execute_error: self.execute_error.clone(),
            unresponsive: self.unresponsive,
            closed: Rc::clone(&self.closed),
            last_command: Rc::clone(&self.last_command),
            silence: mpsc::channel(),
        }))
    }
}

struct MemoryConnection {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
    execute_error: Option<String>,
    unresponsive: bool,
    closed: Rc<Cell<usize>>,
    last_command: Rc<RefCell<Option<Command>>>,
    // Nothing is ever sent: waiting on the receiver only ends with the timeout.
    silence: (Sender<()>, Receiver<()>),
}

impl MemoryConnection {
    fn wait_for_answer(&self, timeout: Option<Duration>) -> ExportError {
        let (_, receiver) = &self.silence;
        match timeout {
            Some(timeout) => match receiver.recv_timeout(timeout) {
                Err(RecvTimeoutError::Timeout) | Ok(()) => ExportError::DataSource(format!(
                    "execution timed out after {} s",
                    timeout.as_secs_f64()
                )),
                Err(RecvTimeoutError::Disconnected) => {
                    ExportError::DataSource("connection lost".to_string())
                }
            },
            None => {
                let _ = receiver.recv();
                ExportError::DataSource("connection lost".to_string())
            }
        }
    }
}

impl Connection for MemoryConnection {
    fn prepare(
        &mut self,
        text: &str,
        kind: CommandKind,
        timeout: Option<Duration>,
    ) -> Result<Command, ExportError> {
        let command = Command {
            text: text.to_string(),
            kind,
            timeout,
        };
        *self.last_command.borrow_mut() = Some(command.clone());
        Ok(command)
    }

    fn execute(&mut self, command: &Command) -> Result<Box<dyn RowStream + '_>, ExportError> {
        if self.unresponsive {
            return Err(self.wait_for_answer(command.timeout));
        }

        if let Some(message) = &self.execute_error {
            return Err(ExportError::DataSource(message.clone()));
        }

        Ok(Box::new(MemoryRowStream {
            columns: &self.columns,
            rows: self.rows.iter(),
        }))
    }

    fn close(&mut self) -> Result<(), ExportError> {
        self.closed.set(self.closed.get() + 1);
        Ok(())
    }
}

struct MemoryRowStream<'a> {
    columns: &'a [String],
    rows: std::slice::Iter<'a, Vec<Value>>,
}

impl RowStream for MemoryRowStream<'_> {
    fn columns(&self) -> &[String] {
        self.columns
    }

    fn next_row(&mut self) -> RowStreamResult {
        self.rows.next().map(|row| Ok(row.clone()))
    }
}
