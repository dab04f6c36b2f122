use std::{
    fmt,
    time::{Duration, Instant},
};

use log::{debug, error, info};
use uuid::Uuid;

use crate::{
    core::{
        build_name,
        config::ExportConfiguration,
        executor::QueryExecutor,
        item::{DataSource, Destination},
        table::TabularResult,
    },
    error::ExportError,
    item::{csv::csv_writer::CsvSerializer, fs::FileSystem},
};

/// The states an export job goes through.
///
/// ```text
/// Constructed -> Validated -> Fetched -> Written
///      \______________\___________\________> Failed
/// ```
///
/// `Written` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportState {
    Constructed,
    Validated,
    Fetched,
    Written,
    Failed,
}

impl fmt::Display for ExportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExportState::Constructed => "Constructed",
            ExportState::Validated => "Validated",
            ExportState::Fetched => "Fetched",
            ExportState::Written => "Written",
            ExportState::Failed => "Failed",
        };
        f.write_str(name)
    }
}

/// Represents the execution of a job.
///
/// This information is useful for monitoring and reporting on job performance.
#[derive(Debug, Clone)]
pub struct JobExecution {
    /// Unique identifier of the job instance
    pub id: Uuid,
    /// Human-readable name of the job
    pub name: String,
    /// The time when the job started executing
    pub start: Instant,
    /// The time when the job finished executing
    pub end: Instant,
    /// The total duration of the job execution
    pub duration: Duration,
}

/// The result of running an [`ExportJob`].
///
/// Either the file was written, in which case the exported table is
/// available, or the job failed. A failed outcome carries the error, the
/// last state the job reached before failing and, when the query had
/// already run, the fetched table.
#[derive(Debug)]
pub enum ExportOutcome {
    Written {
        table: TabularResult,
        execution: JobExecution,
    },
    Failed {
        error: ExportError,
        /// Last state reached before the failure.
        failed_in: ExportState,
        table: Option<TabularResult>,
        execution: JobExecution,
    },
}

impl ExportOutcome {
    /// Terminal state of the job: `Written` or `Failed`.
    pub fn state(&self) -> ExportState {
        match self {
            ExportOutcome::Written { .. } => ExportState::Written,
            ExportOutcome::Failed { .. } => ExportState::Failed,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ExportOutcome::Written { .. })
    }

    /// The error that ended the job, `None` on success.
    pub fn last_error(&self) -> Option<&ExportError> {
        match self {
            ExportOutcome::Written { .. } => None,
            ExportOutcome::Failed { error, .. } => Some(error),
        }
    }

    /// The fetched table, if the query ran successfully.
    pub fn table(&self) -> Option<&TabularResult> {
        match self {
            ExportOutcome::Written { table, .. } => Some(table),
            ExportOutcome::Failed { table, .. } => table.as_ref(),
        }
    }

    pub fn into_table(self) -> Option<TabularResult> {
        match self {
            ExportOutcome::Written { table, .. } => Some(table),
            ExportOutcome::Failed { table, .. } => table,
        }
    }

    pub fn execution(&self) -> &JobExecution {
        match self {
            ExportOutcome::Written { execution, .. } => execution,
            ExportOutcome::Failed { execution, .. } => execution,
        }
    }

    pub fn into_result(self) -> Result<TabularResult, ExportError> {
        match self {
            ExportOutcome::Written { table, .. } => Ok(table),
            ExportOutcome::Failed { error, .. } => Err(error),
        }
    }
}

/// Exports the result of one query to one delimited file.
///
/// The job validates its configuration, runs the query through a
/// [`QueryExecutor`], refuses empty results and hands the table to a
/// [`CsvSerializer`]. Running consumes the job: a job runs exactly once
/// and a new one is built to try again.
///
/// # Example
///
/// ```
/// use query_csv_export::core::config::ExportConfigurationBuilder;
/// use query_csv_export::core::job::{ExportJobBuilder, ExportState};
/// use query_csv_export::core::table::Value;
/// use query_csv_export::item::memory::MemoryDataSource;
///
/// let path = std::env::temp_dir().join("query_csv_export_doc_people.csv");
///
/// let source = MemoryDataSource::new(&["id", "name"])
///     .row(vec![1.into(), "Jane, A.".into()])
///     .row(vec![2.into(), Value::Null]);
///
/// let configuration = ExportConfigurationBuilder::new()
///     .destination_path(&path)
///     .connection_info("memory")
///     .query_text("SELECT id, name FROM person")
///     .build()
///     .unwrap();
///
/// let outcome = ExportJobBuilder::new()
///     .name("people-export")
///     .configuration(configuration)
///     .data_source(&source)
///     .build()
///     .unwrap()
///     .run();
///
/// assert_eq!(outcome.state(), ExportState::Written);
/// assert!(outcome.last_error().is_none());
/// assert_eq!(outcome.table().unwrap().row_count(), 2);
/// assert_eq!(
///     std::fs::read_to_string(&path).unwrap(),
///     "id,name\n1,\"Jane, A.\"\n2,\n"
/// );
/// ```
pub struct ExportJob<'a> {
    id: Uuid,
    name: String,
    configuration: ExportConfiguration,
    source: &'a dyn DataSource,
    destination: &'a dyn Destination,
}

/// Why a transition failed, and what the job had produced until then.
struct Failure {
    error: ExportError,
    failed_in: ExportState,
    table: Option<TabularResult>,
}

impl Failure {
    fn new(error: ExportError, failed_in: ExportState) -> Self {
        Self {
            error,
            failed_in,
            table: None,
        }
    }
}

impl<'a> ExportJob<'a> {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn configuration(&self) -> &ExportConfiguration {
        &self.configuration
    }

    /// Runs the job and returns its outcome.
    pub fn run(self) -> ExportOutcome {
        let start = Instant::now();

        info!("Start of job: {}, id: {}", self.name, self.id);

        let result = self
            .validate()
            .and_then(|()| self.fetch())
            .and_then(|table| self.write(table));

        let execution = JobExecution {
            id: self.id,
            name: self.name.clone(),
            start,
            end: Instant::now(),
            duration: start.elapsed(),
        };

        match result {
            Ok(table) => {
                info!(
                    "End of job: {}, id: {}, {} rows written to {}",
                    self.name,
                    self.id,
                    table.row_count(),
                    self.configuration.destination_path.display()
                );
                ExportOutcome::Written { table, execution }
            }
            Err(failure) => {
                error!(
                    "Job {} failed after state {}: {}",
                    self.name, failure.failed_in, failure.error
                );
                ExportOutcome::Failed {
                    error: failure.error,
                    failed_in: failure.failed_in,
                    table: failure.table,
                    execution,
                }
            }
        }
    }

    /// `Constructed -> Validated`
    fn validate(&self) -> Result<(), Failure> {
        self.configuration
            .validate()
            .map_err(|error| Failure::new(error, ExportState::Constructed))?;

        debug!("Job {}: {}", self.name, ExportState::Validated);
        Ok(())
    }

    /// `Validated -> Fetched`
    fn fetch(&self) -> Result<TabularResult, Failure> {
        let table = QueryExecutor::new(self.source)
            .fetch(&self.configuration)
            .map_err(|error| Failure::new(error, ExportState::Validated))?;

        if table.is_empty() {
            return Err(Failure {
                error: ExportError::EmptyResult,
                failed_in: ExportState::Validated,
                table: Some(table),
            });
        }

        debug!("Job {}: {}", self.name, ExportState::Fetched);
        Ok(table)
    }

    /// `Fetched -> Written`
    fn write(&self, table: TabularResult) -> Result<TabularResult, Failure> {
        let serializer = CsvSerializer::from_configuration(&self.configuration);

        match serializer.write_to(&table, self.destination, &self.configuration.destination_path) {
            Ok(()) => {
                debug!("Job {}: {}", self.name, ExportState::Written);
                Ok(table)
            }
            Err(error) => Err(Failure {
                error,
                failed_in: ExportState::Fetched,
                table: Some(table),
            }),
        }
    }
}

/// Builder for creating an export job.
///
/// The configuration and the data source are required. The destination
/// defaults to the local file system and the name to a random one.
pub struct ExportJobBuilder<'a> {
    name: Option<String>,
    configuration: Option<ExportConfiguration>,
    source: Option<&'a dyn DataSource>,
    destination: &'a dyn Destination,
}

impl Default for ExportJobBuilder<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> ExportJobBuilder<'a> {
    pub fn new() -> Self {
        Self {
            name: None,
            configuration: None,
            source: None,
            destination: &FileSystem,
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> ExportJobBuilder<'a> {
        self.name = Some(name.into());
        self
    }

    pub fn configuration(mut self, configuration: ExportConfiguration) -> ExportJobBuilder<'a> {
        self.configuration = Some(configuration);
        self
    }

    pub fn data_source(mut self, source: &'a dyn DataSource) -> ExportJobBuilder<'a> {
        self.source = Some(source);
        self
    }

    pub fn destination(mut self, destination: &'a dyn Destination) -> ExportJobBuilder<'a> {
        self.destination = destination;
        self
    }

    pub fn build(self) -> Result<ExportJob<'a>, ExportError> {
        let configuration = self
            .configuration
            .ok_or_else(|| ExportError::missing_parameter("configuration"))?;
        let source = self
            .source
            .ok_or_else(|| ExportError::missing_parameter("data_source"))?;

        Ok(ExportJob {
            id: Uuid::new_v4(),
            name: self.name.unwrap_or_else(build_name),
            configuration,
            source,
            destination: self.destination,
        })
    }
}
