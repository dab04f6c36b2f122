use std::{fs::File, io::BufReader, path::Path, path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};

use crate::error::ExportError;

pub const DEFAULT_DELIMITER: &str = ",";
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 300;

/// Sequence written after every line of the output file, including the last one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineTerminator {
    #[default]
    Lf,
    CrLf,
}

impl LineTerminator {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineTerminator::Lf => "\n",
            LineTerminator::CrLf => "\r\n",
        }
    }
}

/// Character encoding of the output file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Encoding {
    #[default]
    #[serde(rename = "utf-8")]
    Utf8,
    /// UTF-8 preceded by a byte-order mark.
    #[serde(rename = "utf-8-bom")]
    Utf8Bom,
}

/// Everything an export needs to know: where the data comes from, which
/// query to run and how the file should look.
///
/// Build it with [`ExportConfigurationBuilder`] or load it from JSON with
/// [`ExportConfiguration::from_json_str`]; both validate the result. The
/// fields stay public so a configuration can be inspected or tweaked, and
/// the export job validates again before doing any I/O.
///
/// # JSON representation
///
/// ```json
/// {
///   "destination_path": "/tmp/people.csv",
///   "connection_info": "sqlite://people.db",
///   "query_text": "SELECT id, name FROM person",
///   "delimiter": ";",
///   "is_stored_procedure": false,
///   "timeout_seconds": 60,
///   "line_terminator": "crlf",
///   "null_value": "NULL",
///   "encoding": "utf-8-bom"
/// }
/// ```
///
/// Only the first three fields are mandatory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportConfiguration {
    pub destination_path: PathBuf,
    pub connection_info: String,
    pub query_text: String,
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
    #[serde(default)]
    pub is_stored_procedure: bool,
    /// `0` disables the timeout.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default)]
    pub line_terminator: LineTerminator,
    /// Written instead of an empty field for null values, when set.
    #[serde(default)]
    pub null_value: Option<String>,
    #[serde(default)]
    pub encoding: Encoding,
}

fn default_delimiter() -> String {
    DEFAULT_DELIMITER.to_string()
}

fn default_timeout_seconds() -> u64 {
    DEFAULT_TIMEOUT_SECONDS
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

impl ExportConfiguration {
    /// Checks the mandatory fields.
    ///
    /// Fields are checked in a fixed order (destination path, connection
    /// info, query text, delimiter) and the first failure is reported, so
    /// a given configuration always yields the same message.
    ///
    /// The delimiter may be whitespace (a tab is a common choice) but must
    /// not be empty, and it cannot contain a quote or a line break because
    /// those would make the quoting rule ambiguous.
    pub fn validate(&self) -> Result<(), ExportError> {
        if is_blank(&self.destination_path.to_string_lossy()) {
            return Err(ExportError::missing_parameter("destination_path"));
        }
        if is_blank(&self.connection_info) {
            return Err(ExportError::missing_parameter("connection_info"));
        }
        if is_blank(&self.query_text) {
            return Err(ExportError::missing_parameter("query_text"));
        }
        if self.delimiter.is_empty() {
            return Err(ExportError::missing_parameter("delimiter"));
        }
        if self.delimiter.contains(['"', '\r', '\n']) {
            return Err(ExportError::Configuration(
                "Parameter 'delimiter' must not contain quotes or line breaks.".to_string(),
            ));
        }
        Ok(())
    }

    /// The query timeout, or `None` when the timeout is disabled.
    pub fn timeout(&self) -> Option<Duration> {
        match self.timeout_seconds {
            0 => None,
            seconds => Some(Duration::from_secs(seconds)),
        }
    }

    /// Parses and validates a configuration from a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, ExportError> {
        let configuration: ExportConfiguration = serde_json::from_str(json)
            .map_err(|error| ExportError::Configuration(error.to_string()))?;
        configuration.validate()?;
        Ok(configuration)
    }

    /// Reads, parses and validates a configuration from a JSON file.
    pub fn from_json_path<P: AsRef<Path>>(path: P) -> Result<Self, ExportError> {
        let file = File::open(path.as_ref()).map_err(|error| {
            ExportError::Configuration(format!(
                "unable to open {}: {}",
                path.as_ref().display(),
                error
            ))
        })?;
        let configuration: ExportConfiguration =
            serde_json::from_reader(BufReader::new(file))
                .map_err(|error| ExportError::Configuration(error.to_string()))?;
        configuration.validate()?;
        Ok(configuration)
    }
}

/// Fluent builder for [`ExportConfiguration`].
///
/// # Examples
///
/// ```
/// use query_csv_export::core::config::ExportConfigurationBuilder;
///
/// let configuration = ExportConfigurationBuilder::new()
///     .destination_path("people.csv")
///     .connection_info("sqlite://people.db")
///     .query_text("SELECT id, name FROM person")
///     .delimiter(";")
///     .build()
///     .unwrap();
///
/// assert_eq!(configuration.timeout_seconds, 300);
/// assert!(!configuration.is_stored_procedure);
///
/// let error = ExportConfigurationBuilder::new()
///     .destination_path("people.csv")
///     .connection_info("sqlite://people.db")
///     .build()
///     .unwrap_err();
///
/// assert_eq!(
///     error.to_string(),
///     "Configuration error: Parameter 'query_text' is required."
/// );
/// ```
#[derive(Debug, Clone)]
pub struct ExportConfigurationBuilder {
    configuration: ExportConfiguration,
}

impl Default for ExportConfigurationBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ExportConfigurationBuilder {
    pub fn new() -> Self {
        Self {
            configuration: ExportConfiguration {
                destination_path: PathBuf::new(),
                connection_info: String::new(),
                query_text: String::new(),
                delimiter: default_delimiter(),
                is_stored_procedure: false,
                timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
                line_terminator: LineTerminator::default(),
                null_value: None,
                encoding: Encoding::default(),
            },
        }
    }

    pub fn destination_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.configuration.destination_path = path.into();
        self
    }

    pub fn connection_info(mut self, connection_info: impl Into<String>) -> Self {
        self.configuration.connection_info = connection_info.into();
        self
    }

    pub fn query_text(mut self, query_text: impl Into<String>) -> Self {
        self.configuration.query_text = query_text.into();
        self
    }

    pub fn delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.configuration.delimiter = delimiter.into();
        self
    }

    pub fn stored_procedure(mut self, yes: bool) -> Self {
        self.configuration.is_stored_procedure = yes;
        self
    }

    pub fn timeout_seconds(mut self, seconds: u64) -> Self {
        self.configuration.timeout_seconds = seconds;
        self
    }

    pub fn line_terminator(mut self, terminator: LineTerminator) -> Self {
        self.configuration.line_terminator = terminator;
        self
    }

    pub fn null_value(mut self, sentinel: impl Into<String>) -> Self {
        self.configuration.null_value = Some(sentinel.into());
        self
    }

    pub fn encoding(mut self, encoding: Encoding) -> Self {
        self.configuration.encoding = encoding;
        self
    }

    /// Validates and returns the configuration.
    pub fn build(self) -> Result<ExportConfiguration, ExportError> {
        self.configuration.validate()?;
        Ok(self.configuration)
    }
}
