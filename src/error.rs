use thiserror::Error;

#[derive(Error, Debug)]
/// Export error
///
/// Every failure of an export ends up as one of these variants. The variant
/// is the kind of failure, the display string is the message reported to
/// the caller.
pub enum ExportError {
    /// A required configuration field is missing or invalid. Raised before any I/O.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Connecting to, preparing or executing a command on the data source failed.
    #[error("Data source error: {0}")]
    DataSource(String),

    /// The query succeeded but returned no rows.
    #[error("The target table is empty.")]
    EmptyResult,

    /// The destination could not be opened or written.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A delimited file could not be read back into a table.
    #[error("Deserialization error: {0}")]
    Deserialization(String),
}

impl ExportError {
    pub(crate) fn missing_parameter(name: &str) -> Self {
        ExportError::Configuration(format!("Parameter '{}' is required.", name))
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
/// Violations of the tabular result contract.
pub enum TableError {
    #[error("column '{0}' cannot be added once rows exist")]
    ColumnsSealed(String),

    #[error("duplicate column name '{0}'")]
    DuplicateColumn(String),

    #[error("row has {actual} values but the table has {expected} columns")]
    ArityMismatch { expected: usize, actual: usize },
}
