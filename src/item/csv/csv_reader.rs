use std::{fs::File, io::Read, path::Path};

use csv::{ReaderBuilder, StringRecord};

use crate::{
    core::table::{TabularResult, Value},
    error::ExportError,
};

/// Loads a delimited file with a header line back into a [`TabularResult`].
///
/// Every non-empty field becomes a [`Value::Text`]; type information is
/// not part of the file format and is not recovered. Empty fields become
/// [`Value::Null`], as do fields equal to the null sentinel when one is
/// configured. This mirrors what [`CsvSerializer`] writes, which makes the
/// reader handy to check an export.
///
/// Only single-byte delimiters are supported.
///
/// [`CsvSerializer`]: crate::item::csv::csv_writer::CsvSerializer
///
/// # Examples
///
/// ```
/// use query_csv_export::core::table::Value;
/// use query_csv_export::item::csv::csv_reader::CsvTableReaderBuilder;
///
/// let data = "id,name\n1,\"Jane, A.\"\n2,\n";
///
/// let table = CsvTableReaderBuilder::new()
///     .from_reader(data.as_bytes())
///     .unwrap()
///     .read_table()
///     .unwrap();
///
/// assert_eq!(table.columns().collect::<Vec<_>>(), vec!["id", "name"]);
/// assert_eq!(table.value(0, 1), Some(&Value::from("Jane, A.")));
/// assert_eq!(table.value(1, 1), Some(&Value::Null));
/// ```
pub struct CsvTableReader<R> {
    reader: csv::Reader<R>,
    null_value: Option<String>,
}

impl<R: Read> CsvTableReader<R> {
    /// Consumes the whole input and returns the table.
    pub fn read_table(mut self) -> Result<TabularResult, ExportError> {
        let mut table = TabularResult::new();

        let headers = self.reader.headers().map_err(to_read_error)?.clone();
        for header in headers.iter() {
            table.add_column(header).map_err(to_read_error)?;
        }

        let mut record = StringRecord::new();
        while self.reader.read_record(&mut record).map_err(to_read_error)? {
            let values = record.iter().map(|field| self.to_value(field)).collect();
            table.add_row(values).map_err(to_read_error)?;
        }

        Ok(table)
    }

    fn to_value(&self, field: &str) -> Value {
        if field.is_empty() || self.null_value.as_deref() == Some(field) {
            Value::Null
        } else {
            Value::Text(field.to_string())
        }
    }
}

fn to_read_error(error: impl std::fmt::Display) -> ExportError {
    ExportError::Deserialization(error.to_string())
}

#[derive(Debug, Clone)]
pub struct CsvTableReaderBuilder {
    delimiter: String,
    null_value: Option<String>,
}

impl Default for CsvTableReaderBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CsvTableReaderBuilder {
    pub fn new() -> Self {
        Self {
            delimiter: ",".to_string(),
            null_value: None,
        }
    }

    pub fn delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = delimiter.into();
        self
    }

    pub fn null_value(mut self, sentinel: impl Into<String>) -> Self {
        self.null_value = Some(sentinel.into());
        self
    }

    pub fn from_path<P: AsRef<Path>>(self, path: P) -> Result<CsvTableReader<File>, ExportError> {
        let file = File::open(path.as_ref()).map_err(|error| {
            ExportError::Deserialization(format!("{}: {}", path.as_ref().display(), error))
        })?;
        self.from_reader(file)
    }

    pub fn from_reader<R: Read>(self, rdr: R) -> Result<CsvTableReader<R>, ExportError> {
        let delimiter = match self.delimiter.as_bytes() {
            [byte] => *byte,
            _ => {
                return Err(ExportError::Configuration(format!(
                    "reading requires a single-byte delimiter, got {:?}",
                    self.delimiter
                )));
            }
        };

        let reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(false)
            .delimiter(delimiter)
            .from_reader(rdr);

        Ok(CsvTableReader {
            reader,
            null_value: self.null_value,
        })
    }
}
