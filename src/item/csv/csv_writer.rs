use std::{
    borrow::Cow,
    io::{self, BufWriter, Write},
    path::Path,
};

use log::debug;

use crate::{
    core::{
        config::{DEFAULT_DELIMITER, Encoding, ExportConfiguration, LineTerminator},
        item::Destination,
        table::{TabularResult, Value},
    },
    error::ExportError,
    item::fs::FileSystem,
};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Quotes a field when the output would otherwise be ambiguous.
///
/// A field is wrapped in double quotes if it contains the delimiter, a
/// double quote, a carriage return or a line feed. Embedded double quotes
/// are doubled. Any other field is returned unchanged, without
/// allocating.
///
/// Only the delimiter as a whole triggers quoting. With a delimiter longer
/// than one character, a field ending with a prefix of the delimiter is
/// left unquoted, so `a|` followed by `b` with `||` is written as `a|||b`
/// and splitting that line from the left is ambiguous.
///
/// # Examples
///
/// ```
/// use query_csv_export::item::csv::csv_writer::escape_field;
///
/// assert_eq!(escape_field("plain", ","), "plain");
/// assert_eq!(escape_field("Jane, A.", ","), "\"Jane, A.\"");
/// assert_eq!(escape_field("Jane, A.", ";"), "Jane, A.");
/// assert_eq!(escape_field("say \"hi\"", ","), "\"say \"\"hi\"\"\"");
/// ```
pub fn escape_field<'a>(field: &'a str, delimiter: &str) -> Cow<'a, str> {
    let needs_quotes = field.contains(delimiter)
        || field.contains(|c| matches!(c, '"' | '\r' | '\n'));

    if !needs_quotes {
        return Cow::Borrowed(field);
    }

    let mut quoted = String::with_capacity(field.len() + 2);
    quoted.push('"');
    quoted.push_str(&field.replace('"', "\"\""));
    quoted.push('"');
    Cow::Owned(quoted)
}

/// Serializes a [`TabularResult`] into delimited text.
///
/// The output is one header line with the column names followed by one
/// line per row. Every line, the last one included, ends with the
/// configured terminator. Fields are escaped with [`escape_field`]; the
/// header is escaped the same way as the values.
///
/// Null values are written as an empty field, which makes them
/// indistinguishable from empty strings. When that matters, configure a
/// null sentinel with [`CsvSerializerBuilder::null_value`]: nulls are then
/// written as the sentinel (escaped like any other value) while empty
/// strings stay empty.
///
/// The serializer only reads the table, so serializing the same table
/// twice yields byte-identical output.
///
/// # Examples
///
/// ```
/// use query_csv_export::core::table::{TabularResult, Value};
/// use query_csv_export::item::csv::csv_writer::CsvSerializerBuilder;
///
/// let mut table = TabularResult::new();
/// table.add_column("id").unwrap();
/// table.add_column("name").unwrap();
/// table.add_row(vec![Value::from(1), Value::from("Jane, A.")]).unwrap();
/// table.add_row(vec![Value::from(2), Value::Null]).unwrap();
///
/// let serializer = CsvSerializerBuilder::new().build();
///
/// assert_eq!(
///     serializer.to_string(&table).unwrap(),
///     "id,name\n1,\"Jane, A.\"\n2,\n"
/// );
/// ```
#[derive(Debug, Clone)]
pub struct CsvSerializer {
    delimiter: String,
    terminator: LineTerminator,
    null_value: Option<String>,
    encoding: Encoding,
}

impl CsvSerializer {
    /// Creates a serializer matching the output settings of a configuration.
    pub fn from_configuration(configuration: &ExportConfiguration) -> Self {
        CsvSerializer {
            delimiter: configuration.delimiter.clone(),
            terminator: configuration.line_terminator,
            null_value: configuration.null_value.clone(),
            encoding: configuration.encoding,
        }
    }

    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }

    /// Writes the table to a file on the local file system.
    pub fn write<P: AsRef<Path>>(&self, table: &TabularResult, path: P) -> Result<(), ExportError> {
        self.write_to(table, &FileSystem, path.as_ref())
    }

    /// Writes the table to `path` through the given destination.
    ///
    /// If writing fails half way the destination may be left with a
    /// partial file; it is not removed.
    pub fn write_to(
        &self,
        table: &TabularResult,
        destination: &dyn Destination,
        path: &Path,
    ) -> Result<(), ExportError> {
        debug!("Writing {} rows to {}", table.row_count(), path.display());

        let writer = destination
            .open_for_write(path)
            .map_err(|error| serialization_error(path, error))?;

        self.serialize(table, writer)
            .map_err(|error| serialization_error(path, error))
    }

    /// Serializes the table into any writer and flushes it.
    pub fn serialize<W: Write>(&self, table: &TabularResult, writer: W) -> io::Result<()> {
        let mut writer = BufWriter::new(writer);

        if self.encoding == Encoding::Utf8Bom {
            writer.write_all(UTF8_BOM)?;
        }

        self.write_line(&mut writer, table.columns().map(Cow::Borrowed))?;

        for row in table.rows() {
            self.write_line(&mut writer, row.iter().map(|value| self.field_text(value)))?;
        }

        writer.flush()
    }

    /// Serializes the table into a string.
    ///
    /// A byte-order mark, when configured, is not part of the returned text.
    pub fn to_string(&self, table: &TabularResult) -> Result<String, ExportError> {
        let mut buffer = Vec::new();
        let serializer = CsvSerializer {
            encoding: Encoding::Utf8,
            ..self.clone()
        };
        serializer
            .serialize(table, &mut buffer)
            .map_err(|error| ExportError::Serialization(error.to_string()))?;

        String::from_utf8(buffer).map_err(|error| ExportError::Serialization(error.to_string()))
    }

    fn field_text<'v>(&'v self, value: &'v Value) -> Cow<'v, str> {
        match value.to_text() {
            Some(text) => text,
            None => Cow::Borrowed(self.null_value.as_deref().unwrap_or("")),
        }
    }

    fn write_line<'f, W, I>(&self, writer: &mut W, fields: I) -> io::Result<()>
    where
        W: Write,
        I: Iterator<Item = Cow<'f, str>>,
    {
        for (index, field) in fields.enumerate() {
            if index > 0 {
                writer.write_all(self.delimiter.as_bytes())?;
            }
            writer.write_all(escape_field(&field, &self.delimiter).as_bytes())?;
        }
        writer.write_all(self.terminator.as_str().as_bytes())
    }
}

fn serialization_error(path: &Path, error: io::Error) -> ExportError {
    ExportError::Serialization(format!("{}: {}", path.display(), error))
}

#[derive(Debug, Clone)]
pub struct CsvSerializerBuilder {
    delimiter: String,
    terminator: LineTerminator,
    null_value: Option<String>,
    encoding: Encoding,
}

impl Default for CsvSerializerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CsvSerializerBuilder {
    pub fn new() -> CsvSerializerBuilder {
        CsvSerializerBuilder {
            delimiter: DEFAULT_DELIMITER.to_string(),
            terminator: LineTerminator::Lf,
            null_value: None,
            encoding: Encoding::Utf8,
        }
    }

    /// Field separator. May be longer than one character.
    pub fn delimiter(mut self, delimiter: impl Into<String>) -> CsvSerializerBuilder {
        self.delimiter = delimiter.into();
        self
    }

    pub fn terminator(mut self, terminator: LineTerminator) -> CsvSerializerBuilder {
        self.terminator = terminator;
        self
    }

    pub fn null_value(mut self, sentinel: impl Into<String>) -> CsvSerializerBuilder {
        self.null_value = Some(sentinel.into());
        self
    }

    pub fn encoding(mut self, encoding: Encoding) -> CsvSerializerBuilder {
        self.encoding = encoding;
        self
    }

    pub fn build(self) -> CsvSerializer {
        CsvSerializer {
            delimiter: self.delimiter,
            terminator: self.terminator,
            null_value: self.null_value,
            encoding: self.encoding,
        }
    }
}
