//! Delimited text support for tabular results.
//!
//! # Module Architecture
//!
//! 1. **CsvSerializer**: turns a [`TabularResult`](crate::core::table::TabularResult)
//!    into delimited text, one header line followed by one line per row. It
//!    supports delimiters of any length, a configurable line terminator, an
//!    optional null sentinel and an optional UTF-8 byte-order mark.
//!
//! 2. **CsvTableReader**: reads such a file back into a table. It relies on
//!    the `csv` crate and is limited to single-byte delimiters.
//!
//! Both components follow the builder pattern.
//!
//! # Escaping
//!
//! A field is wrapped in double quotes when it contains the delimiter, a
//! double quote, a carriage return or a line feed, and embedded double
//! quotes are doubled. Everything else is written verbatim.
//!
//! # Known limitation
//!
//! Without a null sentinel, null values and empty strings are both written
//! as an empty field and cannot be told apart when reading the file back.
//!
//! With a multi-character delimiter, a field is only quoted when it contains
//! the whole delimiter. A field ending with the start of the delimiter (`a|`
//! before `||`) is written as is, and the resulting line can be split in
//! more than one way. Prefer single-character delimiters when the values
//! are not known in advance.
//!
//! # Examples
//!
//! ```
//! use query_csv_export::core::table::{TabularResult, Value};
//! use query_csv_export::item::csv::csv_reader::CsvTableReaderBuilder;
//! use query_csv_export::item::csv::csv_writer::CsvSerializerBuilder;
//!
//! let mut table = TabularResult::new();
//! table.add_column("city").unwrap();
//! table.add_column("motto").unwrap();
//! table
//!     .add_row(vec![Value::from("Boston"), Value::from("Sicut patribus; sit Deus nobis")])
//!     .unwrap();
//!
//! let text = CsvSerializerBuilder::new()
//!     .delimiter(";")
//!     .build()
//!     .to_string(&table)
//!     .unwrap();
//! assert_eq!(text, "city;motto\nBoston;\"Sicut patribus; sit Deus nobis\"\n");
//!
//! let read_back = CsvTableReaderBuilder::new()
//!     .delimiter(";")
//!     .from_reader(text.as_bytes())
//!     .unwrap()
//!     .read_table()
//!     .unwrap();
//! assert_eq!(read_back, table);
//! ```

/// A module providing facilities for reading delimited files into tables.
pub mod csv_reader;

/// A module providing facilities for writing tables as delimited text.
pub mod csv_writer;
