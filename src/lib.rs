#![cfg_attr(docsrs, feature(doc_cfg))]

/*!
 # Query CSV Export

 Run one query (plain SQL text or a stored procedure) against a relational
 data source, materialize the result in memory and write it to a delimited
 text file. One query in, one file out, synchronously.

 ## Core Concepts

- **TabularResult:** The in-memory table produced by a query: ordered, named columns and rows of typed values.
- **ExportConfiguration:** Where the data comes from, which query to run and how the output file looks.
- **QueryExecutor:** Opens a connection to a `DataSource`, runs the command with a timeout and fills a `TabularResult`.
- **CsvSerializer:** Turns a `TabularResult` into delimited text with RFC-4180-style quoting.
- **ExportJob:** Validates the configuration, fetches, refuses empty results, writes the file and reports an `ExportOutcome`.

 ## Features

| **Feature**   | **Description**                                                  |
|---------------|------------------------------------------------------------------|
| rdbc-sqlite   | Enables the SQLx data source for SQLite (default)                |
| rdbc-postgres | Enables the SQLx data source for PostgreSQL                      |
| rdbc-mysql    | Enables the SQLx data source for MySQL and MariaDB               |
| logger        | Enables a destination logging the exported lines, for previews   |
| full          | Enables all available features                                   |

 ## Output format

 - one header line with the column names, then one line per row
 - fields joined by the configured delimiter (`,` by default, any length)
 - a field containing the delimiter, a double quote, a carriage return or a
   line feed is wrapped in double quotes, embedded quotes are doubled
 - nulls are written as empty fields unless a null sentinel is configured
 - every line, the last one included, ends with the line terminator (`\n` by default)

 ## Getting Started

```rust
# use query_csv_export::{
#     core::{config::ExportConfigurationBuilder, job::ExportJobBuilder, table::Value},
#     item::memory::MemoryDataSource,
#     ExportError,
# };
fn main() -> Result<(), ExportError> {
    let path = std::env::temp_dir().join("query_csv_export_people.csv");

    // Any `DataSource` works here, e.g. `item::rdbc::RdbcDataSource` for a real database.
    let source = MemoryDataSource::new(&["id", "name"])
        .row(vec![1.into(), "Jane, A.".into()])
        .row(vec![2.into(), Value::Null]);

    let configuration = ExportConfigurationBuilder::new()
        .destination_path(&path)
        .connection_info("memory")
        .query_text("SELECT id, name FROM person")
        .build()?;

    let table = ExportJobBuilder::new()
        .configuration(configuration)
        .data_source(&source)
        .build()?
        .run()
        .into_result()?;

    assert_eq!(table.row_count(), 2);
    assert_eq!(
        std::fs::read_to_string(&path).unwrap(),
        "id,name\n1,\"Jane, A.\"\n2,\n"
    );

    Ok(())
}
```

 ## License
 Licensed under either of

 -   Apache License, Version 2.0
     ([LICENSE-APACHE](LICENSE-APACHE) or <http://www.apache.org/licenses/LICENSE-2.0>)
 -   MIT license
     ([LICENSE-MIT](LICENSE-MIT) or <http://opensource.org/licenses/MIT>)

 at your option.
 */

/// Core module: table model, configuration, executor and export job
pub mod core;

/// Error types for export operations
pub mod error;

#[doc(inline)]
pub use error::*;

/// Serializers, destinations and data sources (for example: csv serializer and sqlx data source)
pub mod item;
