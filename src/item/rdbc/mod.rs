//! Relational data source built on the SQLx `Any` driver.
//!
//! The connection info is a database URL and the driver is picked from its
//! scheme, so the same [`RdbcDataSource`] can export from any database
//! whose driver feature is enabled:
//!
//! | Feature         | URL scheme                 |
//! |-----------------|----------------------------|
//! | `rdbc-sqlite`   | `sqlite://path/to/file.db` |
//! | `rdbc-postgres` | `postgres://user@host/db`  |
//! | `rdbc-mysql`    | `mysql://user@host/db`     |
//!
//! # Values
//!
//! Values are decoded from the runtime type reported for each value:
//! booleans, integers, reals, text, blobs and nulls. The `Any` driver does
//! not transport temporal or numeric types; cast such columns to text in
//! the query (`CAST(created_at AS TEXT)`) to export them.
//!
//! # Stored procedures
//!
//! A stored procedure is invoked by name. See [`procedure_call`] for the
//! statement sent to each database.

use crate::error::ExportError;

/// This module contains the SQLx data source implementation.
pub mod rdbc_source;

pub use rdbc_source::RdbcDataSource;

/// Builds the statement invoking a stored procedure on the given backend.
///
/// `name` is used verbatim when it already ends with an argument list,
/// otherwise an empty one is appended.
///
/// | Backend      | Statement                 |
/// |--------------|---------------------------|
/// | `PostgreSQL` | `SELECT * FROM name()`    |
/// | `SQLite`     | not supported             |
/// | others       | `CALL name()`             |
///
/// # Examples
///
/// ```
/// use query_csv_export::item::rdbc::procedure_call;
///
/// assert_eq!(procedure_call("MySQL", "usp_people").unwrap(), "CALL usp_people()");
/// assert_eq!(
///     procedure_call("PostgreSQL", "people_since('2020-01-01')").unwrap(),
///     "SELECT * FROM people_since('2020-01-01')"
/// );
/// assert!(procedure_call("SQLite", "usp_people").is_err());
/// ```
pub fn procedure_call(backend: &str, name: &str) -> Result<String, ExportError> {
    let name = name.trim();
    let invocation = if name.ends_with(')') {
        name.to_string()
    } else {
        format!("{}()", name)
    };

    match backend {
        "PostgreSQL" => Ok(format!("SELECT * FROM {}", invocation)),
        "SQLite" => Err(ExportError::DataSource(
            "SQLite does not support stored procedures".to_string(),
        )),
        _ => Ok(format!("CALL {}", invocation)),
    }
}
