use std::{borrow::Cow, fmt};

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::error::TableError;

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S%.f";
const DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// A single cell of a [`TabularResult`].
///
/// The table never coerces values: whatever the data source produced is
/// stored as-is and only turned into text when serialized.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Text(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
    Bytes(Vec<u8>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the canonical textual representation of the value, or `None` for null.
    ///
    /// | Value      | Text                                   |
    /// |------------|----------------------------------------|
    /// | `Text`     | unchanged                              |
    /// | `Integer`  | decimal digits                         |
    /// | `Float`    | shortest round-trip decimal, no exponent |
    /// | `Boolean`  | `True` / `False`                       |
    /// | `Date`     | `YYYY-MM-DD`                           |
    /// | `Time`     | `HH:MM:SS[.fff]`                       |
    /// | `DateTime` | `YYYY-MM-DDTHH:MM:SS[.fff]`            |
    /// | `Bytes`    | `0x` + lowercase hex                   |
    ///
    /// Fractional seconds are only emitted when non zero.
    ///
    /// # Examples
    ///
    /// ```
    /// use query_csv_export::core::table::Value;
    ///
    /// assert_eq!(Value::Boolean(true).to_text().as_deref(), Some("True"));
    /// assert_eq!(Value::Float(2.5).to_text().as_deref(), Some("2.5"));
    /// assert_eq!(Value::Null.to_text(), None);
    /// ```
    pub fn to_text(&self) -> Option<Cow<'_, str>> {
        let text = match self {
            Value::Null => return None,
            Value::Text(text) => Cow::Borrowed(text.as_str()),
            Value::Integer(value) => Cow::Owned(value.to_string()),
            Value::Float(value) => Cow::Owned(value.to_string()),
            Value::Boolean(true) => Cow::Borrowed("True"),
            Value::Boolean(false) => Cow::Borrowed("False"),
            Value::Date(date) => Cow::Owned(date.format(DATE_FORMAT).to_string()),
            Value::Time(time) => Cow::Owned(time.format(TIME_FORMAT).to_string()),
            Value::DateTime(date_time) => {
                Cow::Owned(date_time.format(DATE_TIME_FORMAT).to_string())
            }
            Value::Bytes(bytes) => {
                let mut hex = String::with_capacity(2 + bytes.len() * 2);
                hex.push_str("0x");
                for byte in bytes {
                    hex.push_str(&format!("{:02x}", byte));
                }
                Cow::Owned(hex)
            }
        };
        Some(text)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_text() {
            Some(text) => f.write_str(&text),
            None => Ok(()),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Integer(value.into())
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<NaiveDate> for Value {
    fn from(value: NaiveDate) -> Self {
        Value::Date(value)
    }
}

impl From<NaiveTime> for Value {
    fn from(value: NaiveTime) -> Self {
        Value::Time(value)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(value: NaiveDateTime) -> Self {
        Value::DateTime(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

/// In-memory result of a query: named columns and the rows returned for them.
///
/// Columns are declared first, then rows are appended. Once the first row
/// exists the column set is sealed, and every row must carry exactly one
/// value per column. There are no update or delete operations: after the
/// table has been populated it is only ever read.
///
/// # Examples
///
/// ```
/// use query_csv_export::core::table::{TabularResult, Value};
///
/// let mut table = TabularResult::new();
/// table.add_column("id").unwrap();
/// table.add_column("name").unwrap();
/// table.add_row(vec![Value::from(1), Value::from("Jane")]).unwrap();
///
/// assert_eq!(table.column_count(), 2);
/// assert_eq!(table.row_count(), 1);
/// assert_eq!(table.column_name(1), Some("name"));
/// assert_eq!(table.value(0, 1), Some(&Value::Text("Jane".to_string())));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TabularResult {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl TabularResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a new column at the end of the column list.
    ///
    /// # Errors
    ///
    /// - [`TableError::ColumnsSealed`] if rows have already been added
    /// - [`TableError::DuplicateColumn`] if a column with that name exists
    pub fn add_column(&mut self, name: impl Into<String>) -> Result<(), TableError> {
        let name = name.into();

        if !self.rows.is_empty() {
            return Err(TableError::ColumnsSealed(name));
        }

        if self.has_column(&name) {
            return Err(TableError::DuplicateColumn(name));
        }

        self.columns.push(name);
        Ok(())
    }

    /// Appends a row. The row must hold exactly one value per column.
    pub fn add_row(&mut self, values: Vec<Value>) -> Result<(), TableError> {
        if values.len() != self.columns.len() {
            return Err(TableError::ArityMismatch {
                expected: self.columns.len(),
                actual: values.len(),
            });
        }

        self.rows.push(values);
        Ok(())
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column_name(&self, index: usize) -> Option<&str> {
        self.columns.get(index).map(String::as_str)
    }

    pub fn value(&self, row: usize, column: usize) -> Option<&Value> {
        self.rows.get(row).and_then(|values| values.get(column))
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|column| column == name)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(String::as_str)
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Value]> {
        self.rows.iter().map(Vec::as_slice)
    }

    /// Returns `true` if the table holds no rows, whatever its column count.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveTime};

    use super::{TabularResult, Value};
    use crate::error::TableError;

    fn people() -> TabularResult {
        let mut table = TabularResult::new();
        table.add_column("id").unwrap();
        table.add_column("name").unwrap();
        table
            .add_row(vec![Value::from(1), Value::from("Jane, A.")])
            .unwrap();
        table.add_row(vec![Value::from(2), Value::Null]).unwrap();
        table
    }

    #[test]
    fn accessors_should_follow_insertion_order() {
        let table = people();

        assert_eq!(table.column_count(), 2);
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.column_name(0), Some("id"));
        assert_eq!(table.column_name(1), Some("name"));
        assert_eq!(table.column_name(2), None);
        assert_eq!(table.value(0, 0), Some(&Value::Integer(1)));
        assert_eq!(table.value(1, 1), Some(&Value::Null));
        assert_eq!(table.value(2, 0), None);
        assert_eq!(table.columns().collect::<Vec<_>>(), vec!["id", "name"]);
        assert!(!table.is_empty());
    }

    #[test]
    fn row_with_wrong_arity_should_be_rejected() {
        let mut table = people();

        let result = table.add_row(vec![Value::from(3)]);

        assert_eq!(
            result,
            Err(TableError::ArityMismatch {
                expected: 2,
                actual: 1
            })
        );
        assert_eq!(table.row_count(), 2);
    }

    #[test]
    fn columns_should_be_sealed_once_rows_exist() {
        let mut table = people();

        let result = table.add_column("email");

        assert_eq!(result, Err(TableError::ColumnsSealed("email".to_string())));
        assert_eq!(table.column_count(), 2);
    }

    #[test]
    fn duplicate_column_should_be_rejected() {
        let mut table = TabularResult::new();
        table.add_column("id").unwrap();

        let result = table.add_column("id");

        assert_eq!(result, Err(TableError::DuplicateColumn("id".to_string())));
    }

    #[test]
    fn table_without_rows_is_empty_regardless_of_columns() {
        let mut table = TabularResult::new();
        assert!(table.is_empty());

        table.add_column("id").unwrap();
        assert!(table.is_empty());
        assert_eq!(table.column_count(), 1);
    }

    #[test]
    fn values_should_have_canonical_text() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let time = NaiveTime::from_hms_opt(10, 30, 0).unwrap();
        let precise = NaiveTime::from_hms_milli_opt(10, 30, 0, 250).unwrap();

        assert_eq!(Value::Null.to_text(), None);
        assert_eq!(Value::from("abc").to_string(), "abc");
        assert_eq!(Value::from(-42).to_string(), "-42");
        assert_eq!(Value::from(1.5).to_string(), "1.5");
        assert_eq!(Value::from(3.0).to_string(), "3");
        assert_eq!(Value::from(true).to_string(), "True");
        assert_eq!(Value::from(false).to_string(), "False");
        assert_eq!(Value::from(date).to_string(), "2024-01-15");
        assert_eq!(Value::from(time).to_string(), "10:30:00");
        assert_eq!(Value::from(date.and_time(time)).to_string(), "2024-01-15T10:30:00");
        assert_eq!(
            Value::from(date.and_time(precise)).to_string(),
            "2024-01-15T10:30:00.250"
        );
        assert_eq!(Value::Bytes(vec![0x00, 0xab, 0x10]).to_string(), "0x00ab10");
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some("x")), Value::Text("x".to_string()));
    }
}
