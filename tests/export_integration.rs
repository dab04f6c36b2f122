mod common;

use std::fs;

use anyhow::Result;
use tempfile::tempdir;

use query_csv_export::{
    core::{
        config::{ExportConfiguration, ExportConfigurationBuilder, LineTerminator},
        job::{ExportJobBuilder, ExportState},
        table::{TabularResult, Value},
    },
    item::{
        csv::{csv_reader::CsvTableReaderBuilder, csv_writer::CsvSerializerBuilder},
        memory::MemoryDataSource,
    },
};

fn tricky_table() -> TabularResult {
    let mut table = TabularResult::new();
    for column in ["id", "name", "note", "amount", "active"] {
        table.add_column(column).unwrap();
    }

    let rows: Vec<Vec<Value>> = vec![
        vec![1.into(), "Jane, A.".into(), "plain".into(), 10.5.into(), true.into()],
        vec![2.into(), "O\"Brien".into(), "semi;colon".into(), (-3.25).into(), false.into()],
        vec![3.into(), "multi\nline".into(), "tab\there".into(), 0.into(), true.into()],
        vec![4.into(), "carriage\r\nreturn".into(), "pipe|bar".into(), 42.into(), false.into()],
        vec![5.into(), "Zoë, ñandú".into(), "\"\"".into(), Value::Null, Value::Null],
        vec![6.into(), "".into(), " spaced ".into(), 1.into(), true.into()],
    ];
    for row in rows {
        table.add_row(row).unwrap();
    }
    table
}

#[test]
fn people_should_be_exported() -> Result<()> {
    common::init_logger();
    let directory = tempdir()?;
    let path = directory.path().join("people.csv");

    let source = MemoryDataSource::new(&["id", "name"])
        .row(vec![1.into(), "Jane, A.".into()])
        .row(vec![2.into(), Value::Null]);

    let outcome = ExportJobBuilder::new()
        .name("people")
        .configuration(common::configuration(&path))
        .data_source(&source)
        .build()?
        .run();

    assert_eq!(outcome.state(), ExportState::Written);
    assert!(outcome.last_error().is_none());
    assert_eq!(source.opened_connections(), 1);
    assert_eq!(source.closed_connections(), 1);

    let content = fs::read_to_string(&path)?;
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines, vec!["id,name", "1,\"Jane, A.\"", "2,"]);
    assert!(content.ends_with('\n'));

    // the table stays available after writing
    let table = outcome.into_table().expect("table");
    assert_eq!(table.value(0, 1), Some(&Value::from("Jane, A.")));
    Ok(())
}

#[test]
fn semicolon_delimiter_should_quote_semicolons() -> Result<()> {
    let directory = tempdir()?;
    let path = directory.path().join("people.csv");

    let source = MemoryDataSource::new(&["id", "name"])
        .row(vec![1.into(), "Smith; John".into()])
        .row(vec![2.into(), "Doe, Jane".into()]);

    let configuration = ExportConfigurationBuilder::new()
        .destination_path(&path)
        .connection_info("memory")
        .query_text("SELECT id, name FROM person")
        .delimiter(";")
        .build()?;

    let outcome = ExportJobBuilder::new()
        .configuration(configuration)
        .data_source(&source)
        .build()?
        .run();

    assert!(outcome.is_success());
    assert_eq!(
        fs::read_to_string(&path)?,
        "id;name\n1;\"Smith; John\"\n2;Doe, Jane\n"
    );
    Ok(())
}

#[test]
fn exported_file_should_read_back_to_same_values() -> Result<()> {
    let table = tricky_table();
    let directory = tempdir()?;

    for delimiter in [",", ";", "\t", "|"] {
        let path = directory.path().join("tricky.csv");

        CsvSerializerBuilder::new()
            .delimiter(delimiter)
            .build()
            .write(&table, &path)?;

        let read_back = CsvTableReaderBuilder::new()
            .delimiter(delimiter)
            .from_path(&path)?
            .read_table()?;

        assert_eq!(
            read_back.columns().collect::<Vec<_>>(),
            table.columns().collect::<Vec<_>>()
        );
        assert_eq!(read_back.row_count(), table.row_count());

        for (original, parsed) in table.rows().zip(read_back.rows()) {
            assert_eq!(parsed.len(), table.column_count());
            for (expected, actual) in original.iter().zip(parsed) {
                match expected.to_text() {
                    // null and empty string both come back as null
                    Some(text) if !text.is_empty() => {
                        assert_eq!(actual, &Value::Text(text.into_owned()))
                    }
                    _ => assert_eq!(actual, &Value::Null),
                }
            }
        }
    }
    Ok(())
}

#[test]
fn quotes_should_be_doubled_and_wrapped() -> Result<()> {
    let source = MemoryDataSource::new(&["quote"]).row(vec!["He said \"hi\"".into()]);
    let directory = tempdir()?;
    let path = directory.path().join("quotes.csv");

    let outcome = ExportJobBuilder::new()
        .configuration(common::configuration(&path))
        .data_source(&source)
        .build()?
        .run();

    assert!(outcome.is_success());
    assert_eq!(
        fs::read_to_string(&path)?,
        "quote\n\"He said \"\"hi\"\"\"\n"
    );
    Ok(())
}

#[test]
fn null_sentinel_should_survive_round_trip() -> Result<()> {
    let source = MemoryDataSource::new(&["a", "b"]).row(vec![Value::Null, "".into()]);
    let directory = tempdir()?;
    let path = directory.path().join("nulls.csv");

    let configuration = ExportConfigurationBuilder::new()
        .destination_path(&path)
        .connection_info("memory")
        .query_text("SELECT a, b FROM t")
        .null_value("NULL")
        .line_terminator(LineTerminator::CrLf)
        .build()?;

    let outcome = ExportJobBuilder::new()
        .configuration(configuration)
        .data_source(&source)
        .build()?
        .run();

    assert!(outcome.is_success());
    assert_eq!(fs::read_to_string(&path)?, "a,b\r\nNULL,\r\n");

    let read_back = CsvTableReaderBuilder::new()
        .null_value("NULL")
        .from_path(&path)?
        .read_table()?;
    assert_eq!(read_back.value(0, 0), Some(&Value::Null));
    Ok(())
}

#[test]
fn json_configuration_should_drive_job() -> Result<()> {
    let directory = tempdir()?;
    let path = directory.path().join("json.csv");
    let json = serde_json_config(&path);

    let configuration = ExportConfiguration::from_json_str(&json)?;
    let source = MemoryDataSource::new(&["id"]).row(vec![7.into()]);

    let outcome = ExportJobBuilder::new()
        .configuration(configuration)
        .data_source(&source)
        .build()?
        .run();

    assert!(outcome.is_success());
    assert_eq!(fs::read_to_string(&path)?, "id\n7\n");
    assert_eq!(
        source.last_command().map(|command| command.timeout),
        Some(Some(std::time::Duration::from_secs(12)))
    );
    Ok(())
}

fn serde_json_config(path: &std::path::Path) -> String {
    format!(
        r#"{{
            "destination_path": {:?},
            "connection_info": "memory",
            "query_text": "SELECT id FROM t",
            "timeout_seconds": 12
        }}"#,
        path.to_string_lossy()
    )
}

#[test]
fn each_job_should_start_with_a_fresh_error() -> Result<()> {
    let directory = tempdir()?;
    let path = directory.path().join("retry.csv");

    let failing = MemoryDataSource::new(&["id"]).fail_on_execute("deadlock victim");
    let first = ExportJobBuilder::new()
        .configuration(common::configuration(&path))
        .data_source(&failing)
        .build()?
        .run();
    assert_eq!(first.state(), ExportState::Failed);

    let working = MemoryDataSource::new(&["id"]).row(vec![1.into()]);
    let second = ExportJobBuilder::new()
        .configuration(common::configuration(&path))
        .data_source(&working)
        .build()?
        .run();

    assert_eq!(second.state(), ExportState::Written);
    assert!(second.last_error().is_none());
    Ok(())
}
