mod common;

use std::{
    fs,
    time::{Duration, Instant},
};

use anyhow::Result;
use sqlx::{Connection, SqliteConnection};
use tempfile::{NamedTempFile, tempdir};
use tokio::runtime::Runtime;

use query_csv_export::{
    ExportError,
    core::{
        config::ExportConfigurationBuilder,
        job::{ExportJobBuilder, ExportOutcome, ExportState},
        table::Value,
    },
    item::rdbc::RdbcDataSource,
};

const SCHEMA: [&str; 4] = [
    "CREATE TABLE person (id INTEGER PRIMARY KEY, first_name TEXT NOT NULL, last_name TEXT, city TEXT)",
    "INSERT INTO person (id, first_name, last_name, city) VALUES (1, 'Jane', 'Doe', 'Lyon, FR')",
    "INSERT INTO person (id, first_name, last_name, city) VALUES (2, 'John', NULL, 'Paris')",
    "INSERT INTO person (id, first_name, last_name, city) VALUES (3, 'Ann \"Nan\"', 'Smith', 'Nice')",
];

/// Creates a populated SQLite database and returns its connection URL.
fn prepare_database(file: &NamedTempFile) -> Result<String> {
    let url = format!("sqlite://{}?mode=rwc", file.path().display());

    let runtime = Runtime::new()?;
    runtime.block_on(async {
        let mut connection = SqliteConnection::connect(&url).await?;
        for statement in SCHEMA {
            sqlx::query(statement).execute(&mut connection).await?;
        }
        connection.close().await
    })?;

    Ok(url)
}

#[test]
fn sqlite_query_should_be_exported() -> Result<()> {
    common::init_logger();

    let database = NamedTempFile::new()?;
    let url = prepare_database(&database)?;
    let directory = tempdir()?;
    let path = directory.path().join("person.csv");

    let configuration = ExportConfigurationBuilder::new()
        .destination_path(&path)
        .connection_info(&url)
        .query_text("SELECT id, first_name, last_name, city FROM person ORDER BY id")
        .build()?;

    let source = RdbcDataSource::new();
    let outcome = ExportJobBuilder::new()
        .name("person")
        .configuration(configuration)
        .data_source(&source)
        .build()?
        .run();

    assert_eq!(outcome.state(), ExportState::Written);
    assert_eq!(
        fs::read_to_string(&path)?,
        "id,first_name,last_name,city\n\
         1,Jane,Doe,\"Lyon, FR\"\n\
         2,John,,Paris\n\
         3,\"Ann \"\"Nan\"\"\",Smith,Nice\n"
    );

    let table = outcome.into_table().expect("table");
    assert_eq!(table.row_count(), 3);
    assert_eq!(table.value(1, 2), Some(&Value::Null));
    Ok(())
}

#[test]
fn sqlite_empty_query_should_not_write_file() -> Result<()> {
    let database = NamedTempFile::new()?;
    let url = prepare_database(&database)?;
    let directory = tempdir()?;
    let path = directory.path().join("nobody.csv");

    let configuration = ExportConfigurationBuilder::new()
        .destination_path(&path)
        .connection_info(&url)
        .query_text("SELECT id, first_name FROM person WHERE 1 = 0")
        .build()?;

    let source = RdbcDataSource::new();
    let outcome = ExportJobBuilder::new()
        .configuration(configuration)
        .data_source(&source)
        .build()?
        .run();

    assert!(matches!(outcome.last_error(), Some(ExportError::EmptyResult)));
    assert_eq!(outcome.table().map(|table| table.row_count()), Some(0));
    assert!(!path.exists());
    Ok(())
}

#[test]
fn sqlite_stored_procedure_should_be_rejected() -> Result<()> {
    let database = NamedTempFile::new()?;
    let url = prepare_database(&database)?;
    let directory = tempdir()?;

    let configuration = ExportConfigurationBuilder::new()
        .destination_path(directory.path().join("procedure.csv"))
        .connection_info(&url)
        .query_text("usp_person")
        .stored_procedure(true)
        .build()?;

    let source = RdbcDataSource::new();
    let outcome = ExportJobBuilder::new()
        .configuration(configuration)
        .data_source(&source)
        .build()?
        .run();

    assert_eq!(outcome.state(), ExportState::Failed);
    assert!(matches!(outcome.last_error(), Some(ExportError::DataSource(_))));
    Ok(())
}

#[test]
fn unreachable_database_should_fail_in_validated_state() -> Result<()> {
    let directory = tempdir()?;
    let missing = directory.path().join("missing").join("nothing.db");

    let configuration = ExportConfigurationBuilder::new()
        .destination_path(directory.path().join("out.csv"))
        .connection_info(format!("sqlite://{}", missing.display()))
        .query_text("SELECT 1")
        .build()?;

    let source = RdbcDataSource::new();
    let outcome = ExportJobBuilder::new()
        .configuration(configuration)
        .data_source(&source)
        .build()?
        .run();

    match outcome {
        ExportOutcome::Failed {
            error: ExportError::DataSource(_),
            failed_in: ExportState::Validated,
            ..
        } => {}
        other => panic!("unexpected outcome {:?}", other),
    }
    Ok(())
}

#[test]
fn slow_sqlite_query_should_time_out_promptly() -> Result<()> {
    let database = NamedTempFile::new()?;
    let url = prepare_database(&database)?;
    let directory = tempdir()?;

    let configuration = ExportConfigurationBuilder::new()
        .destination_path(directory.path().join("slow.csv"))
        .connection_info(&url)
        .query_text(
            "WITH RECURSIVE counter(x) AS (SELECT 1 UNION ALL SELECT x + 1 FROM counter WHERE x < 300000000) \
             SELECT count(*) AS total FROM counter",
        )
        .timeout_seconds(1)
        .build()?;

    let source = RdbcDataSource::new();
    let start = Instant::now();
    let outcome = ExportJobBuilder::new()
        .configuration(configuration)
        .data_source(&source)
        .build()?
        .run();
    let elapsed = start.elapsed();

    match outcome.last_error() {
        Some(ExportError::DataSource(message)) => assert!(message.contains("timed out")),
        other => panic!("unexpected error {:?}", other),
    }
    assert!(elapsed >= Duration::from_secs(1));
    assert!(elapsed < Duration::from_secs(5), "took {:?}", elapsed);
    Ok(())
}
