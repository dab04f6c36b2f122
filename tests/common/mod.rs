#![allow(dead_code)]

mod mocks;

pub use mocks::*;

use query_csv_export::core::config::{ExportConfiguration, ExportConfigurationBuilder};
use std::path::Path;

/// A valid configuration writing to `path`.
pub fn configuration(path: &Path) -> ExportConfiguration {
    ExportConfigurationBuilder::new()
        .destination_path(path)
        .connection_info("memory")
        .query_text("SELECT id, name FROM person")
        .build()
        .expect("valid configuration")
}

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}
