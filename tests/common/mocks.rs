//! Mocks of the file and data source boundaries.
use mockall::mock;

use std::{
    io::{self, Write},
    path::Path,
};

use query_csv_export::{
    ExportError,
    core::item::{Connection, DataSource, Destination},
};

mock! {
    pub File {}
    impl Write for File {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize>;
        fn flush(&mut self) -> io::Result<()>;
    }
}

mock! {
    pub FileStore {}
    impl Destination for FileStore {
        fn open_for_write(&self, path: &Path) -> io::Result<Box<dyn Write>>;
    }
}

mock! {
    pub Source {}
    impl DataSource for Source {
        fn connect(&self, connection_info: &str) -> Result<Box<dyn Connection>, ExportError>;
    }
}
