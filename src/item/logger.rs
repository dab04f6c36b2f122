use std::{
    io::{self, Write},
    path::{Path, PathBuf},
};

use log::info;

use crate::core::item::Destination;

/// A destination that logs every written record instead of storing it.
///
/// Handy to preview an export: run the job with this destination and the
/// header and rows show up in the log, prefixed with the target path.
/// Records are split on line feeds outside double quotes, so a quoted
/// value spanning several lines is logged as part of a single record.
#[derive(Default)]
pub struct LoggerDestination {}

impl Destination for LoggerDestination {
    fn open_for_write(&self, path: &Path) -> io::Result<Box<dyn Write>> {
        Ok(Box::new(LineLogger {
            path: path.to_path_buf(),
            pending: Vec::new(),
            in_quotes: false,
        }))
    }
}

struct LineLogger {
    path: PathBuf,
    pending: Vec<u8>,
    in_quotes: bool,
}

impl LineLogger {
    fn log_record(&mut self) {
        let record = std::mem::take(&mut self.pending);
        let record = String::from_utf8_lossy(&record);
        info!("{}: {}", self.path.display(), record.trim_end_matches(['\r', '\n']));
    }
}

impl Write for LineLogger {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        for &byte in buf {
            self.pending.push(byte);
            match byte {
                // Doubled quotes toggle twice and leave the state unchanged.
                b'"' => self.in_quotes = !self.in_quotes,
                b'\n' if !self.in_quotes => self.log_record(),
                _ => {}
            }
        }

        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if !self.pending.is_empty() {
            self.log_record();
        }
        Ok(())
    }
}
