use std::{
    fs::File,
    io::{self, Write},
    path::Path,
};

use log::debug;

use crate::core::item::Destination;

/// Writes to the local file system, creating or truncating the target file.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileSystem;

impl Destination for FileSystem {
    fn open_for_write(&self, path: &Path) -> io::Result<Box<dyn Write>> {
        debug!("Creating {}", path.display());
        let file = File::create(path)?;
        Ok(Box::new(file))
    }
}
