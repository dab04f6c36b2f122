/// This module provides the delimited text serializer and reader.
pub mod csv;

/// This module provides the local file system destination.
pub mod fs;

#[cfg(feature = "logger")]
/// This module provides a destination that logs the exported lines, useful for debugging purposes.
pub mod logger;

/// This module provides an in-memory data source.
pub mod memory;

#[cfg(feature = "rdbc")]
/// This module provides a relational data source backed by SQLx.
pub mod rdbc;
