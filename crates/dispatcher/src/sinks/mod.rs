//! Sink implementations
//!
//! Contains LogSink and FileSink.

mod file;
mod log;

pub use self::file::{FileFormat, FileSink, FileSinkConfig};
pub use self::log::LogSink;
