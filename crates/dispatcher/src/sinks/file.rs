//! FileSink - appends fused records to a file

use contracts::{ContractError, DataSink, FusedRecord};
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tracing::{debug, error, instrument};

use crate::error::DispatcherError;

/// Output encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileFormat {
    /// One JSON object per line
    #[default]
    JsonLines,
    /// Comma separated, with a header row
    Csv,
}

impl FileFormat {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "jsonl" | "json_lines" => Some(Self::JsonLines),
            "csv" => Some(Self::Csv),
            _ => None,
        }
    }
}

/// Configuration for FileSink
#[derive(Debug, Clone)]
pub struct FileSinkConfig {
    /// Output file, created (with parents) if missing
    pub path: PathBuf,
    pub format: FileFormat,
    /// Append to an existing file instead of truncating it
    pub append: bool,
}

impl FileSinkConfig {
    /// Create config from params map
    ///
    /// `path` is required; `format` (`jsonl` | `csv`) and `append`
    /// (`true` | `false`) are optional.
    pub fn from_params(
        sink: &str,
        params: &HashMap<String, String>,
    ) -> Result<Self, DispatcherError> {
        let path = params
            .get("path")
            .filter(|p| !p.is_empty())
            .map(PathBuf::from)
            .ok_or_else(|| DispatcherError::missing_param(sink, "path"))?;

        let format = match params.get("format") {
            None => FileFormat::default(),
            Some(raw) => FileFormat::parse(raw)
                .ok_or_else(|| DispatcherError::invalid_param(sink, "format", raw.as_str()))?,
        };

        let append = match params.get("append").map(String::as_str) {
            None | Some("false") => false,
            Some("true") => true,
            Some(raw) => return Err(DispatcherError::invalid_param(sink, "append", raw)),
        };

        Ok(Self {
            path,
            format,
            append,
        })
    }
}

enum RecordWriter {
    JsonLines(BufWriter<File>),
    Csv(csv::Writer<BufWriter<File>>),
}

impl RecordWriter {
    fn write(&mut self, record: &FusedRecord) -> std::io::Result<()> {
        match self {
            Self::JsonLines(writer) => {
                serde_json::to_writer(&mut *writer, record)
                    .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
                writer.write_all(b"\n")
            }
            Self::Csv(writer) => writer.serialize(record).map_err(std::io::Error::other),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self {
            Self::JsonLines(writer) => writer.flush(),
            Self::Csv(writer) => writer.flush(),
        }
    }
}

/// Sink that writes fused records to a file
pub struct FileSink {
    name: String,
    config: FileSinkConfig,
    writer: Option<RecordWriter>,
    written: u64,
}

impl FileSink {
    /// Create a new FileSink, opening the output file
    pub fn new(name: impl Into<String>, config: FileSinkConfig) -> std::io::Result<Self> {
        if let Some(parent) = config.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .append(config.append)
            .truncate(!config.append)
            .open(&config.path)?;
        let writer = match config.format {
            FileFormat::JsonLines => RecordWriter::JsonLines(BufWriter::new(file)),
            FileFormat::Csv => {
                // header row comes from the first record, only for a fresh file
                let fresh = file.metadata()?.len() == 0;
                RecordWriter::Csv(
                    csv::WriterBuilder::new()
                        .has_headers(fresh)
                        .from_writer(BufWriter::new(file)),
                )
            }
        };

        Ok(Self {
            name: name.into(),
            config,
            writer: Some(writer),
            written: 0,
        })
    }

    /// Create from params map (for factory)
    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> Result<Self, DispatcherError> {
        let name = name.into();
        let config = FileSinkConfig::from_params(&name, params)?;
        Ok(Self::new(name, config)?)
    }

    /// Records written so far
    pub fn written(&self) -> u64 {
        self.written
    }

    fn write_record(&mut self, record: &FusedRecord) -> std::io::Result<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| std::io::Error::other("sink already closed"))?;
        writer.write(record)?;
        self.written += 1;
        Ok(())
    }

    fn persist_record(&mut self, record: &FusedRecord) -> Result<(), ContractError> {
        self.write_record(record).map_err(|e| {
            error!(sink = %self.name, ts = %record.ts, error = %e, "Write failed");
            ContractError::sink_write(&self.name, e.to_string())
        })
    }
}

impl DataSink for FileSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "file_sink_write",
        level = "trace",
        skip(self, record),
        fields(sink = %self.name, ts = %record.ts)
    )]
    async fn write(&mut self, record: &FusedRecord) -> Result<(), ContractError> {
        self.persist_record(record)
    }

    #[instrument(name = "file_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        if let Some(writer) = self.writer.as_mut() {
            writer
                .flush()
                .map_err(|e| ContractError::sink_write(&self.name, e.to_string()))?;
        }
        Ok(())
    }

    #[instrument(name = "file_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        if let Some(mut writer) = self.writer.take() {
            writer
                .flush()
                .map_err(|e| ContractError::sink_write(&self.name, e.to_string()))?;
        }
        debug!(
            sink = %self.name,
            path = %self.config.path.display(),
            records = self.written,
            "FileSink closed"
        );
        Ok(())
    }
}
