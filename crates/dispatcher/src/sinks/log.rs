//! LogSink - logs fused record summaries via tracing

use std::collections::HashMap;

use contracts::{ContractError, DataSink, FusedRecord};
use tracing::{info, instrument};

use crate::error::DispatcherError;

/// Sink that logs fused records for debugging
///
/// At pulse rates a line per record is noisy; `every` keeps one record
/// out of `every`.
pub struct LogSink {
    name: String,
    every: u64,
    seen: u64,
}

impl LogSink {
    /// Create a new LogSink that logs every record
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            every: 1,
            seen: 0,
        }
    }

    /// Log one record out of `every`
    pub fn sampled(name: impl Into<String>, every: u64) -> Self {
        Self {
            every: every.max(1),
            ..Self::new(name)
        }
    }

    /// Create from params map; honours `every`
    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> Result<Self, DispatcherError> {
        let name = name.into();
        match params.get("every") {
            None => Ok(Self::new(name)),
            Some(raw) => match raw.parse::<u64>() {
                Ok(every) if every > 0 => Ok(Self::sampled(name, every)),
                _ => Err(DispatcherError::invalid_param(name, "every", raw.as_str())),
            },
        }
    }

    fn log_record_summary(&self, record: &FusedRecord) {
        info!(
            sink = %self.name,
            ts = %record.ts,
            ch0 = record.ch0,
            ch1 = record.ch1,
            ch2 = record.ch2,
            x = record.x,
            y = record.y,
            z = record.z,
            "FusedRecord"
        );
    }
}

impl DataSink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_sink_write",
        level = "trace",
        skip(self, record),
        fields(sink = %self.name, ts = %record.ts)
    )]
    async fn write(&mut self, record: &FusedRecord) -> Result<(), ContractError> {
        if self.seen % self.every == 0 {
            self.log_record_summary(record);
        }
        self.seen += 1;
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), ContractError> {
        Ok(())
    }

    #[instrument(name = "log_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        info!(sink = %self.name, records = self.seen, "LogSink closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::Timestamp;

    #[tokio::test]
    async fn test_log_sink_write() {
        let mut sink = LogSink::sampled("test_log", 3);
        let record = FusedRecord {
            ts: Timestamp::from_millis(1000),
            ch0: 1,
            ch1: 2,
            ch2: 3,
            x: 0.0,
            y: 0.0,
            z: 1.0,
        };

        for _ in 0..4 {
            assert!(sink.write(&record).await.is_ok());
        }
        assert_eq!(sink.seen, 4);
    }

    #[test]
    fn test_log_sink_params() {
        let sink = LogSink::from_params("my_logger", &HashMap::new()).unwrap();
        assert_eq!(sink.name(), "my_logger");
        assert_eq!(sink.every, 1);

        let params = HashMap::from([("every".to_string(), "50".to_string())]);
        assert_eq!(LogSink::from_params("l", &params).unwrap().every, 50);

        let params = HashMap::from([("every".to_string(), "0".to_string())]);
        assert!(LogSink::from_params("l", &params).is_err());
    }
}
