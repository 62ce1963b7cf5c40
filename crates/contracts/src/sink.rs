//! Output interfaces
//!
//! `MeasurementSink` is the synchronous capability the synchronizer calls
//! once per fused record. `DataSink` is the async trait the dispatcher
//! fans records out to.

use crate::{ContractError, FusedRecord};

/// Receives fused records synchronously, inside the call that produced them
pub trait MeasurementSink {
    fn on_fused(&mut self, record: FusedRecord);
}

impl<F> MeasurementSink for F
where
    F: FnMut(FusedRecord),
{
    fn on_fused(&mut self, record: FusedRecord) {
        self(record)
    }
}

/// Data output trait
///
/// All sink implementations must implement this trait.
#[trait_variant::make(DataSink: Send)]
pub trait LocalDataSink {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Write one fused record
    ///
    /// # Errors
    /// Returns write error (should include context)
    async fn write(&mut self, record: &FusedRecord) -> Result<(), ContractError>;

    /// Flush buffer (if any)
    async fn flush(&mut self) -> Result<(), ContractError>;

    /// Close sink
    async fn close(&mut self) -> Result<(), ContractError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Timestamp;

    #[test]
    fn test_closure_is_a_sink() {
        let mut seen = Vec::new();
        let mut sink = |record: FusedRecord| seen.push(record.ts);
        sink.on_fused(FusedRecord {
            ts: Timestamp::from_millis(7),
            ch0: 0,
            ch1: 0,
            ch2: 0,
            x: 0.0,
            y: 0.0,
            z: 0.0,
        });
        assert_eq!(seen, vec![Timestamp::from_millis(7)]);
    }
}
