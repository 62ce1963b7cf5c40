//! Synchronous sink that forwards into the dispatcher channel

use contracts::{FusedRecord, MeasurementSink};
use tokio::sync::mpsc;
use tracing::{error, warn};

/// `MeasurementSink` feeding a dispatcher input channel
///
/// The synchronizer calls sinks synchronously, so records are handed over
/// with `try_send`. A full channel drops the record instead of stalling
/// notification processing.
#[derive(Debug)]
pub struct DispatchSink {
    tx: mpsc::Sender<FusedRecord>,
    forwarded: u64,
    dropped: u64,
    closed: bool,
}

/// Create a bounded dispatcher input channel and its sending sink
pub fn dispatch_channel(capacity: usize) -> (DispatchSink, mpsc::Receiver<FusedRecord>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (DispatchSink::new(tx), rx)
}

impl DispatchSink {
    pub fn new(tx: mpsc::Sender<FusedRecord>) -> Self {
        Self {
            tx,
            forwarded: 0,
            dropped: 0,
            closed: false,
        }
    }

    /// Records accepted by the channel
    pub fn forwarded(&self) -> u64 {
        self.forwarded
    }

    /// Records lost to a full or closed channel
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

impl MeasurementSink for DispatchSink {
    fn on_fused(&mut self, record: FusedRecord) {
        match self.tx.try_send(record) {
            Ok(()) => self.forwarded += 1,
            Err(mpsc::error::TrySendError::Full(r)) => {
                self.dropped += 1;
                ::metrics::counter!("pulsefuse_dispatch_dropped_total").increment(1);
                warn!(ts = %r.ts, "dispatcher input full, record dropped");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.dropped += 1;
                if !self.closed {
                    self.closed = true;
                    error!("dispatcher input closed, records are being discarded");
                }
            }
        }
    }
}
