//! SinkHandle - one sink behind its own bounded queue and worker task
//!
//! The worker writes records in arrival order and flushes the sink each
//! time its queue runs dry, so buffered sinks stay current while the
//! device is quiet without paying a flush per record at full rate.

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument, trace, warn};

use contracts::{DataSink, FusedRecord};

use crate::metrics::SinkMetrics;

/// Handle to a running sink worker
pub struct SinkHandle {
    name: String,
    tx: mpsc::Sender<FusedRecord>,
    metrics: Arc<SinkMetrics>,
    worker_handle: JoinHandle<()>,
}

impl SinkHandle {
    /// Spawn the worker for `sink` with a queue of `queue_capacity` records
    pub fn spawn<S: DataSink + Send + 'static>(sink: S, queue_capacity: usize) -> Self {
        let name = sink.name().to_string();
        let (tx, rx) = mpsc::channel(queue_capacity.max(1));
        let metrics = Arc::new(SinkMetrics::new());

        let worker = SinkWorker {
            sink,
            rx,
            metrics: Arc::clone(&metrics),
            name: name.clone(),
            unflushed: 0,
        };
        let worker_handle = tokio::spawn(worker.run());

        Self {
            name,
            tx,
            metrics,
            worker_handle,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metrics(&self) -> &Arc<SinkMetrics> {
        &self.metrics
    }

    /// Queue a record for the sink (non-blocking)
    ///
    /// Returns false when the record was dropped.
    pub fn try_send(&self, record: FusedRecord) -> bool {
        match self.tx.try_send(record) {
            Ok(()) => {
                self.metrics
                    .set_queue_len(self.tx.max_capacity() - self.tx.capacity());
                true
            }
            Err(mpsc::error::TrySendError::Full(r)) => {
                self.record_drop();
                warn!(sink = %self.name, ts = %r.ts, "Queue full, record dropped");
                false
            }
            Err(mpsc::error::TrySendError::Closed(r)) => {
                self.record_drop();
                error!(sink = %self.name, ts = %r.ts, "Sink worker gone, record dropped");
                false
            }
        }
    }

    fn record_drop(&self) {
        self.metrics.inc_dropped_count();
        ::metrics::counter!("pulsefuse_sink_dropped_total", "sink" => self.name.clone())
            .increment(1);
    }

    /// Close the queue and wait until the worker has drained, flushed and
    /// closed the sink
    #[instrument(name = "sink_handle_shutdown", skip(self), fields(sink = %self.name))]
    pub async fn shutdown(self) {
        drop(self.tx);
        if let Err(e) = self.worker_handle.await {
            error!(sink = %self.name, error = ?e, "Worker task panicked");
        }
        debug!(sink = %self.name, "SinkHandle shutdown complete");
    }
}

struct SinkWorker<S> {
    sink: S,
    rx: mpsc::Receiver<FusedRecord>,
    metrics: Arc<SinkMetrics>,
    name: String,
    /// Records written since the last flush
    unflushed: u64,
}

impl<S: DataSink> SinkWorker<S> {
    #[instrument(name = "sink_worker_loop", skip(self), fields(sink = %self.name))]
    async fn run(mut self) {
        debug!("Sink worker started");

        while let Some(record) = self.rx.recv().await {
            self.metrics.set_queue_len(self.rx.len());
            self.write(&record).await;

            if self.rx.is_empty() && self.unflushed > 0 {
                self.flush().await;
            }
        }

        if self.unflushed > 0 {
            self.flush().await;
        }
        if let Err(e) = self.sink.close().await {
            error!(sink = %self.name, error = %e, "Close failed on shutdown");
        }

        debug!(
            written = self.metrics.write_count(),
            failed = self.metrics.failure_count(),
            "Sink worker stopped"
        );
    }

    async fn write(&mut self, record: &FusedRecord) {
        match self.sink.write(record).await {
            Ok(()) => {
                self.metrics.inc_write_count();
                self.unflushed += 1;
            }
            Err(e) => {
                // one bad write does not stop the sink
                self.metrics.inc_failure_count();
                error!(sink = %self.name, ts = %record.ts, error = %e, "Write failed");
            }
        }
    }

    async fn flush(&mut self) {
        trace!(records = self.unflushed, "queue drained, flushing");
        if let Err(e) = self.sink.flush().await {
            error!(sink = %self.name, error = %e, "Flush failed");
        }
        self.unflushed = 0;
    }
}
