//! # Dispatcher
//!
//! Delivers fused records to the configured outputs.
//!
//! Responsibilities:
//! - Bridge the synchronous synchronizer callback onto a bounded channel
//! - Fan-out to multiple sinks
//! - Isolate slow sinks so they never block the session

pub mod bridge;
pub mod dispatcher;
pub mod error;
pub mod handle;
pub mod metrics;
pub mod sinks;

pub use bridge::{dispatch_channel, DispatchSink};
pub use contracts::{DataSink, FusedRecord};
pub use dispatcher::{create_dispatcher, Dispatcher, DispatcherBuilder, DispatcherConfig};
pub use error::DispatcherError;
pub use handle::SinkHandle;
pub use metrics::{MetricsSnapshot, SinkMetrics};
pub use sinks::{FileFormat, FileSink, FileSinkConfig, LogSink};
