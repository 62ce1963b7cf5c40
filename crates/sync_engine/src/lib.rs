//! # Sync Engine
//!
//! Fuses the pulse and acceleration streams of one device session.
//!
//! Responsibilities:
//! - One FIFO queue per fused kind, drained on every enqueue
//! - Zero-order hold: each acceleration sample is reused for every pulse
//!   sample at or before its timestamp
//! - Stale acceleration samples are dropped, pulse samples never are
//!   (unless a high-water mark is configured)
//!
//! ## Usage Example
//!
//! ```ignore
//! use sync_engine::{StreamSynchronizer, SyncConfig};
//!
//! let mut sync = StreamSynchronizer::new(SyncConfig::default());
//! let mut sink = |record| println!("{record:?}");
//!
//! // Push samples as they are decoded
//! sync.enqueue(sample, &mut sink);
//! ```

mod queue;
mod synchronizer;

// Re-exports
pub use contracts::{FusedRecord, MeasurementSink, Sample, SyncConfig};
pub use synchronizer::{EnqueueReport, StreamSynchronizer, SyncOutcome, SyncStats};
