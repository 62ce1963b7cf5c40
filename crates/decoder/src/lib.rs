//! # Frame Decoder
//!
//! Turns data-characteristic notifications into typed samples.
//!
//! Responsibilities:
//! - Validate the tag and the tag-implied frame length
//! - Convert the device clock (µs) to a millisecond `Timestamp`
//! - Apply per-kind conversions (ambient subtraction, milli-unit scaling)
//!
//! ## Usage Example
//!
//! ```ignore
//! use decoder::FrameDecoder;
//!
//! let decoder = FrameDecoder::default();
//! match decoder.decode_sample(&payload) {
//!     Ok(sample) => synchronizer.enqueue(sample, &mut sink),
//!     Err(e) => tracing::warn!(error = %e, "frame discarded"),
//! }
//! ```

mod convert;
mod error;
mod frame;
mod metrics;

pub use contracts::{FieldWidth, FrameLayout, MeasurementKind, RawSample, Sample, Timestamp};
pub use convert::to_sample;
pub use error::{DecodeError, Result};
pub use frame::{encode_frame, FrameDecoder};
pub use metrics::{DecoderMetrics, MetricsSnapshot};
