//! Data frame codec
//!
//! `[tag: u8][timestamp: u64 LE, µs][fields: signed LE, width per kind]`

use std::sync::Arc;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use contracts::{FrameLayout, MeasurementKind, RawSample, Sample, Timestamp, TIMESTAMP_WIDTH};
use tracing::trace;

use crate::convert::to_sample;
use crate::error::{DecodeError, Result};
use crate::metrics::DecoderMetrics;

/// Stateless frame decoder
///
/// The only mutable thing it touches is the shared `DecoderMetrics`
/// counters, which never influence decoding.
#[derive(Debug, Clone, Default)]
pub struct FrameDecoder {
    layout: FrameLayout,
    metrics: Arc<DecoderMetrics>,
}

impl FrameDecoder {
    /// Create a decoder for the given field layout
    pub fn new(layout: FrameLayout) -> Self {
        Self {
            layout,
            metrics: Arc::new(DecoderMetrics::new()),
        }
    }

    /// Create a decoder that reports into existing counters
    pub fn with_metrics(layout: FrameLayout, metrics: Arc<DecoderMetrics>) -> Self {
        Self { layout, metrics }
    }

    /// Field layout in use
    pub fn layout(&self) -> &FrameLayout {
        &self.layout
    }

    /// Shared counters
    pub fn metrics(&self) -> Arc<DecoderMetrics> {
        self.metrics.clone()
    }

    /// Decode one notification payload
    ///
    /// # Errors
    /// - `MalformedFrame` when the payload is empty or its length differs
    ///   from the tag-implied layout
    /// - `UnknownKind` when the tag is not recognized
    pub fn decode(&self, frame: &[u8]) -> Result<RawSample> {
        let result = self.decode_inner(frame);
        match &result {
            Ok(_) => self.metrics.record_decoded(),
            Err(DecodeError::UnknownKind { .. }) => self.metrics.record_unknown_kind(),
            Err(_) => self.metrics.record_malformed(),
        }
        result
    }

    /// Decode and convert to a typed sample
    pub fn decode_sample(&self, frame: &[u8]) -> Result<Sample> {
        let raw = self.decode(frame)?;
        trace!(kind = %raw.kind, ts = %raw.timestamp, "frame decoded");
        to_sample(raw)
    }

    fn decode_inner(&self, frame: &[u8]) -> Result<RawSample> {
        let Some(&tag) = frame.first() else {
            return Err(DecodeError::MalformedFrame {
                kind: None,
                expected: 1 + TIMESTAMP_WIDTH,
                actual: 0,
            });
        };

        let kind = MeasurementKind::from_tag(tag).ok_or(DecodeError::UnknownKind { tag })?;

        let expected = self.layout.frame_len(kind);
        if frame.len() != expected {
            return Err(DecodeError::MalformedFrame {
                kind: Some(kind),
                expected,
                actual: frame.len(),
            });
        }

        let mut buf = &frame[1..];
        let timestamp = Timestamp::from_device_micros(buf.get_u64_le());

        let width = self.layout.width_of(kind).bytes();
        let fields = (0..kind.field_count())
            .map(|_| sign_extend(buf.get_uint_le(width), width))
            .collect();

        Ok(RawSample {
            kind,
            timestamp,
            fields,
        })
    }
}

/// Interpret the low `bytes` bytes of `raw` as two's complement
#[inline]
fn sign_extend(raw: u64, bytes: usize) -> i64 {
    let shift = 64 - (bytes as u32 * 8);
    ((raw << shift) as i64) >> shift
}

/// Build a frame that `FrameDecoder::decode` accepts
///
/// # Errors
/// - `MalformedFrame` when `fields.len()` differs from the kind's field count
/// - `FieldOverflow` when a value does not fit the layout's width
pub fn encode_frame(
    kind: MeasurementKind,
    device_micros: u64,
    fields: &[i64],
    layout: &FrameLayout,
) -> Result<Bytes> {
    if fields.len() != kind.field_count() {
        return Err(DecodeError::MalformedFrame {
            kind: Some(kind),
            expected: kind.field_count(),
            actual: fields.len(),
        });
    }

    let width = layout.width_of(kind);
    let (min, max) = width.range();

    let mut buf = BytesMut::with_capacity(layout.frame_len(kind));
    buf.put_u8(kind.tag());
    buf.put_u64_le(device_micros);
    for &value in fields {
        if value < min || value > max {
            return Err(DecodeError::FieldOverflow {
                kind,
                value,
                bytes: width.bytes(),
            });
        }
        buf.put_int_le(value, width.bytes());
    }
    Ok(buf.freeze())
}
