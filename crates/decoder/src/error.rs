//! Decoder error types

use contracts::MeasurementKind;
use thiserror::Error;

/// Why a notification could not be decoded
///
/// Both decode variants are per-frame: the frame is discarded and the
/// next notification is decoded normally.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Length does not match the layout implied by the tag
    ///
    /// Lengths are bytes for wire frames and field counts for a
    /// hand-built `RawSample`.
    #[error("malformed {} frame: expected length {expected}, got {actual}", kind_label(.kind))]
    MalformedFrame {
        /// Kind named by the tag, `None` when there was no tag byte
        kind: Option<MeasurementKind>,
        expected: usize,
        actual: usize,
    },

    /// Tag byte is not a recognized measurement kind
    #[error("unknown measurement kind tag 0x{tag:02x}")]
    UnknownKind { tag: u8 },

    /// Value does not fit the configured field width (encoder only)
    #[error("value {value} does not fit a {bytes}-byte {kind} field")]
    FieldOverflow {
        kind: MeasurementKind,
        value: i64,
        bytes: usize,
    },
}

fn kind_label(kind: &Option<MeasurementKind>) -> &'static str {
    kind.map(MeasurementKind::as_str).unwrap_or("untagged")
}

impl DecodeError {
    /// Metric label for the error class
    pub fn label(&self) -> &'static str {
        match self {
            DecodeError::MalformedFrame { .. } => "malformed_frame",
            DecodeError::UnknownKind { .. } => "unknown_kind",
            DecodeError::FieldOverflow { .. } => "field_overflow",
        }
    }
}

/// Decoder Result type alias
pub type Result<T> = std::result::Result<T, DecodeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = DecodeError::MalformedFrame {
            kind: Some(MeasurementKind::Acceleration),
            expected: 15,
            actual: 13,
        };
        assert_eq!(err.to_string(), "malformed acc frame: expected length 15, got 13");

        let err = DecodeError::MalformedFrame {
            kind: None,
            expected: 1,
            actual: 0,
        };
        assert!(err.to_string().contains("untagged"));

        assert_eq!(
            DecodeError::UnknownKind { tag: 0x7f }.to_string(),
            "unknown measurement kind tag 0x7f"
        );
    }
}
