//! Capture files: recorded notification payloads
//!
//! A capture is a plain concatenation of records:
//!
//! ```text
//! [len: u16 LE][payload: len bytes] [len: u16 LE][payload] ...
//! ```
//!
//! Payloads are stored verbatim, malformed ones included, so a replay
//! exercises the decoder exactly as the live session did.

use std::path::{Path, PathBuf};

use bytes::{Buf, BufMut, Bytes, BytesMut};
use contracts::NotificationSource;
use tracing::{debug, info};

use crate::error::{CaptureError, Result, SessionError};
use crate::pacing::{frame_micros, Pacer};

const LEN_PREFIX: usize = 2;

/// Serialize payloads into the capture format
pub fn encode_capture(frames: &[Bytes]) -> std::result::Result<Bytes, CaptureError> {
    let total: usize = frames.iter().map(|f| f.len() + LEN_PREFIX).sum();
    let mut buf = BytesMut::with_capacity(total);

    for (index, frame) in frames.iter().enumerate() {
        let len = u16::try_from(frame.len()).map_err(|_| CaptureError::RecordTooLarge {
            index,
            len: frame.len(),
        })?;
        buf.put_u16_le(len);
        buf.put_slice(frame);
    }
    Ok(buf.freeze())
}

/// Split capture-format bytes back into payloads
pub fn decode_capture(mut data: Bytes) -> std::result::Result<Vec<Bytes>, CaptureError> {
    let mut frames = Vec::new();
    while data.has_remaining() {
        if data.remaining() < LEN_PREFIX {
            return Err(CaptureError::TruncatedPrefix {
                records: frames.len(),
            });
        }
        let len = usize::from(data.get_u16_le());
        if data.remaining() < len {
            return Err(CaptureError::TruncatedRecord {
                index: frames.len(),
                declared: len,
                remaining: data.remaining(),
            });
        }
        frames.push(data.split_to(len));
    }
    Ok(frames)
}

/// Write payloads to `path`, replacing any existing file
pub fn write_capture(path: impl AsRef<Path>, frames: &[Bytes]) -> Result<()> {
    let path = path.as_ref();
    let data = encode_capture(frames).map_err(|e| SessionError::capture(path, e))?;
    std::fs::write(path, &data)?;
    info!(path = %path.display(), records = frames.len(), bytes = data.len(), "capture written");
    Ok(())
}

/// Read every payload stored in `path`
pub fn read_capture(path: impl AsRef<Path>) -> Result<Vec<Bytes>> {
    let path = path.as_ref();
    let data = std::fs::read(path)?;
    let frames = decode_capture(Bytes::from(data)).map_err(|e| SessionError::capture(path, e))?;
    debug!(path = %path.display(), records = frames.len(), "capture loaded");
    Ok(frames)
}

/// Replays a capture as a notification source
///
/// Without pacing, payloads are delivered as fast as they are pulled.
/// With pacing, each payload waits for its device timestamp relative to
/// the first one; payloads too short to carry a timestamp are released
/// immediately.
#[derive(Debug)]
pub struct CaptureSource {
    path: Option<PathBuf>,
    frames: std::vec::IntoIter<Bytes>,
    pacer: Option<Pacer>,
}

impl CaptureSource {
    /// Load a capture file
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let frames = read_capture(path)?;
        Ok(Self {
            path: Some(path.to_path_buf()),
            ..Self::from_frames(frames)
        })
    }

    /// Replay payloads already in memory
    pub fn from_frames(frames: Vec<Bytes>) -> Self {
        Self {
            path: None,
            frames: frames.into_iter(),
            pacer: None,
        }
    }

    /// Pace delivery by device timestamps, `speed` times real time
    pub fn paced(mut self, speed: f64) -> Self {
        self.pacer = Some(Pacer::new(speed));
        self
    }

    /// Payloads not yet delivered
    pub fn remaining(&self) -> usize {
        self.frames.len()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

impl NotificationSource for CaptureSource {
    async fn next_notification(&mut self) -> Option<Bytes> {
        let frame = self.frames.as_slice().first()?.clone();
        if let (Some(pacer), Some(micros)) = (self.pacer.as_mut(), frame_micros(&frame)) {
            pacer.wait(micros).await;
        }
        self.frames.next();
        Some(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn frames() -> Vec<Bytes> {
        vec![
            Bytes::from_static(&[0x02, 1, 2, 3]),
            Bytes::new(),
            Bytes::from_static(&[0xFF]),
        ]
    }

    #[test]
    fn test_write_then_read_capture() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.cap");

        write_capture(&path, &frames()).unwrap();
        // three length prefixes plus five payload bytes
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 11);

        let loaded = read_capture(&path).unwrap();
        assert_eq!(loaded, frames());
    }

    #[test]
    fn test_truncated_capture_is_rejected() {
        let encoded = encode_capture(&frames()).unwrap();
        let cut = encoded.slice(..encoded.len() - 1);
        assert_eq!(
            decode_capture(cut).unwrap_err(),
            CaptureError::TruncatedRecord {
                index: 2,
                declared: 1,
                remaining: 0,
            }
        );

        let err = decode_capture(Bytes::from_static(&[0x01])).unwrap_err();
        assert_eq!(err, CaptureError::TruncatedPrefix { records: 0 });
        assert!(err.to_string().contains("length prefix"));
    }

    #[test]
    fn test_oversized_record_is_rejected() {
        let big = Bytes::from(vec![0u8; usize::from(u16::MAX) + 1]);
        assert!(matches!(
            encode_capture(&[Bytes::new(), big]),
            Err(CaptureError::RecordTooLarge { index: 1, len: 65_536 })
        ));
    }

    #[test]
    fn test_corrupt_capture_file_names_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cut.cap");
        std::fs::write(&path, [0x05, 0x00, 0x01]).unwrap();

        let err = read_capture(&path).unwrap_err();
        assert!(matches!(
            err,
            SessionError::Capture {
                source: CaptureError::TruncatedRecord { declared: 5, .. },
                ..
            }
        ));
        assert!(err.to_string().contains("cut.cap"));
    }

    #[test]
    fn test_missing_capture_file() {
        let dir = tempdir().unwrap();
        let err = read_capture(dir.path().join("absent.cap")).unwrap_err();
        assert!(matches!(err, SessionError::Io(_)));
    }

    #[tokio::test]
    async fn test_capture_source_replays_in_order() {
        let mut source = CaptureSource::from_frames(frames());
        assert_eq!(source.remaining(), 3);

        let mut seen = Vec::new();
        while let Some(frame) = source.next_notification().await {
            seen.push(frame);
        }
        assert_eq!(seen, frames());
        assert!(source.next_notification().await.is_none());
    }
}
