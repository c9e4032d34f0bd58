//! Debug frame stream
//!
//! Sensors can stream raw frames to the controller for calibration and
//! debugging: either the segmented silhouette mask or the unprojected
//! point cloud. Each datagram is a 4-byte big-endian kind tag followed by
//! an opaque payload; the payload encoding is owned by the producing
//! sensor and passed through untouched.

use crate::error::{ArgosError, ArgosResult};

/// What a frame datagram carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Mask,
    PointCloud,
}

impl FrameKind {
    fn tag(self) -> u32 {
        match self {
            FrameKind::Mask => 0,
            FrameKind::PointCloud => 1,
        }
    }

    fn from_tag(tag: u32) -> ArgosResult<Self> {
        match tag {
            0 => Ok(FrameKind::Mask),
            1 => Ok(FrameKind::PointCloud),
            other => Err(ArgosError::parse(format!("unknown frame kind tag {other}"))),
        }
    }
}

/// Encode a frame datagram.
pub fn encode_frame(kind: FrameKind, payload: &[u8], buf: &mut Vec<u8>) {
    buf.clear();
    buf.extend_from_slice(&kind.tag().to_be_bytes());
    buf.extend_from_slice(payload);
}

/// Split a received datagram into its kind and payload.
pub fn decode_frame(buf: &[u8]) -> ArgosResult<(FrameKind, &[u8])> {
    if buf.len() < 4 {
        return Err(ArgosError::parse(format!(
            "frame datagram too short: {} bytes",
            buf.len()
        )));
    }
    let tag = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]);
    Ok((FrameKind::from_tag(tag)?, &buf[4..]))
}
