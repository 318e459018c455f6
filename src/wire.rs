//! Wire codec for the frame stream.
//!
//! # TCP Protocol Specification
//!
//! Each frame is sent as a fixed 48-byte header immediately followed by the
//! payload bytes of every present channel, in depth → color → ir order.
//! Absent channels contribute zero bytes, not a placeholder. There is no
//! padding, compression, or additional framing.
//!
//! ```text
//! offset  size  field
//! 0       8     timestamp_us
//! 8       4     frame_sequence_id
//! 12      4     depth_width       24  4  color_width      36  4  ir_width
//! 16      4     depth_height      28  4  color_height     40  4  ir_height
//! 20      4     depth_byte_size   32  4  color_byte_size  44  4  ir_byte_size
//! ```
//!
//! All fields are little-endian unsigned integers. A receiver reads the
//! fixed header, then exactly `depth_byte_size + color_byte_size +
//! ir_byte_size` further bytes in that order.
//!
//! This module provides both the encoder used by client sessions and the
//! reference decoder ([`read_frame`]) used by tests and example clients.

use crate::frame::{ChannelPlane, FrameRecord};
use std::io::{self, Read};

/// Fixed header length in bytes
pub const HEADER_LEN: usize = 48;

/// Per-channel sanity limit for the reference decoder (256 MiB)
const MAX_CHANNEL_BYTES: u32 = 1 << 28;

/// Dimensions of one channel as carried in the header.
///
/// An absent channel is all zeros.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChannelDims {
    pub width: u32,
    pub height: u32,
    pub byte_size: u32,
}

impl ChannelDims {
    fn for_plane(plane: Option<&ChannelPlane>) -> Self {
        match plane {
            Some(p) => Self {
                width: p.width,
                height: p.height,
                byte_size: p.byte_size(),
            },
            None => Self::default(),
        }
    }
}

/// The fixed 48-byte frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameHeader {
    pub timestamp_us: u64,
    pub sequence_id: u32,
    pub depth: ChannelDims,
    pub color: ChannelDims,
    pub ir: ChannelDims,
}

impl FrameHeader {
    /// Build the header describing `frame`.
    pub fn for_frame(frame: &FrameRecord) -> Self {
        Self {
            timestamp_us: frame.timestamp_us,
            sequence_id: frame.sequence_id,
            depth: ChannelDims::for_plane(frame.depth.as_ref()),
            color: ChannelDims::for_plane(frame.color.as_ref()),
            ir: ChannelDims::for_plane(frame.ir.as_ref()),
        }
    }

    /// Encode to the 48-byte wire representation.
    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let mut buf = [0u8; HEADER_LEN];
        buf[0..8].copy_from_slice(&self.timestamp_us.to_le_bytes());
        buf[8..12].copy_from_slice(&self.sequence_id.to_le_bytes());
        put_dims(&mut buf[12..24], &self.depth);
        put_dims(&mut buf[24..36], &self.color);
        put_dims(&mut buf[36..48], &self.ir);
        buf
    }

    /// Decode from the 48-byte wire representation.
    pub fn decode(buf: &[u8; HEADER_LEN]) -> Self {
        Self {
            timestamp_us: u64::from_le_bytes(buf[0..8].try_into().unwrap()),
            sequence_id: u32::from_le_bytes(buf[8..12].try_into().unwrap()),
            depth: get_dims(&buf[12..24]),
            color: get_dims(&buf[24..36]),
            ir: get_dims(&buf[36..48]),
        }
    }

    /// Total payload bytes that follow this header on the wire.
    pub fn payload_len(&self) -> usize {
        self.depth.byte_size as usize + self.color.byte_size as usize + self.ir.byte_size as usize
    }
}

fn put_dims(buf: &mut [u8], dims: &ChannelDims) {
    buf[0..4].copy_from_slice(&dims.width.to_le_bytes());
    buf[4..8].copy_from_slice(&dims.height.to_le_bytes());
    buf[8..12].copy_from_slice(&dims.byte_size.to_le_bytes());
}

fn get_dims(buf: &[u8]) -> ChannelDims {
    ChannelDims {
        width: u32::from_le_bytes(buf[0..4].try_into().unwrap()),
        height: u32::from_le_bytes(buf[4..8].try_into().unwrap()),
        byte_size: u32::from_le_bytes(buf[8..12].try_into().unwrap()),
    }
}

/// Encode a full frame (header plus present payloads) into `buf`.
///
/// Reuses the caller's buffer to avoid an allocation per frame.
pub fn encode_frame(frame: &FrameRecord, buf: &mut Vec<u8>) {
    buf.clear();
    buf.reserve(HEADER_LEN + frame.payload_len());
    buf.extend_from_slice(&FrameHeader::for_frame(frame).encode());
    for plane in [&frame.depth, &frame.color, &frame.ir].into_iter().flatten() {
        buf.extend_from_slice(&plane.data);
    }
}

/// One frame as read back off the wire by the reference decoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedFrame {
    pub header: FrameHeader,
    pub depth: Vec<u8>,
    pub color: Vec<u8>,
    pub ir: Vec<u8>,
}

/// Reference decoder: read exactly one frame from a stream.
///
/// Reads the fixed header, then each channel payload in wire order. Absent
/// channels yield empty payload vectors.
pub fn read_frame<R: Read>(reader: &mut R) -> io::Result<DecodedFrame> {
    let mut header_buf = [0u8; HEADER_LEN];
    reader.read_exact(&mut header_buf)?;
    let header = FrameHeader::decode(&header_buf);

    for dims in [&header.depth, &header.color, &header.ir] {
        if dims.byte_size > MAX_CHANNEL_BYTES {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Channel payload too large: {} bytes", dims.byte_size),
            ));
        }
    }

    let depth = read_payload(reader, header.depth.byte_size)?;
    let color = read_payload(reader, header.color.byte_size)?;
    let ir = read_payload(reader, header.ir.byte_size)?;

    Ok(DecodedFrame {
        header,
        depth,
        color,
        ir,
    })
}

fn read_payload<R: Read>(reader: &mut R, len: u32) -> io::Result<Vec<u8>> {
    let mut buf = vec![0u8; len as usize];
    reader.read_exact(&mut buf)?;
    Ok(buf)
}
