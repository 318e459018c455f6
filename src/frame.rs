//! Frame records and ingestion-time validation.
//!
//! A [`FrameRecord`] is one timestamped multi-channel image sample (depth,
//! color, infrared). Records are built once from borrowed producer input
//! ([`RawFrame`]), then shared read-only as `Arc<FrameRecord>` across every
//! client queue that still references them. The last queue to drop its
//! reference frees the channel buffers.

use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// One image plane within a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelPlane {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Raw plane bytes (pixel format is opaque to the server)
    pub data: Vec<u8>,
}

impl ChannelPlane {
    /// Number of payload bytes this plane carries.
    #[inline]
    pub fn byte_size(&self) -> u32 {
        self.data.len() as u32
    }
}

/// Borrowed per-channel descriptor handed in by the frame source.
///
/// `byte_size` is the producer's declared payload length. It must match
/// `data.len()`; a mismatch downgrades the channel to absent at ingestion.
#[derive(Debug, Clone, Copy)]
pub struct RawChannel<'a> {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Declared payload length in bytes
    pub byte_size: u32,
    /// Plane bytes owned by the caller; copied at ingestion
    pub data: &'a [u8],
}

/// Borrowed multi-channel frame descriptor passed to
/// [`StreamServer::push_frame`](crate::server::StreamServer::push_frame).
///
/// Any channel may be absent. Channel bytes are copied when the record is
/// built, so the record's lifetime is independent of the caller's buffers.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawFrame<'a> {
    pub depth: Option<RawChannel<'a>>,
    pub color: Option<RawChannel<'a>>,
    pub ir: Option<RawChannel<'a>>,
}

/// Immutable multi-channel frame sample.
///
/// Invariant: a present plane's byte size always equals the bytes actually
/// carried; an absent plane carries no payload at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameRecord {
    /// Monotonic capture time in microseconds, assigned at ingestion
    pub timestamp_us: u64,
    /// Strictly increasing counter assigned at ingestion; wraps silently
    pub sequence_id: u32,
    /// Depth plane, if present
    pub depth: Option<ChannelPlane>,
    /// Color plane, if present
    pub color: Option<ChannelPlane>,
    /// Infrared plane, if present
    pub ir: Option<ChannelPlane>,
}

impl FrameRecord {
    /// Build a record from borrowed producer input, copying channel bytes.
    ///
    /// Each channel is validated independently: a declared size of zero, a
    /// size that does not match the slice length, or zero dimensions with a
    /// nonzero size downgrade that channel to absent rather than failing
    /// the whole frame.
    pub(crate) fn from_raw(raw: &RawFrame<'_>, sequence_id: u32, timestamp_us: u64) -> Self {
        Self {
            timestamp_us,
            sequence_id,
            depth: sanitize("depth", raw.depth.as_ref()),
            color: sanitize("color", raw.color.as_ref()),
            ir: sanitize("ir", raw.ir.as_ref()),
        }
    }

    /// Total payload bytes across all present planes.
    pub fn payload_len(&self) -> usize {
        [&self.depth, &self.color, &self.ir]
            .into_iter()
            .flatten()
            .map(|p| p.data.len())
            .sum()
    }
}

/// Validate one raw channel, copying its bytes on success.
fn sanitize(label: &str, channel: Option<&RawChannel<'_>>) -> Option<ChannelPlane> {
    let channel = channel?;

    // byte_size == 0 means the channel is absent for this frame
    if channel.byte_size == 0 {
        return None;
    }

    if channel.byte_size as usize != channel.data.len()
        || channel.width == 0
        || channel.height == 0
    {
        log::warn!(
            "Inconsistent {} channel ({}x{}, declared {} bytes, got {}), treating as absent",
            label,
            channel.width,
            channel.height,
            channel.byte_size,
            channel.data.len()
        );
        return None;
    }

    Some(ChannelPlane {
        width: channel.width,
        height: channel.height,
        data: channel.data.to_vec(),
    })
}

/// Monotonic microsecond clock anchored to the wall clock at creation.
///
/// Timestamps are epoch-referenced (so clients can relate them to wall time)
/// but advance from a monotonic source, so they never step backwards when
/// the system clock is adjusted.
#[derive(Debug)]
pub struct MonotonicClock {
    base_us: u64,
    started: Instant,
}

impl MonotonicClock {
    /// Anchor a new clock to the current wall-clock time.
    pub fn new() -> Self {
        let base_us = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_micros() as u64)
            .unwrap_or(0);
        Self {
            base_us,
            started: Instant::now(),
        }
    }

    /// Current time in microseconds since the Unix epoch.
    #[inline]
    pub fn now_us(&self) -> u64 {
        self.base_us + self.started.elapsed().as_micros() as u64
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}
