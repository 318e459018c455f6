//! Synthetic frame source.
//!
//! Stand-in for the capture pipeline: generates moving-test-pattern depth,
//! color and infrared planes at a configured resolution. Used by the demo
//! daemon and by integration tests as the producer feeding
//! [`StreamServer::push_frame`](crate::server::StreamServer::push_frame).

use crate::config::SourceConfig;
use crate::frame::{RawChannel, RawFrame};

/// Generates multi-channel test-pattern frames.
///
/// Depth is a 16-bit horizontal gradient, color a 3-byte-per-pixel BGR
/// gradient, infrared an 8-bit gradient; all shift by one pixel per frame so
/// consecutive frames are distinguishable on the wire.
pub struct TestPatternSource {
    config: SourceConfig,
    phase: u32,
    depth_buf: Vec<u8>,
    color_buf: Vec<u8>,
    ir_buf: Vec<u8>,
}

impl TestPatternSource {
    pub fn new(config: SourceConfig) -> Self {
        let pixels = (config.width * config.height) as usize;
        Self {
            depth_buf: vec![0u8; pixels * 2],
            color_buf: if config.color { vec![0u8; pixels * 3] } else { Vec::new() },
            ir_buf: if config.ir { vec![0u8; pixels] } else { Vec::new() },
            config,
            phase: 0,
        }
    }

    /// Produce the next frame, advancing the pattern phase.
    ///
    /// The returned view borrows this source's internal buffers; the server
    /// copies the bytes at ingestion.
    pub fn next_frame(&mut self) -> RawFrame<'_> {
        self.phase = self.phase.wrapping_add(1);
        let width = self.config.width;
        let height = self.config.height;
        let phase = self.phase;

        for y in 0..height {
            for x in 0..width {
                let shifted = (x + phase) % width;
                let i = (y * width + x) as usize;

                // Depth in millimeter-like units, 16-bit little-endian
                let depth = (500 + shifted * 8) as u16;
                self.depth_buf[i * 2..i * 2 + 2].copy_from_slice(&depth.to_le_bytes());

                if self.config.color {
                    let c = &mut self.color_buf[i * 3..i * 3 + 3];
                    c[0] = (shifted % 256) as u8; // B
                    c[1] = (y % 256) as u8; // G
                    c[2] = (phase % 256) as u8; // R
                }
                if self.config.ir {
                    self.ir_buf[i] = ((shifted + y) % 256) as u8;
                }
            }
        }

        RawFrame {
            depth: Some(channel(width, height, &self.depth_buf)),
            color: self.config.color.then(|| channel(width, height, &self.color_buf)),
            ir: self.config.ir.then(|| channel(width, height, &self.ir_buf)),
        }
    }
}

fn channel(width: u32, height: u32, data: &[u8]) -> RawChannel<'_> {
    RawChannel {
        width,
        height,
        byte_size: data.len() as u32,
        data,
    }
}
