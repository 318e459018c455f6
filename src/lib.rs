//! Framecast - real-time multi-channel frame streaming over TCP
//!
//! This library takes newly captured depth/color/infrared frames from a
//! single producer and fans them out, over a fixed binary protocol, to any
//! number of independently-paced TCP clients.
//!
//! Producer cadence is decoupled from consumer cadence: every client gets
//! its own bounded drop-oldest queue, so a slow or absent reader costs
//! stale frames for that client only, never memory growth, producer stalls,
//! or delays for other clients.
//!
//! ```no_run
//! use framecast::{RawChannel, RawFrame, ServerConfig, StreamServer};
//!
//! let server = StreamServer::new(ServerConfig {
//!     bind_address: "0.0.0.0:8888".to_string(),
//!     queue_capacity: 10,
//!     idle_poll_ms: 10,
//! });
//! server.start()?;
//!
//! let depth = vec![0u8; 640 * 480 * 2];
//! server.push_frame(&RawFrame {
//!     depth: Some(RawChannel {
//!         width: 640,
//!         height: 480,
//!         byte_size: depth.len() as u32,
//!         data: &depth,
//!     }),
//!     color: None,
//!     ir: None,
//! });
//!
//! server.stop();
//! # Ok::<(), framecast::Error>(())
//! ```

pub mod acceptor;
pub mod config;
pub mod error;
pub mod frame;
pub mod queue;
pub mod server;
pub mod session;
pub mod source;
pub mod wire;

// Re-export commonly used types
pub use config::{AppConfig, ServerConfig, SourceConfig};
pub use error::{Error, Result};
pub use frame::{ChannelPlane, FrameRecord, RawChannel, RawFrame};
pub use queue::FrameQueue;
pub use server::StreamServer;
