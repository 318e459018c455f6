//! Client session: drains its queue and transmits frames to one peer.
//!
//! Each accepted connection gets exactly one session with its own queue and
//! its own thread, so a slow or frozen client can never delay delivery to
//! any other client or to the producer.
//!
//! # Lifecycle
//!
//! ```text
//! Connected ──(queue non-empty)──▶ send header + payloads ──┐
//!     ▲                                                     │ I/O error or
//!     └──(queue empty: bounded idle sleep)◀─────────────────┤ shutdown
//!                                                           ▼
//!                                                        Closing
//! ```
//!
//! Any write that transfers fewer bytes than requested, or returns an I/O
//! error, is treated as disconnection and is not retried. Failures are
//! contained here: the session closes its socket, the connected-client
//! counter drops by one, and nothing propagates to the server or to other
//! sessions.

use crate::frame::FrameRecord;
use crate::queue::FrameQueue;
use crate::wire;
use log::{debug, info};
use std::io::{self, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// Initial capacity for the per-session send buffer
const INITIAL_SEND_CAPACITY: usize = 4096;

/// Server-side registry entry for one spawned session.
///
/// The server owns these so `stop()` can account for every session it ever
/// spawned instead of leaking detached threads.
pub(crate) struct SessionHandle {
    pub peer: SocketAddr,
    pub queue: Arc<FrameQueue>,
    pub alive: Arc<AtomicBool>,
    pub join: Option<JoinHandle<()>>,
}

/// Registry of live sessions, shared between acceptor and server
pub(crate) type SessionRegistry = Arc<parking_lot::Mutex<Vec<SessionHandle>>>;

/// Increments the connected-client counter on creation and decrements it
/// when dropped, so the count stays correct even if the send path panics.
pub(crate) struct ClientCountGuard(Arc<AtomicUsize>);

impl ClientCountGuard {
    pub(crate) fn register(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(counter))
    }
}

impl Drop for ClientCountGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Session state for one connected client.
///
/// Exclusively owns its socket and queue.
pub struct ClientSession {
    stream: TcpStream,
    peer: SocketAddr,
    queue: Arc<FrameQueue>,
    /// Global running flag (server shutdown)
    running: Arc<AtomicBool>,
    /// Per-connection alive flag (connection health)
    alive: Arc<AtomicBool>,
    idle_poll: Duration,
    /// Reusable frame serialization buffer (avoids allocation per frame)
    send_buffer: Vec<u8>,
}

impl ClientSession {
    pub(crate) fn new(
        stream: TcpStream,
        peer: SocketAddr,
        queue: Arc<FrameQueue>,
        running: Arc<AtomicBool>,
        alive: Arc<AtomicBool>,
        idle_poll: Duration,
    ) -> Self {
        Self {
            stream,
            peer,
            queue,
            running,
            alive,
            idle_poll,
            send_buffer: Vec::with_capacity(INITIAL_SEND_CAPACITY),
        }
    }

    /// Run the transmit loop until disconnect or server shutdown.
    pub fn run(&mut self) {
        info!("Session started for {}", self.peer);

        while self.running.load(Ordering::Relaxed) && self.alive.load(Ordering::Relaxed) {
            match self.queue.pop() {
                Some(frame) => {
                    if let Err(e) = self.send_frame(&frame) {
                        debug!("Client {} disconnected: {}", self.peer, e);
                        break;
                    }
                }
                // Queue empty: bounded idle wait so we don't busy-spin
                None => std::thread::sleep(self.idle_poll),
            }
        }

        self.close();
    }

    /// Serialize and fully transmit one frame.
    ///
    /// `write_all` turns any short write into an error, so a partial
    /// transfer is indistinguishable from a failed one: both disconnect.
    fn send_frame(&mut self, frame: &FrameRecord) -> io::Result<()> {
        wire::encode_frame(frame, &mut self.send_buffer);
        self.stream.write_all(&self.send_buffer)
    }

    /// Transition to Closing: no further sends are attempted.
    fn close(&mut self) {
        self.alive.store(false, Ordering::Relaxed);
        let _ = self.stream.shutdown(Shutdown::Both);
        info!(
            "Session closed for {} ({} frames dropped by its queue)",
            self.peer,
            self.queue.dropped()
        );
    }
}
