//! Stream server orchestrator.
//!
//! The public-facing component: lifecycle (`start`/`stop`), the single
//! producer entry point (`push_frame`), and read-only observers. Owns the
//! acceptor thread and the registry of spawned sessions.
//!
//! There is no implicit singleton: the host constructs, starts and stops a
//! [`StreamServer`] explicitly, and may run several on different ports.

use crate::acceptor::{self, Acceptor};
use crate::config::ServerConfig;
use crate::error::Result;
use crate::frame::{FrameRecord, MonotonicClock, RawFrame};
use crate::session::SessionRegistry;
use log::{debug, info};
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Fan-out frame streaming server.
///
/// Frames pushed by the producer are broadcast to a per-client bounded
/// queue, so every connected client receives the stream at its own pace and
/// with its own staleness under overflow.
pub struct StreamServer {
    config: ServerConfig,
    running: Arc<AtomicBool>,
    clients: Arc<AtomicUsize>,
    sessions: SessionRegistry,
    sequence: AtomicU32,
    frames_pushed: AtomicU64,
    frames_dropped: AtomicU64,
    clock: MonotonicClock,
    /// Also serializes start/stop so concurrent lifecycle calls are safe
    acceptor_thread: Mutex<Option<JoinHandle<()>>>,
    local_addr: Mutex<Option<SocketAddr>>,
}

impl StreamServer {
    /// Create a server in the not-running state.
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            running: Arc::new(AtomicBool::new(false)),
            clients: Arc::new(AtomicUsize::new(0)),
            sessions: Arc::new(Mutex::new(Vec::new())),
            sequence: AtomicU32::new(0),
            frames_pushed: AtomicU64::new(0),
            frames_dropped: AtomicU64::new(0),
            clock: MonotonicClock::new(),
            acceptor_thread: Mutex::new(None),
            local_addr: Mutex::new(None),
        }
    }

    /// Bind the listener and start the acceptor thread.
    ///
    /// Idempotent: a no-op when already running. On any bind or spawn
    /// failure the server remains in the not-running state and the caller
    /// decides retry policy.
    pub fn start(&self) -> Result<()> {
        let mut acceptor_slot = self.acceptor_thread.lock();
        if self.running.load(Ordering::SeqCst) {
            return Ok(());
        }

        let listener = acceptor::bind(&self.config.bind_address)?;
        let bound = listener.local_addr()?;

        self.running.store(true, Ordering::SeqCst);

        let acceptor = Acceptor::new(
            listener,
            Arc::clone(&self.running),
            Arc::clone(&self.sessions),
            Arc::clone(&self.clients),
            self.config.queue_capacity,
            self.config.idle_poll(),
        );

        let handle = thread::Builder::new()
            .name("frame-acceptor".to_string())
            .spawn(move || acceptor.run())
            .map_err(|e| {
                self.running.store(false, Ordering::SeqCst);
                crate::error::Error::Io(e)
            })?;

        *acceptor_slot = Some(handle);
        *self.local_addr.lock() = Some(bound);

        info!("Stream server started on {}", bound);
        Ok(())
    }

    /// Stop accepting and signal every session to wind down.
    ///
    /// Idempotent: a no-op when not running. Joins the acceptor thread
    /// (which closes the listener) but does not force-wait on session
    /// threads; they observe the cleared running flag and exit within one
    /// idle poll interval. Closing the listener does not close already-open
    /// client sockets.
    pub fn stop(&self) {
        let mut acceptor_slot = self.acceptor_thread.lock();
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }

        if let Some(handle) = acceptor_slot.take() {
            let _ = handle.join();
        }
        *self.local_addr.lock() = None;

        // Account for every spawned session without blocking on live ones:
        // finished threads are joined, still-draining ones are released.
        let drained: Vec<_> = self.sessions.lock().drain(..).collect();
        let mut live = 0usize;
        for mut session in drained {
            if session.alive.load(Ordering::Relaxed) {
                live += 1;
            } else if let Some(handle) = session.join.take() {
                let _ = handle.join();
            }
        }
        if live > 0 {
            info!("Stream server stopped ({} session(s) still draining)", live);
        } else {
            info!("Stream server stopped");
        }
    }

    /// Producer entry point: validate, timestamp and broadcast one frame.
    ///
    /// Builds a single shared [`FrameRecord`] (copying channel bytes so its
    /// lifetime is independent of the caller's buffers), assigns the next
    /// sequence id and a fresh monotonic timestamp, and enqueues it to every
    /// live session's queue. Never blocks on client I/O: queue overflow
    /// evicts that client's oldest pending frame instead.
    ///
    /// A call while not running is a silent no-op.
    pub fn push_frame(&self, raw: &RawFrame<'_>) {
        if !self.running.load(Ordering::Relaxed) {
            return;
        }

        // Wraps silently at u32::MAX; first frame gets 1
        let sequence_id = self.sequence.fetch_add(1, Ordering::Relaxed).wrapping_add(1);
        let record = Arc::new(FrameRecord::from_raw(raw, sequence_id, self.clock.now_us()));
        self.frames_pushed.fetch_add(1, Ordering::Relaxed);

        let mut sessions = self.sessions.lock();
        sessions.retain_mut(|session| {
            if session.alive.load(Ordering::Relaxed) {
                if session.queue.push(Arc::clone(&record)) {
                    self.frames_dropped.fetch_add(1, Ordering::Relaxed);
                }
                true
            } else {
                debug!("Pruning finished session for {}", session.peer);
                if let Some(handle) = session.join.take() {
                    // Thread already past its send loop; joining is bounded
                    let _ = handle.join();
                }
                false
            }
        });
    }

    /// Whether the server is currently accepting and streaming.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Number of currently connected clients.
    pub fn connected_clients(&self) -> usize {
        self.clients.load(Ordering::SeqCst)
    }

    /// Address the listener is bound to, while running.
    ///
    /// Useful when configured with port 0.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *self.local_addr.lock()
    }

    /// Total frames accepted from the producer since construction.
    pub fn frames_pushed(&self) -> u64 {
        self.frames_pushed.load(Ordering::Relaxed)
    }

    /// Total per-client queue evictions observed at push time.
    pub fn frames_dropped(&self) -> u64 {
        self.frames_dropped.load(Ordering::Relaxed)
    }
}

impl Drop for StreamServer {
    fn drop(&mut self) {
        self.stop();
    }
}
