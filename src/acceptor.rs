//! Connection acceptor: owns the listener and spawns one session per client.
//!
//! The acceptor runs on its own thread for the server's active lifetime.
//! Each accepted connection gets a fresh empty queue and a dedicated session
//! thread, and the loop returns to accepting immediately, so acceptance is
//! never blocked by session setup or by any existing session's throughput.
//!
//! The listener is non-blocking and the loop polls the running flag between
//! attempts, so `stop()` unblocks a pending accept within one poll interval.
//! The listener is exclusively owned here and is closed when the loop exits;
//! that does not close already-open client sockets.

use crate::error::{Error, Result};
use crate::queue::FrameQueue;
use crate::session::{ClientCountGuard, ClientSession, SessionHandle, SessionRegistry};
use log::{error, info, warn};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Bind the listening socket for the given address.
///
/// `std::net::TcpListener::bind` sets `SO_REUSEADDR` on Unix and puts the
/// socket in a listening state; failures are surfaced distinctly so the
/// caller can report why startup failed.
pub(crate) fn bind(address: &str) -> Result<TcpListener> {
    let listener = TcpListener::bind(address).map_err(|e| Error::Bind {
        address: address.to_string(),
        source: e,
    })?;
    listener.set_nonblocking(true)?;
    Ok(listener)
}

/// Accept loop state. Consumed by [`Acceptor::run`] on the acceptor thread.
pub(crate) struct Acceptor {
    listener: TcpListener,
    running: Arc<AtomicBool>,
    sessions: SessionRegistry,
    clients: Arc<AtomicUsize>,
    queue_capacity: usize,
    idle_poll: Duration,
}

impl Acceptor {
    pub(crate) fn new(
        listener: TcpListener,
        running: Arc<AtomicBool>,
        sessions: SessionRegistry,
        clients: Arc<AtomicUsize>,
        queue_capacity: usize,
        idle_poll: Duration,
    ) -> Self {
        Self {
            listener,
            running,
            sessions,
            clients,
            queue_capacity,
            idle_poll,
        }
    }

    /// Run the accept loop until shutdown is requested.
    pub(crate) fn run(self) {
        if let Ok(addr) = self.listener.local_addr() {
            info!("Acceptor listening on {}", addr);
        }

        while self.running.load(Ordering::Relaxed) {
            match self.listener.accept() {
                Ok((stream, addr)) => self.spawn_session(stream, addr),
                Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    // No connection pending; re-check the running flag shortly
                    thread::sleep(self.idle_poll);
                }
                Err(e) => {
                    // Transient while running; silent once shutdown is requested
                    if self.running.load(Ordering::Relaxed) {
                        error!("Accept error: {}", e);
                    } else {
                        break;
                    }
                }
            }
        }

        info!("Acceptor stopped");
        // Listener dropped (closed) here
    }

    /// Spawn exactly one session thread for an accepted connection.
    fn spawn_session(&self, stream: TcpStream, addr: SocketAddr) {
        // Sessions use blocking sends on their own thread
        if let Err(e) = stream.set_nonblocking(false) {
            warn!("Failed to set blocking mode for client {}: {}", addr, e);
            return;
        }

        let queue = Arc::new(FrameQueue::new(self.queue_capacity));
        let alive = Arc::new(AtomicBool::new(true));

        let session_queue = Arc::clone(&queue);
        let session_alive = Arc::clone(&alive);
        let session_running = Arc::clone(&self.running);
        let idle_poll = self.idle_poll;

        // Hold the registry lock across counter increment, spawn and
        // registration so a concurrent push_frame never observes the new
        // client count without its queue.
        let mut sessions = self.sessions.lock();
        let guard = ClientCountGuard::register(&self.clients);

        let spawned = thread::Builder::new()
            .name(format!("session-{}", addr))
            .spawn(move || {
                // Keep the counter correct even if the send path panics
                let _guard = guard;
                let mut session = ClientSession::new(
                    stream,
                    addr,
                    session_queue,
                    session_running,
                    Arc::clone(&session_alive),
                    idle_poll,
                );
                // Internal faults end this session only, never the server
                if catch_unwind(AssertUnwindSafe(|| session.run())).is_err() {
                    session_alive.store(false, Ordering::Relaxed);
                    error!("Session for {} terminated by internal fault", addr);
                }
            });

        match spawned {
            Ok(handle) => {
                sessions.push(SessionHandle {
                    peer: addr,
                    queue,
                    alive,
                    join: Some(handle),
                });
                info!(
                    "Client connected: {} ({} active)",
                    addr,
                    self.clients.load(Ordering::SeqCst)
                );
            }
            // Guard was moved into the dropped closure, so the count is
            // already restored
            Err(e) => error!("Failed to spawn session for {}: {}", addr, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_reports_address_on_failure() {
        let err = bind("256.256.256.256:0").unwrap_err();
        match err {
            Error::Bind { address, .. } => assert_eq!(address, "256.256.256.256:0"),
            other => panic!("Expected Bind error, got: {}", other),
        }
    }

    #[test]
    fn test_bind_ephemeral_port() {
        let listener = bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        assert_ne!(addr.port(), 0);
    }
}
