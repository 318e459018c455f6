//! Bounded drop-oldest frame queue.
//!
//! The buffer between the producer and each client session. Built on a
//! lock-free [`ArrayQueue`] so the producer never blocks on a slow consumer:
//! when the queue is full the oldest frame is evicted to admit the new one.
//! Staleness is preferred over backpressure for a live feed.

use crate::frame::FrameRecord;
use crossbeam_queue::ArrayQueue;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Default queue capacity (frames buffered per client)
pub const DEFAULT_CAPACITY: usize = 10;

/// Thread-safe, fixed-capacity, drop-oldest FIFO of shared frame records.
///
/// One queue per client session; the producer pushes, the session pops.
/// Both operations are non-blocking.
pub struct FrameQueue {
    inner: ArrayQueue<Arc<FrameRecord>>,
    dropped: AtomicU64,
}

impl FrameQueue {
    /// Create a queue holding at most `capacity` frames (minimum 1).
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: ArrayQueue::new(capacity.max(1)),
            dropped: AtomicU64::new(0),
        }
    }

    /// Append a frame, evicting the oldest entry first if full.
    ///
    /// Never blocks and never fails. Returns `true` if an older frame was
    /// evicted to make room.
    pub fn push(&self, frame: Arc<FrameRecord>) -> bool {
        let evicted = self.inner.force_push(frame).is_some();
        if evicted {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
        evicted
    }

    /// Remove and return the oldest frame, or `None` without blocking.
    pub fn pop(&self) -> Option<Arc<FrameRecord>> {
        self.inner.pop()
    }

    /// Current number of buffered frames.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether the queue is currently empty.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Maximum number of buffered frames.
    pub fn capacity(&self) -> usize {
        self.inner.capacity()
    }

    /// Total frames evicted by overflow since creation.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}
