//! A bounded async queue with a **DropOldest** overflow policy.
//!
//! Every producer/consumer pipeline in this bridge (the host's video and
//! audio senders, the companion's audio jitter buffer) needs the same
//! shape: cap latency by bounding the queue, and when it's full prefer
//! freshness over completeness by evicting the oldest pending item rather
//! than blocking the producer or refusing the new one.
//!
//! `tokio::sync::mpsc` enforces backpressure (the producer blocks/fails when
//! full), which is the wrong policy here — a stalled network consumer must
//! never stall screen capture or audio capture. This type is a small
//! `Mutex<VecDeque<T>>` plus a `Notify` instead.

use std::collections::VecDeque;
use std::sync::Mutex;

use tokio::sync::Notify;

/// A bounded FIFO queue that evicts the oldest element when `push` would
/// exceed `capacity`, rather than blocking or rejecting the new element.
pub struct DropOldestQueue<T> {
    capacity: usize,
    items: Mutex<VecDeque<T>>,
    notify: Notify,
    dropped: std::sync::atomic::AtomicU64,
}

impl<T> DropOldestQueue<T> {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "DropOldestQueue capacity must be positive");
        Self {
            capacity,
            items: Mutex::new(VecDeque::with_capacity(capacity)),
            notify: Notify::new(),
            dropped: std::sync::atomic::AtomicU64::new(0),
        }
    }

    /// Pushes `item`, evicting the oldest queued item first if already at
    /// capacity. Returns the evicted item, if any, so the caller can return
    /// its resources (e.g. a pooled buffer) immediately.
    pub fn push(&self, item: T) -> Option<T> {
        let evicted = {
            let mut items = self.items.lock().expect("DropOldestQueue mutex poisoned");
            let evicted = if items.len() >= self.capacity {
                items.pop_front()
            } else {
                None
            };
            items.push_back(item);
            evicted
        };
        if evicted.is_some() {
            self.dropped.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        }
        self.notify.notify_one();
        evicted
    }

    /// Pops the oldest item, waiting until one is available.
    pub async fn pop(&self) -> T {
        loop {
            if let Some(item) = self.items.lock().expect("DropOldestQueue mutex poisoned").pop_front() {
                return item;
            }
            self.notify.notified().await;
        }
    }

    /// Non-blocking pop, for tests and drain-on-teardown paths.
    pub fn try_pop(&self) -> Option<T> {
        self.items.lock().expect("DropOldestQueue mutex poisoned").pop_front()
    }

    pub fn len(&self) -> usize {
        self.items.lock().expect("DropOldestQueue mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total number of items evicted over this queue's lifetime.
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(std::sync::atomic::Ordering::Relaxed)
    }
}
