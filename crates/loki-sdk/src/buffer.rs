//! Bounded in-memory buffering of log entries.
//!
//! The buffer is a fixed-capacity FIFO shared between any number of
//! producers and the flush loop. Producers never block on I/O and never
//! fail: when the buffer is full, the single oldest entry is evicted to
//! admit the new one (drop-oldest, never drop-newest). The net effect is
//! that the buffer always holds the newest `capacity` entries enqueued
//! since the last drain.
//!
//! A mutex around the inner queue makes `push` and `drain` mutually
//! exclusive, so concurrent producers cannot corrupt ordering and a drain
//! racing another drain hands each entry to exactly one caller.

use crate::entry::LogEntry;
use std::collections::VecDeque;
use std::sync::Mutex;
use tracing::warn;

/// Fixed-capacity FIFO of entries awaiting delivery.
#[derive(Debug)]
pub struct EntryBuffer {
    entries: Mutex<VecDeque<LogEntry>>,
    capacity: usize,
}

#[allow(clippy::expect_used)]
impl EntryBuffer {
    /// Creates a buffer holding at most `capacity` entries.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        EntryBuffer {
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Appends an entry, evicting the oldest one first when at capacity.
    ///
    /// Never blocks on I/O and never fails; overflow is not an error.
    pub fn push(&self, entry: LogEntry) {
        let mut entries = self.entries.lock().expect("lock poisoned");
        if entries.len() >= self.capacity {
            entries.pop_front();
            warn!(
                "log buffer full ({} entries), dropping oldest entry",
                self.capacity
            );
        }
        entries.push_back(entry);
    }

    /// Removes and returns up to `max_n` oldest entries in insertion order.
    pub fn drain(&self, max_n: usize) -> Vec<LogEntry> {
        let mut entries = self.entries.lock().expect("lock poisoned");
        let n = max_n.min(entries.len());
        entries.drain(..n).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
