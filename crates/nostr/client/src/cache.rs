//! Seen-event cache for at-most-once processing across relays.

use parking_lot::Mutex;
use std::collections::{HashSet, VecDeque};

/// Set of event ids already dispatched.
///
/// Unbounded by default. With a capacity, the oldest ids are forgotten
/// first once the set is full.
#[derive(Debug, Default)]
pub struct SeenCache {
    inner: Mutex<SeenInner>,
    capacity: Option<usize>,
}

#[derive(Debug, Default)]
struct SeenInner {
    ids: HashSet<String>,
    order: VecDeque<String>,
}

impl SeenCache {
    /// Create an unbounded cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a cache that remembers at most `capacity` ids.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(SeenInner::default()),
            capacity: Some(capacity.max(1)),
        }
    }

    /// Record `id` and return true if it was not seen before.
    ///
    /// Check and insert happen under one lock, so exactly one of any number
    /// of concurrent callers with the same id gets `true`.
    pub fn mark_seen_if_new(&self, id: &str) -> bool {
        let mut inner = self.inner.lock();
        if inner.ids.contains(id) {
            return false;
        }

        inner.ids.insert(id.to_string());
        if let Some(capacity) = self.capacity {
            inner.order.push_back(id.to_string());
            while inner.order.len() > capacity {
                if let Some(oldest) = inner.order.pop_front() {
                    inner.ids.remove(&oldest);
                }
            }
        }
        true
    }

    pub fn contains(&self, id: &str) -> bool {
        self.inner.lock().ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
